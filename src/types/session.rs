//! Session snapshots and aggregated statistics

use serde::{Deserialize, Serialize};

/// Lifecycle phase of the streaming session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub enum SessionPhase {
    Idle,
    /// Remote start-capture has been issued and has not answered yet
    Starting,
    Streaming,
}

/// Point-in-time view of the controller state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub connected: bool,
    pub in_flight: bool,
    /// Last completed rate sample, 0 when not streaming
    pub current_rate: u32,
    pub session_count: u64,
    /// Frames delivered in the current (or last) session
    pub frames_received: u64,
    /// Ticks skipped because a fetch was still outstanding
    pub skipped_ticks: u64,
    pub capture_count: u64,
}

impl SessionSnapshot {
    pub fn is_streaming(&self) -> bool {
        self.phase == SessionPhase::Streaming
    }
}

/// Statistics accumulated by an observer across sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct SessionStats {
    pub current_rate: u32,
    /// Highest rate sample seen since the observer was created
    pub max_rate: u32,
    pub session_count: u64,
    pub capture_count: u64,
    /// Total frames delivered across all sessions
    pub frames: u64,
}

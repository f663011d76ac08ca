//! Device connection status

use serde::{Deserialize, Serialize};

use crate::config::DeviceConfig;

/// Connection status reported by a frame source probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
pub struct DeviceStatus {
    pub connected: bool,
    pub device_id: Option<String>,
    pub resolution: String,
    pub fps: f32,
}

impl DeviceStatus {
    /// Status of a connected device described by `config`.
    pub fn connected(config: &DeviceConfig) -> Self {
        Self {
            connected: true,
            device_id: Some(config.device_id()),
            resolution: config.resolution(),
            fps: config.fps as f32,
        }
    }

    /// Status when no device is present.
    pub fn disconnected() -> Self {
        Self { connected: false, device_id: None, resolution: String::new(), fps: 0.0 }
    }
}

impl Default for DeviceStatus {
    fn default() -> Self {
        Self::disconnected()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_status_uses_device_config() {
        let status = DeviceStatus::connected(&DeviceConfig::default());
        assert!(status.connected);
        assert_eq!(status.device_id.as_deref(), Some("05e3:f12a"));
        assert_eq!(status.resolution, "640x480");
        assert_eq!(status.fps, 30.0);
    }

    #[test]
    fn default_is_disconnected() {
        let status = DeviceStatus::default();
        assert!(!status.connected);
        assert!(status.device_id.is_none());
        assert!(status.resolution.is_empty());
    }
}

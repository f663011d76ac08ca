//! Frame types returned by frame sources and delivered to observers

use std::sync::Arc;

/// Raw result of a single fetch from a frame source.
///
/// `success == false` never carries a payload. A successful result without a
/// payload is a soft failure as well: nothing is shown, nothing is counted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameResult {
    /// Whether the source reported success
    pub success: bool,

    /// Encoded image bytes (JPEG from the capture helper)
    pub payload: Option<Vec<u8>>,

    /// Source-side capture timestamp in milliseconds since the Unix epoch
    pub timestamp_ms: Option<u64>,

    /// Reason reported by the source for a failed fetch
    pub error: Option<String>,
}

impl FrameResult {
    /// A successful fetch carrying a payload.
    pub fn frame(payload: Vec<u8>, timestamp_ms: Option<u64>) -> Self {
        Self { success: true, payload: Some(payload), timestamp_ms, error: None }
    }

    /// A soft failure with the source's reason.
    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, payload: None, timestamp_ms: None, error: Some(error.into()) }
    }

    /// Classify the result, dropping any payload attached to a failed fetch.
    pub fn into_outcome(self) -> FetchOutcome {
        match (self.success, self.payload) {
            (true, Some(payload)) => {
                FetchOutcome::Frame { payload, timestamp_ms: self.timestamp_ms }
            }
            (true, None) => FetchOutcome::Empty,
            (false, _) => FetchOutcome::Failed { reason: self.error },
        }
    }
}

/// Classified fetch result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A displayable frame
    Frame { payload: Vec<u8>, timestamp_ms: Option<u64> },

    /// Success reported but no payload attached
    Empty,

    /// The source reported a failure
    Failed { reason: Option<String> },
}

/// A frame delivered to observers.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Encoded image bytes (zero-copy via Arc)
    pub data: Arc<[u8]>,

    /// Position of this frame within its session, starting at 1
    pub sequence: u64,

    /// Source-side capture timestamp, if the source reported one
    pub timestamp_ms: Option<u64>,
}

impl Frame {
    /// Create a new frame
    pub fn new(data: Vec<u8>, sequence: u64, timestamp_ms: Option<u64>) -> Self {
        Self { data: data.into(), sequence, timestamp_ms }
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

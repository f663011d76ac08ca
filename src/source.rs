//! Frame source trait for capture devices

use crate::Result;
use crate::types::{DeviceStatus, FrameResult};

/// Trait for remote capture devices
///
/// A frame source is reached only through a handful of opaque remote calls.
/// Every method takes `&self`: a stale fetch from a stopped session may still
/// be running while the controller issues `stop_capture` or `start_capture`,
/// so implementations must tolerate overlapping calls of different kinds.
///
/// The controller never issues two `fetch_frame` calls concurrently.
#[async_trait::async_trait]
pub trait FrameSource: Send + Sync + 'static {
    /// Check whether the device is present
    ///
    /// Returns:
    /// - `Ok(status)` with `status.connected` set accordingly
    /// - `Err(e)` - The probe itself failed
    async fn probe(&self) -> Result<DeviceStatus>;

    /// Ask the device to begin capturing
    async fn start_capture(&self) -> Result<()>;

    /// Ask the device to stop capturing
    async fn stop_capture(&self) -> Result<()>;

    /// Fetch the most recent frame
    ///
    /// Returns:
    /// - `Ok(result)` - The call completed; `result` may still be a soft failure
    /// - `Err(e)` - Transport failure
    async fn fetch_frame(&self) -> Result<FrameResult>;

    /// Capture a single still image, possibly at higher quality than live frames
    async fn capture_still(&self) -> Result<FrameResult> {
        self.fetch_frame().await
    }
}

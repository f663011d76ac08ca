//! Core value types shared by sources, the session controller and observers.
//!
//! ## Architecture
//!
//! - [`FrameResult`] is what a [`FrameSource`](crate::FrameSource) returns for one fetch
//! - [`FetchOutcome`] classifies a result into frame, empty or failed
//! - [`Frame`] is what observers receive, with the payload shared via `Arc`
//! - [`DeviceStatus`] describes the connected capture device
//! - [`LogEvent`] carries messages with a [`LogLevel`] for the log panel
//! - [`SessionSnapshot`] and [`SessionStats`] expose controller and observer state
//!
//! ## Usage Example
//!
//! ```rust
//! use scopestream::types::{FetchOutcome, FrameResult};
//!
//! let result = FrameResult::failure("device busy");
//! match result.into_outcome() {
//!     FetchOutcome::Failed { reason } => assert_eq!(reason.as_deref(), Some("device busy")),
//!     other => panic!("unexpected outcome: {other:?}"),
//! }
//! ```

mod device;
mod frame;
mod log;
mod session;

pub use device::DeviceStatus;
pub use frame::{FetchOutcome, Frame, FrameResult};
pub use log::{LogEvent, LogLevel};
pub use session::{SessionPhase, SessionSnapshot, SessionStats};

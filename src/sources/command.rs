//! Frame source backed by an external capture helper program
//!
//! The helper is run once per operation with a single verb appended to its
//! arguments: `probe`, `start`, `stop`, `frame` or `still`. Device settings are
//! passed through the environment (`SCOPE_VENDOR_ID`, `SCOPE_PRODUCT_ID`,
//! `SCOPE_VIDEO_INDEX`, `SCOPE_WIDTH`, `SCOPE_HEIGHT`, `SCOPE_FPS`).
//!
//! ## Output protocol
//!
//! Frames (`frame`, `still`):
//!
//! ```text
//! SUCCESS
//! <base64 encoded JPEG>
//! <capture timestamp, ms since epoch>
//! ```
//!
//! or `ERROR:<message>`. Probes print `CONNECTED:<vid>:<pid>`,
//! `DISCONNECTED` or `ERROR:<message>`. `start` and `stop` report through
//! their exit status.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::ffi::OsString;
use std::process::{Output, Stdio};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::config::DeviceConfig;
use crate::source::FrameSource;
use crate::types::{DeviceStatus, FrameResult};
use crate::{Result, StreamError};

/// Reason reported when the helper output is not recognisable.
const BUSY_MESSAGE: &str = "Camera busy or unavailable";

/// Frame source that shells out to a capture helper.
#[derive(Debug, Clone)]
pub struct CommandSource {
    program: OsString,
    args: Vec<OsString>,
    device: DeviceConfig,
}

impl CommandSource {
    /// Create a source running `program` for the device described by `device`
    pub fn new(program: impl Into<OsString>, device: DeviceConfig) -> Self {
        Self { program: program.into(), args: Vec::new(), device }
    }

    /// Arguments placed before the verb
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    async fn run(&self, verb: &str) -> Result<Output> {
        trace!(verb, program = ?self.program, "Running capture helper");

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(verb)
            .env("SCOPE_VENDOR_ID", format!("{:04x}", self.device.vendor_id))
            .env("SCOPE_PRODUCT_ID", format!("{:04x}", self.device.product_id))
            .env("SCOPE_VIDEO_INDEX", self.device.video_device_index.to_string())
            .env("SCOPE_WIDTH", self.device.width.to_string())
            .env("SCOPE_HEIGHT", self.device.height.to_string())
            .env("SCOPE_FPS", self.device.fps.to_string())
            .stdin(Stdio::null())
            // A fetch abandoned by a timeout must not leave the helper holding the camera
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                StreamError::remote_failed_with_source(
                    verb,
                    format!("failed to run {}", self.program.to_string_lossy()),
                    Box::new(e),
                )
            })?;

        if !output.stderr.is_empty() {
            debug!(verb, "Helper stderr: {}", String::from_utf8_lossy(&output.stderr).trim());
        }

        Ok(output)
    }

    /// Turn a non-zero exit into a remote error
    fn ack(verb: &str, output: &Output) -> Result<()> {
        if output.status.success() {
            return Ok(());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reason = match stdout.trim().strip_prefix("ERROR:") {
            Some(message) => message.trim().to_string(),
            None => format!("helper exited with {}", output.status),
        };
        Err(StreamError::remote_failed(verb, reason))
    }

    fn frame_result(output: &Output) -> FrameResult {
        let result = parse_frame_output(&String::from_utf8_lossy(&output.stdout));
        if result.success && !output.status.success() {
            return FrameResult::failure(format!("helper exited with {}", output.status));
        }
        result
    }
}

#[async_trait::async_trait]
impl FrameSource for CommandSource {
    async fn probe(&self) -> Result<DeviceStatus> {
        let output = self.run("probe").await?;
        parse_probe_output(&String::from_utf8_lossy(&output.stdout), &self.device)
    }

    async fn start_capture(&self) -> Result<()> {
        let output = self.run("start").await?;
        Self::ack("start", &output)
    }

    async fn stop_capture(&self) -> Result<()> {
        let output = self.run("stop").await?;
        Self::ack("stop", &output)
    }

    async fn fetch_frame(&self) -> Result<FrameResult> {
        let output = self.run("frame").await?;
        Ok(Self::frame_result(&output))
    }

    async fn capture_still(&self) -> Result<FrameResult> {
        let output = self.run("still").await?;
        Ok(Self::frame_result(&output))
    }
}

/// Parse the helper's frame output.
///
/// Anything that is not a well-formed success is a soft failure; this never
/// returns an error.
pub fn parse_frame_output(stdout: &str) -> FrameResult {
    let trimmed = stdout.trim();
    if let Some(message) = trimmed.strip_prefix("ERROR:") {
        return FrameResult::failure(message.trim());
    }

    let lines: Vec<&str> = trimmed.lines().map(str::trim).collect();
    if lines.len() < 3 || lines[0] != "SUCCESS" {
        return FrameResult::failure(BUSY_MESSAGE);
    }

    let Ok(timestamp_ms) = lines[2].parse::<u64>() else {
        return FrameResult::failure(BUSY_MESSAGE);
    };

    match STANDARD.decode(lines[1]) {
        Ok(payload) => FrameResult::frame(payload, Some(timestamp_ms)),
        Err(e) => FrameResult::failure(format!("Corrupt frame payload: {e}")),
    }
}

/// Parse the helper's probe output.
pub fn parse_probe_output(stdout: &str, device: &DeviceConfig) -> Result<DeviceStatus> {
    let line = stdout.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();

    if line.starts_with("CONNECTED") {
        Ok(DeviceStatus::connected(device))
    } else if line == "DISCONNECTED" {
        Ok(DeviceStatus::disconnected())
    } else if let Some(message) = line.strip_prefix("ERROR:") {
        Err(StreamError::remote_failed("probe", message.trim()))
    } else {
        Err(StreamError::protocol("probe output", format!("unexpected line {line:?}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FetchOutcome;

    #[test]
    fn success_output_decodes_payload() {
        let result = parse_frame_output("SUCCESS\n/9j/4A==\n1700000000000\n");
        assert_eq!(
            result.into_outcome(),
            FetchOutcome::Frame {
                payload: vec![0xFF, 0xD8, 0xFF, 0xE0],
                timestamp_ms: Some(1_700_000_000_000)
            }
        );
    }

    #[test]
    fn error_output_is_soft_failure() {
        let result = parse_frame_output("ERROR:Cannot capture frame\n");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Cannot capture frame"));
    }

    #[test]
    fn truncated_output_reports_busy() {
        for output in ["", "SUCCESS\n", "SUCCESS\n/9j/4A==\n", "garbage"] {
            let result = parse_frame_output(output);
            assert_eq!(result.error.as_deref(), Some(BUSY_MESSAGE), "{output:?}");
        }
    }

    #[test]
    fn bad_timestamp_reports_busy() {
        let result = parse_frame_output("SUCCESS\n/9j/4A==\nsoon\n");
        assert_eq!(result.error.as_deref(), Some(BUSY_MESSAGE));
    }

    #[test]
    fn corrupt_base64_is_soft_failure() {
        let result = parse_frame_output("SUCCESS\n***\n1\n");
        assert!(!result.success);
        assert!(result.error.unwrap_or_default().starts_with("Corrupt frame payload"));
    }

    #[test]
    fn probe_distinguishes_disconnected_from_connected() {
        let device = DeviceConfig::default();

        assert!(parse_probe_output("CONNECTED:05e3:f12a\n", &device).unwrap().connected);
        assert!(!parse_probe_output("DISCONNECTED\n", &device).unwrap().connected);
        assert!(matches!(
            parse_probe_output("ERROR:lsusb timeout", &device),
            Err(StreamError::Remote { .. })
        ));
        assert!(matches!(parse_probe_output("", &device), Err(StreamError::Protocol { .. })));
    }
}

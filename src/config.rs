//! Streaming and device configuration loaded from YAML

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::{Result, StreamError};

/// Default polling period (10 Hz).
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 100;

/// Default rate window length.
pub const DEFAULT_RATE_WINDOW_MS: u64 = 1000;

/// Controller timing configuration.
///
/// ```rust
/// use scopestream::StreamConfig;
///
/// let config = StreamConfig::from_yaml_str("fetch_timeout_ms: 2000\n").unwrap();
/// assert_eq!(config.tick_interval_ms, 100);
/// assert_eq!(config.fetch_timeout().map(|d| d.as_millis()), Some(2000));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(default, deny_unknown_fields)]
pub struct StreamConfig {
    /// Period between fetch ticks, independent of the device's native frame rate
    pub tick_interval_ms: u64,

    /// Length of one rate measurement window
    pub rate_window_ms: u64,

    /// Per-fetch deadline; absent means a fetch may take arbitrarily long
    pub fetch_timeout_ms: Option<u64>,

    /// Capture device description
    pub device: DeviceConfig,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            rate_window_ms: DEFAULT_RATE_WINDOW_MS,
            fetch_timeout_ms: None,
            device: DeviceConfig::default(),
        }
    }
}

impl StreamConfig {
    /// Parse and validate a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: StreamConfig = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| StreamError::file_error(path.to_path_buf(), e))?;
        let config = Self::from_yaml_str(&yaml)?;
        debug!(path = %path.display(), "Loaded stream configuration");
        Ok(config)
    }

    /// Reject values the controller cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            return Err(StreamError::config("tick_interval_ms must be greater than zero"));
        }
        if self.rate_window_ms == 0 {
            return Err(StreamError::config("rate_window_ms must be greater than zero"));
        }
        if self.fetch_timeout_ms == Some(0) {
            return Err(StreamError::config("fetch_timeout_ms must be greater than zero"));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_window_ms)
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }
}

/// USB capture device description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "tauri", derive(specta::Type))]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    pub video_device_index: u8,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            vendor_id: 0x05e3,  // Genesys Logic
            product_id: 0xf12a, // Digital Microscope
            video_device_index: 4,
            width: 640,
            height: 480,
            fps: 30,
        }
    }
}

impl DeviceConfig {
    /// USB identifier in `vvvv:pppp` form
    pub fn device_id(&self) -> String {
        format!("{:04x}:{:04x}", self.vendor_id, self.product_id)
    }

    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_polling_cadence() {
        let config = StreamConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.rate_window(), Duration::from_millis(1000));
        assert!(config.fetch_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let yaml = "tick_interval_ms: 50\ndevice:\n  video_device_index: 0\n";
        let config = StreamConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.tick_interval_ms, 50);
        assert_eq!(config.rate_window_ms, 1000);
        assert_eq!(config.device.video_device_index, 0);
        assert_eq!(config.device.vendor_id, 0x05e3);
    }

    #[test]
    fn zero_values_are_rejected() {
        for yaml in ["tick_interval_ms: 0", "rate_window_ms: 0", "fetch_timeout_ms: 0"] {
            let err = StreamConfig::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(err, StreamError::Config { .. }), "{yaml}: {err}");
        }
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = StreamConfig::from_yaml_str("tick_rate: 10").unwrap_err();
        assert!(matches!(err, StreamError::Config { .. }));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fetch_timeout_ms: 1500").unwrap();

        let config = StreamConfig::load(file.path()).unwrap();
        assert_eq!(config.fetch_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = StreamConfig::load("/nonexistent/scopestream.yaml").unwrap_err();
        match err {
            StreamError::File { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/scopestream.yaml"))
            }
            other => panic!("Expected File error, got {other:?}"),
        }
    }

    #[test]
    fn device_id_is_lower_hex() {
        let device = DeviceConfig { vendor_id: 0x0A, product_id: 0xBEEF, ..Default::default() };
        assert_eq!(device.device_id(), "000a:beef");
        assert_eq!(device.resolution(), "640x480");
    }
}

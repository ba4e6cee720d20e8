//! Service configuration.
//!
//! Everything is optional in TOML; missing keys take the defaults below.
//!
//! ```toml
//! [surface]
//! width = 1920
//! height = 1080
//! margin = 30
//!
//! [device]
//! pattern = ".*1915.*eeee.*col03"
//! transport = "auto"        # "auto" | "generic" | "fast-path"
//! read_timeout_ms = 100
//!
//! [retry]
//! interval_ms = 250
//! max_interval_ms = 2000
//! # max_attempts = 10
//!
//! [debounce]
//! confirm_ticks = 200
//! idle_ticks = 980
//!
//! [events]
//! channel_capacity = 1024
//! ```

use crate::device::TransportKind;
use crate::error::TouchError;
use crate::locator::{millis, DevicePattern, RetryPolicy, DEFAULT_PATTERN};
use crate::mapper::Surface;
use crate::tracker::Thresholds;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TouchConfig {
    pub surface: Surface,
    pub device: DeviceConfig,
    pub retry: RetryPolicy,
    pub debounce: Thresholds,
    pub events: EventsConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Case-insensitive regex matched against the OS device path.
    pub pattern: String,
    pub transport: TransportKind,
    /// Upper bound on a single blocking read. Also bounds shutdown latency of the read loop.
    #[serde(rename = "read_timeout_ms", with = "millis")]
    pub read_timeout: Duration,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            transport: TransportKind::Auto,
            read_timeout: Duration::from_millis(100),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

impl TouchConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, TouchError> {
        let cfg: TouchConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, TouchError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Compile the device signature.
    pub fn pattern(&self) -> Result<DevicePattern, TouchError> {
        DevicePattern::new(&self.device.pattern)
    }

    pub fn validate(&self) -> Result<(), TouchError> {
        let s = &self.surface;
        if s.margin >= s.width || s.margin >= s.height {
            return Err(TouchError::Config(format!(
                "surface margin {} must be smaller than {}x{}",
                s.margin, s.width, s.height
            )));
        }
        if self.device.read_timeout.is_zero() {
            return Err(TouchError::Config("device.read_timeout_ms must be > 0".into()));
        }
        if self.retry.interval.is_zero() {
            return Err(TouchError::Config("retry.interval_ms must be > 0".into()));
        }
        if self.retry.max_attempts == Some(0) {
            return Err(TouchError::Config("retry.max_attempts must be > 0".into()));
        }
        if self.debounce.confirm_ticks == 0 || self.debounce.idle_ticks == 0 {
            return Err(TouchError::Config("debounce thresholds must be > 0".into()));
        }
        if self.events.channel_capacity == 0 {
            return Err(TouchError::Config("events.channel_capacity must be > 0".into()));
        }
        self.pattern()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = TouchConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, TouchConfig::default());
        assert_eq!(cfg.device.pattern, ".*1915.*eeee.*col03");
        assert_eq!(cfg.debounce.confirm_ticks, 200);
        assert_eq!(cfg.debounce.idle_ticks, 980);
        assert_eq!(cfg.surface.margin, 30);
        assert_eq!(cfg.retry.max_attempts, None);
    }

    #[test]
    fn parses_partial_sections() {
        let cfg = TouchConfig::from_toml_str(
            r#"
            [surface]
            width = 800
            height = 600

            [device]
            transport = "fast-path"
            read_timeout_ms = 50

            [retry]
            interval_ms = 10
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(
            cfg.surface,
            Surface {
                width: 800,
                height: 600,
                margin: 30
            }
        );
        assert_eq!(cfg.device.transport, TransportKind::FastPath);
        assert_eq!(cfg.device.read_timeout, Duration::from_millis(50));
        assert_eq!(cfg.retry.interval, Duration::from_millis(10));
        assert_eq!(cfg.retry.max_interval, Duration::from_secs(2));
        assert_eq!(cfg.retry.max_attempts, Some(5));
    }

    #[test]
    fn rejects_margin_wider_than_surface() {
        let err = TouchConfig::from_toml_str("[surface]\nwidth = 20\nheight = 600\nmargin = 30\n")
            .unwrap_err();
        assert!(matches!(err, TouchError::Config(_)));
    }

    #[test]
    fn rejects_bad_pattern_and_bad_toml() {
        assert!(matches!(
            TouchConfig::from_toml_str("[device]\npattern = \"(\"\n"),
            Err(TouchError::InvalidPattern(_))
        ));
        assert!(matches!(
            TouchConfig::from_toml_str("[surface\nwidth = 1"),
            Err(TouchError::ConfigParse(_))
        ));
        assert!(matches!(
            TouchConfig::from_toml_str("[device]\ntransport = \"usb\"\n"),
            Err(TouchError::ConfigParse(_))
        ));
    }
}

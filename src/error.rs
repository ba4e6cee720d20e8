//! Error taxonomy.
//!
//! Nothing here is fatal to the process. Device-level failures are recovered by the
//! connection manager returning to discovery; only an explicit shutdown ends the service.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TouchError {
    /// No device path matched the signature. Retried unless a finite attempt budget ran out.
    #[error("no matching device found after {attempts} enumeration pass(es)")]
    DeviceNotFound { attempts: u32 },

    /// A matching candidate could not be opened; discovery skips it and continues.
    #[error("failed to open device {path}: {reason}")]
    DeviceOpenFailed { path: String, reason: String },

    /// The handle went bad (unplugged, revoked). Triggers a full reconnect.
    #[error("device read failed: {0}")]
    ReadIo(String),

    /// Zero-length or truncated read. The reader folds this into `ReadOutcome::NoData`.
    #[error("short or empty read ({len} bytes)")]
    ShortOrEmptyRead { len: usize },

    /// A shutdown was requested while waiting.
    #[error("cancelled")]
    Cancelled,

    #[error("invalid device pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Failure reported by the HID backend itself (init, enumeration).
    #[error("hid backend error: {0}")]
    Hid(String),
}

impl TouchError {
    /// `true` for errors that mean the current handle must be dropped and rediscovered.
    pub fn is_device_lost(&self) -> bool {
        matches!(self, TouchError::ReadIo(_))
    }
}

#[cfg(feature = "hid")]
impl From<hidapi::HidError> for TouchError {
    fn from(e: hidapi::HidError) -> Self {
        TouchError::Hid(e.to_string())
    }
}

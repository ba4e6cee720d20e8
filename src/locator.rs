//! Device discovery.
//!
//! [`DeviceLocator::locate`] runs enumeration passes until a device whose path matches the
//! signature can be opened, sleeping between passes according to a [`RetryPolicy`] and
//! giving up only on cancellation or when a finite attempt budget is spent.

use crate::device::{BoxedSource, DeviceEnumerator, TransportKind};
use crate::error::TouchError;
use crate::metadata::DeviceMeta;
use crate::shutdown::CancelToken;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Signature of the digitizer's touch collection: vendor `1915`, product `eeee`,
/// HID collection `03`, in that order anywhere in the path.
pub const DEFAULT_PATTERN: &str = ".*1915.*eeee.*col03";

/// Case-insensitive regular expression matched against OS device paths.
#[derive(Clone, Debug)]
pub struct DevicePattern {
    re: Regex,
}

impl DevicePattern {
    pub fn new(pattern: &str) -> Result<Self, TouchError> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()?;
        Ok(Self { re })
    }

    pub fn matches(&self, path: &str) -> bool {
        self.re.is_match(path)
    }

    pub fn as_str(&self) -> &str {
        self.re.as_str()
    }
}

/// Delay schedule between failed enumeration passes.
///
/// The delay starts at `interval`, doubles after every failed pass, and is capped at
/// `max_interval`. `max_attempts = None` retries until cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    #[serde(rename = "interval_ms", with = "millis")]
    pub interval: Duration,
    #[serde(rename = "max_interval_ms", with = "millis")]
    pub max_interval: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            max_interval: Duration::from_secs(2),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after the `failed`-th consecutive failed pass (1-based).
    pub fn delay_after(&self, failed: u32) -> Duration {
        let shift = failed.saturating_sub(1).min(16);
        self.interval
            .saturating_mul(1u32 << shift)
            .min(self.max_interval.max(self.interval))
    }

    pub fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

pub(crate) mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// A successfully opened device.
pub struct Located {
    pub meta: DeviceMeta,
    pub source: BoxedSource,
}

impl std::fmt::Debug for Located {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Located")
            .field("meta", &self.meta)
            .field("transport", &self.source.transport())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct DeviceLocator {
    pattern: DevicePattern,
    retry: RetryPolicy,
    transport: TransportKind,
}

impl DeviceLocator {
    pub fn new(pattern: DevicePattern, retry: RetryPolicy, transport: TransportKind) -> Self {
        Self {
            pattern,
            retry,
            transport,
        }
    }

    pub fn pattern(&self) -> &DevicePattern {
        &self.pattern
    }

    /// One enumeration pass: open the first matching device that opens.
    ///
    /// `Ok(None)` means no candidate matched or every candidate failed to open.
    pub fn try_once<E: DeviceEnumerator + ?Sized>(
        &self,
        enumerator: &mut E,
    ) -> Result<Option<Located>, TouchError> {
        let devices = enumerator.enumerate()?;
        trace!(count = devices.len(), "enumerated hid devices");

        for meta in devices {
            let signature = meta.signature();
            if !self.pattern.matches(&signature) {
                continue;
            }
            debug!(path = %meta.path, %signature, "candidate matches signature");
            match enumerator.open(&meta, self.transport) {
                Ok(source) => {
                    info!(device = %meta, transport = ?source.transport(), "device opened");
                    return Ok(Some(Located { meta, source }));
                }
                Err(e) => {
                    warn!(path = %meta.path, error = %e, "skipping candidate");
                }
            }
        }
        Ok(None)
    }

    /// Retry enumeration until a device is opened.
    ///
    /// Errors only with [`TouchError::Cancelled`] or, when `max_attempts` is set,
    /// [`TouchError::DeviceNotFound`]. Enumeration failures count as failed passes.
    pub fn locate<E: DeviceEnumerator + ?Sized>(
        &self,
        enumerator: &mut E,
        cancel: &CancelToken,
    ) -> Result<Located, TouchError> {
        let mut attempts = 0u32;
        loop {
            if cancel.is_cancelled() {
                return Err(TouchError::Cancelled);
            }

            match self.try_once(enumerator) {
                Ok(Some(found)) => return Ok(found),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "enumeration failed"),
            }

            attempts += 1;
            if self.retry.exhausted(attempts) {
                return Err(TouchError::DeviceNotFound { attempts });
            }

            let delay = self.retry.delay_after(attempts);
            debug!(
                attempts,
                delay_ms = delay.as_millis() as u64,
                pattern = self.pattern.as_str(),
                "device not found, retrying"
            );
            if cancel.wait_timeout(delay) {
                return Err(TouchError::Cancelled);
            }
        }
    }
}

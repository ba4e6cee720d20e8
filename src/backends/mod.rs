//! Device backends for `ftouch`.
//!
//! Implementations of [`DeviceEnumerator`](crate::device::DeviceEnumerator) and
//! [`ReportSource`](crate::device::ReportSource) for real hardware.
//!
//! # Feature flags
//! - **`hid`** — enables the `hidapi` enumerator and its generic read transport (default).
//!
//! The Linux fast path (`hidraw`) reads `/dev/hidraw*` nodes directly and needs no feature;
//! the `hid` enumerator selects it when the requested transport allows.

#[cfg(feature = "hid")]
#[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
pub mod hid;

#[cfg(target_os = "linux")]
#[cfg_attr(docsrs, doc(cfg(target_os = "linux")))]
pub mod hidraw;

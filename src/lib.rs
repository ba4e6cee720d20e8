//! ftouch — touch digitizer reader.
//!
//! Finds a HID touch digitizer by device-path signature, reads its fixed 9-byte input
//! reports on a dedicated thread, and turns them into a stream of [`Update`]s:
//!
//! - positional markers for every contact, mapped onto a host-supplied [`Surface`];
//! - debounced changes in the number of simultaneous contacts;
//! - idle gaps in the device clock;
//! - connection state changes, including automatic reconnect after an unplug.
//!
//! ```no_run
//! use ftouch::{TouchConfig, TouchService};
//! use std::time::Duration;
//!
//! let service = TouchService::spawn_hid(TouchConfig::default())?;
//! while let Some(update) = service.recv_timeout(Duration::from_secs(1)) {
//!     println!("{update:?}");
//! }
//! service.shutdown()?;
//! # Ok::<(), ftouch::TouchError>(())
//! ```

pub mod backends;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod locator;
pub mod logger;
pub mod manager;
pub mod mapper;
pub mod metadata;
pub mod pipeline;
pub mod reader;
pub mod report;
pub mod shutdown;
pub mod tracker;

pub use config::TouchConfig;
pub use device::*;
pub use error::TouchError;
pub use event::*;
pub use locator::{DeviceLocator, DevicePattern, RetryPolicy};
pub use manager::*;
pub use mapper::{CoordinateMapper, Surface};
pub use metadata::DeviceMeta;
pub use report::{decode, RawReport, TouchSample, REPORT_LEN};
pub use shutdown::CancelToken;
pub use tracker::{Thresholds, TouchStateTracker};

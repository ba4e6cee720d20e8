//! `hidapi` backend.
//!
//! [`HidEnumerator`] lists interfaces through `hidapi` and opens the selected one with the
//! requested [`TransportKind`]:
//!
//! - `Generic` reads through `HidDevice::read_timeout`.
//! - `FastPath` / `Auto` first try the platform fast path (Linux hidraw node) and fall back
//!   to the generic transport when that cannot be opened.
//!
//! Outside Windows, interface paths don't name the collection, so [`HidEnumerator`] numbers
//! collections per node (see [`assign_collections`]) before discovery matches signatures.

use crate::device::{BoxedSource, DeviceEnumerator, ReportSource, TransportKind};
use crate::error::TouchError;
use crate::metadata::{assign_collections, DeviceMeta};
use hidapi::{DeviceInfo, HidApi, HidDevice};
use std::ffi::CString;
use std::time::Duration;
use tracing::{debug, warn};

pub struct HidEnumerator {
    api: HidApi,
    /// `HidApi::new` already enumerated once; skip the first refresh.
    fresh: bool,
}

impl HidEnumerator {
    pub fn new() -> Result<Self, TouchError> {
        Ok(Self {
            api: HidApi::new()?,
            fresh: true,
        })
    }

    fn open_generic(&self, device: &DeviceMeta) -> Result<BoxedSource, TouchError> {
        let open_failed = |reason: String| TouchError::DeviceOpenFailed {
            path: device.path.clone(),
            reason,
        };
        let path = CString::new(device.path.as_str()).map_err(|e| open_failed(e.to_string()))?;
        let raw = self
            .api
            .open_path(&path)
            .map_err(|e| open_failed(e.to_string()))?;
        Ok(Box::new(HidapiSource { raw }))
    }
}

impl DeviceEnumerator for HidEnumerator {
    fn enumerate(&mut self) -> Result<Vec<DeviceMeta>, TouchError> {
        if !self.fresh {
            self.api.refresh_devices()?;
        }
        self.fresh = false;
        let mut devices: Vec<DeviceMeta> = self.api.device_list().map(meta).collect();
        if cfg!(not(windows)) {
            assign_collections(&mut devices);
        }
        Ok(devices)
    }

    fn open(
        &mut self,
        device: &DeviceMeta,
        transport: TransportKind,
    ) -> Result<BoxedSource, TouchError> {
        if transport == TransportKind::Generic {
            return self.open_generic(device);
        }

        match open_fast_path(&device.path) {
            Ok(source) => Ok(source),
            Err(e) => {
                if transport == TransportKind::FastPath {
                    warn!(path = %device.path, error = %e, "fast path unavailable, using hidapi");
                } else {
                    debug!(path = %device.path, error = %e, "fast path unavailable, using hidapi");
                }
                self.open_generic(device)
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn open_fast_path(path: &str) -> Result<BoxedSource, TouchError> {
    Ok(Box::new(crate::backends::hidraw::HidrawSource::open(path)?))
}

#[cfg(not(target_os = "linux"))]
fn open_fast_path(path: &str) -> Result<BoxedSource, TouchError> {
    Err(TouchError::DeviceOpenFailed {
        path: path.to_string(),
        reason: "no fast path on this platform".into(),
    })
}

/// Generic transport: `hidapi`'s own blocking read with a timeout.
pub struct HidapiSource {
    raw: HidDevice,
}

impl ReportSource for HidapiSource {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TouchError> {
        let ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        self.raw
            .read_timeout(buf, ms)
            .map_err(|e| TouchError::ReadIo(e.to_string()))
    }

    fn transport(&self) -> TransportKind {
        TransportKind::Generic
    }
}

/// Build a [`DeviceMeta`] snapshot for a `hidapi` device entry.
fn meta(info: &DeviceInfo) -> DeviceMeta {
    let interface_number = Some(info.interface_number()).filter(|n| *n >= 0);
    DeviceMeta {
        path: info.path().to_string_lossy().into_owned(),
        vid: Some(info.vendor_id()),
        pid: Some(info.product_id()),
        product_string: info.product_string().map(str::to_string),
        serial_number: info.serial_number().map(str::to_string),
        usage_page: Some(info.usage_page()),
        usage: Some(info.usage()),
        interface_number,
        collection: None,
    }
}

//! Device metadata snapshot.
//!
//! [`DeviceMeta`] is a lightweight, cloneable description of an enumerated HID interface.
//! Backends populate what they know; unknown fields remain `None`. Discovery matches the
//! device signature against `path`, and the connection manager forwards the snapshot of the
//! opened device with [`Update::Connection`](crate::event::Update::Connection).
//!
//! ## Persistence notes
//! `path` is platform-specific and changes across ports and reconnects. On Windows it carries
//! the `vid_XXXX&pid_XXXX&col0N` segments the device signature relies on. On Linux (hidraw) it
//! is a bare `/dev/hidrawN` node shared by every top-level collection of the interface, so
//! discovery matches [`DeviceMeta::signature`] instead: the path with those segments appended
//! from the ids and the collection index.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// OS path to the HID interface. Always present; it is what discovery matches on.
    pub path: String,

    /// USB Vendor ID (VID), if known.
    pub vid: Option<u16>,

    /// USB Product ID (PID), if known.
    pub pid: Option<u16>,

    /// Human-readable product name from the driver/firmware.
    pub product_string: Option<String>,

    pub serial_number: Option<String>,

    /// HID Usage Page, if known.
    pub usage_page: Option<u16>,

    /// HID Usage within the page, if known.
    pub usage: Option<u16>,

    /// HID interface index. Some stacks report `-1` for "not applicable"; that maps to `None`.
    pub interface_number: Option<i32>,

    /// 1-based top-level collection index, for backends whose paths don't encode it.
    pub collection: Option<u16>,
}

impl DeviceMeta {
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// String the device signature is matched against.
    ///
    /// The plain path, unless the backend assigned a collection index, in which case
    /// `#vid_XXXX&pid_XXXX&colNN` is appended so Windows-style signatures match on every
    /// platform.
    pub fn signature(&self) -> Cow<'_, str> {
        match (self.vid, self.pid, self.collection) {
            (Some(vid), Some(pid), Some(col)) => Cow::Owned(format!(
                "{}#vid_{vid:04x}&pid_{pid:04x}&col{col:02}",
                self.path
            )),
            _ => Cow::Borrowed(&self.path),
        }
    }
}

/// Number entries that share a path in enumeration order (`1`, `2`, ...).
///
/// hidraw exposes one node per interface and hidapi lists one entry per top-level
/// collection of that node, in report-descriptor order.
pub fn assign_collections(devices: &mut [DeviceMeta]) {
    let mut seen: HashMap<String, u16> = HashMap::new();
    for d in devices {
        let n = seen.entry(d.path.clone()).or_insert(0);
        *n += 1;
        d.collection = Some(*n);
    }
}

impl std::fmt::Display for DeviceMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let (Some(vid), Some(pid)) = (self.vid, self.pid) {
            write!(f, "{vid:04x}:{pid:04x} ")?;
        }
        if let Some(name) = &self.product_string {
            write!(f, "{name} ")?;
        }
        write!(f, "({})", self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hidraw(path: &str, usage: u16) -> DeviceMeta {
        DeviceMeta {
            vid: Some(0x1915),
            pid: Some(0xeeee),
            usage_page: Some(0x0d),
            usage: Some(usage),
            ..DeviceMeta::with_path(path)
        }
    }

    #[test]
    fn plain_path_without_collection() {
        let d = DeviceMeta::with_path(r"\\?\hid#vid_1915&pid_eeee&col03");
        assert_eq!(d.signature(), d.path.as_str());
    }

    #[test]
    fn collections_numbered_per_node() {
        let mut list = vec![
            hidraw("/dev/hidraw2", 0x01),
            hidraw("/dev/hidraw2", 0x02),
            hidraw("/dev/hidraw3", 0x01),
            hidraw("/dev/hidraw2", 0x04),
        ];
        assign_collections(&mut list);
        let cols: Vec<_> = list.iter().map(|d| d.collection).collect();
        assert_eq!(cols, vec![Some(1), Some(2), Some(1), Some(3)]);
        assert_eq!(list[3].signature(), "/dev/hidraw2#vid_1915&pid_eeee&col03");
    }
}

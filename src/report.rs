//! Raw report layout and decoding.
//!
//! The digitizer sends fixed 9-byte input reports, little-endian:
//!
//! | bytes  | field                 |
//! |--------|-----------------------|
//! | `0`    | report id (ignored)   |
//! | `1..3` | timestamp, `u16` tick |
//! | `3..5` | x, `u16`              |
//! | `5..7` | y, `u16`              |
//! | `7..9` | z, `u16`              |
//!
//! `z` doubles as the contact flag: `0` means no contact and `0xFFFF` is the
//! "no reading" sentinel. Anything strictly between is a touch.

use serde::Serialize;

/// Size in bytes of one input report, including the report id byte.
pub const REPORT_LEN: usize = 9;

/// One raw input report exactly as read from the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawReport(pub [u8; REPORT_LEN]);

impl RawReport {
    /// Build a report from a read buffer. Returns `None` unless at least
    /// [`REPORT_LEN`] bytes are available; trailing bytes are ignored.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        let bytes: [u8; REPORT_LEN] = data.get(..REPORT_LEN)?.try_into().ok()?;
        Some(Self(bytes))
    }

    /// Assemble a report from its fields. Mostly useful for tests and simulators.
    pub fn from_fields(report_id: u8, timestamp: u16, x: u16, y: u16, z: u16) -> Self {
        let mut b = [0u8; REPORT_LEN];
        b[0] = report_id;
        b[1..3].copy_from_slice(&timestamp.to_le_bytes());
        b[3..5].copy_from_slice(&x.to_le_bytes());
        b[5..7].copy_from_slice(&y.to_le_bytes());
        b[7..9].copy_from_slice(&z.to_le_bytes());
        Self(b)
    }

    #[inline]
    pub fn report_id(&self) -> u8 {
        self.0[0]
    }

    #[inline]
    fn u16_at(&self, offset: usize) -> u16 {
        u16::from_le_bytes([self.0[offset], self.0[offset + 1]])
    }
}

/// A decoded report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TouchSample {
    pub timestamp: u16,
    pub x: u16,
    pub y: u16,
    pub z: u16,
    pub contact: bool,
}

/// Decode a raw report into a [`TouchSample`]. Pure; every 9-byte buffer is valid.
pub fn decode(report: &RawReport) -> TouchSample {
    let z = report.u16_at(7);
    TouchSample {
        timestamp: report.u16_at(1),
        x: report.u16_at(3),
        y: report.u16_at(5),
        z,
        contact: contact(z),
    }
}

/// `true` iff `z` is a real contact reading: `0 < z < 0xFFFF`.
#[inline]
pub fn contact(z: u16) -> bool {
    z != 0 && z != u16::MAX
}

/// Tick distance from `earlier` to `later` on the 16-bit device clock (modulo 65536).
#[inline]
pub fn wrapping_sub(later: u16, earlier: u16) -> u16 {
    later.wrapping_sub(earlier)
}

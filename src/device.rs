//! Device seams.
//!
//! Discovery and reading are split into two traits so the connection manager can be driven
//! by the real HID backend or by an in-memory script:
//!
//! - [`DeviceEnumerator`] lists visible interfaces and opens one.
//! - [`ReportSource`] is the read capability of an opened interface. Two transports implement
//!   it for real hardware (see [`TransportKind`]); which one is used is decided at open time.

use crate::error::TouchError;
use crate::event::ConnectionState;
use crate::locator::DevicePattern;
use crate::metadata::DeviceMeta;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which read path an opened device uses.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Try the fast path, fall back to the generic transport if it cannot be opened.
    #[default]
    Auto,
    /// The HID library's own read call.
    Generic,
    /// Direct OS-level reads of the device node, bypassing the HID library.
    FastPath,
}

/// Read capability of an opened device.
pub trait ReportSource {
    /// Block for at most `timeout` and read one report into `buf`.
    ///
    /// Returns the number of bytes read; `Ok(0)` means nothing arrived in time. An `Err` means
    /// the handle is no longer usable.
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TouchError>;

    /// The transport actually in use (never `Auto`).
    fn transport(&self) -> TransportKind;
}

impl<S: ReportSource + ?Sized> ReportSource for Box<S> {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TouchError> {
        (**self).read(buf, timeout)
    }

    fn transport(&self) -> TransportKind {
        (**self).transport()
    }
}

/// Boxed source that can be lent to the read-loop thread.
pub type BoxedSource = Box<dyn ReportSource + Send>;

/// Enumerates and opens devices.
pub trait DeviceEnumerator {
    /// One enumeration pass over all currently visible HID interfaces.
    fn enumerate(&mut self) -> Result<Vec<DeviceMeta>, TouchError>;

    /// Open a previously enumerated interface with the requested transport.
    fn open(
        &mut self,
        device: &DeviceMeta,
        transport: TransportKind,
    ) -> Result<BoxedSource, TouchError>;
}

/// The device the connection manager is responsible for.
///
/// Holds the signature, what was resolved on the last successful discovery, and the open
/// handle while one exists. The handle is taken out while the read loop runs and put back
/// when it returns, so there is never more than one owner.
pub struct DeviceDescriptor {
    pub pattern: DevicePattern,
    pub resolved: Option<DeviceMeta>,
    pub state: ConnectionState,
    handle: Option<BoxedSource>,
}

impl DeviceDescriptor {
    pub fn new(pattern: DevicePattern) -> Self {
        Self {
            pattern,
            resolved: None,
            state: ConnectionState::Disconnected,
            handle: None,
        }
    }

    pub(crate) fn attach(&mut self, meta: DeviceMeta, handle: BoxedSource) {
        self.resolved = Some(meta);
        self.handle = Some(handle);
        self.state = ConnectionState::Connected;
    }

    /// Lend the handle out. `None` if nothing is attached.
    pub(crate) fn lend(&mut self) -> Option<BoxedSource> {
        self.handle.take()
    }

    pub(crate) fn give_back(&mut self, handle: BoxedSource) {
        self.handle = Some(handle);
    }

    /// Drop the handle, closing the OS device.
    pub(crate) fn release(&mut self) {
        self.handle = None;
        self.state = ConnectionState::Disconnected;
    }
}

impl std::fmt::Debug for DeviceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceDescriptor")
            .field("pattern", &self.pattern)
            .field("resolved", &self.resolved)
            .field("state", &self.state)
            .field("open", &self.handle.is_some())
            .finish()
    }
}

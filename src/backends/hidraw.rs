//! Linux hidraw fast path.
//!
//! Reads input reports straight from a `/dev/hidrawN` node with `poll(2)` + `read(2)`,
//! bypassing `hidapi`. hidraw delivers one whole report per `read`, report id first when the
//! device uses numbered reports.

use crate::device::{ReportSource, TransportKind};
use crate::error::TouchError;
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::fd::AsRawFd;
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;
use std::time::Duration;

pub struct HidrawSource {
    file: File,
}

impl HidrawSource {
    /// Open a hidraw node. Anything outside `/dev/` is refused so `hidapi` paths from other
    /// backends (libusb bus/port strings, Windows interface paths) fall back cleanly.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, TouchError> {
        let path = path.as_ref();
        if !path.starts_with("/dev/") {
            return Err(TouchError::DeviceOpenFailed {
                path: path.display().to_string(),
                reason: "not a device node".into(),
            });
        }
        let file = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NONBLOCK)
            .open(path)
            .map_err(|e| TouchError::DeviceOpenFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self { file })
    }

    /// Wrap an already opened, non-blocking descriptor.
    pub fn from_file(file: File) -> Self {
        Self { file }
    }
}

impl ReportSource for HidrawSource {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TouchError> {
        let mut pfd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let ms = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;

        let ret = unsafe { libc::poll(&mut pfd, 1, ms) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(0);
            }
            return Err(TouchError::ReadIo(format!("poll: {err}")));
        }
        if ret == 0 {
            return Ok(0);
        }

        if pfd.revents & libc::POLLIN == 0 {
            // Woken without data: POLLERR / POLLHUP / POLLNVAL.
            return Err(TouchError::ReadIo(format!(
                "device node reported revents=0x{:x}",
                pfd.revents
            )));
        }

        match self.file.read(buf) {
            // Readable but nothing to read: the node is gone.
            Ok(0) => Err(TouchError::ReadIo("end of stream".into())),
            Ok(n) => Ok(n),
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(e) => Err(TouchError::ReadIo(e.to_string())),
        }
    }

    fn transport(&self) -> TransportKind {
        TransportKind::FastPath
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{RawReport, REPORT_LEN};
    use std::io::Write;
    use std::os::fd::OwnedFd;
    use std::os::unix::net::UnixStream;

    fn pair() -> (HidrawSource, UnixStream) {
        let (reader, writer) = UnixStream::pair().unwrap();
        reader.set_nonblocking(true).unwrap();
        let file = File::from(OwnedFd::from(reader));
        (HidrawSource::from_file(file), writer)
    }

    #[test]
    fn reads_a_report_and_times_out_when_idle() {
        let (mut src, mut writer) = pair();
        let mut buf = [0u8; REPORT_LEN];

        assert_eq!(src.read(&mut buf, Duration::from_millis(5)).unwrap(), 0);

        let report = RawReport::from_fields(3, 1, 2, 3, 4);
        writer.write_all(&report.0).unwrap();
        assert_eq!(
            src.read(&mut buf, Duration::from_millis(500)).unwrap(),
            REPORT_LEN
        );
        assert_eq!(RawReport(buf), report);
        assert_eq!(src.transport(), TransportKind::FastPath);
    }

    #[test]
    fn hangup_is_io_error() {
        let (mut src, writer) = pair();
        drop(writer);
        let mut buf = [0u8; REPORT_LEN];
        let err = src.read(&mut buf, Duration::from_millis(500)).unwrap_err();
        assert!(err.is_device_lost());
    }

    #[test]
    fn refuses_paths_outside_dev() {
        assert!(matches!(
            HidrawSource::open("1-2:1.0"),
            Err(TouchError::DeviceOpenFailed { .. })
        ));
    }
}

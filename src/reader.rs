//! Report reading and the per-connection read loop.

use crate::device::{BoxedSource, ReportSource};
use crate::error::TouchError;
use crate::event::{TouchEvent, Update};
use crate::pipeline::TouchPipeline;
use crate::report::{RawReport, REPORT_LEN};
use crate::shutdown::CancelToken;
use std::sync::mpsc::SyncSender;
use std::time::Duration;
use tracing::{debug, trace, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Report(RawReport),
    /// Timeout, zero-length or short read. Nothing changes; read again.
    NoData,
}

/// Read one fixed-size report.
///
/// Short and empty reads are [`ReadOutcome::NoData`]; transport failures are returned as
/// [`TouchError::ReadIo`].
pub fn read_report<S: ReportSource + ?Sized>(
    source: &mut S,
    timeout: Duration,
) -> Result<ReadOutcome, TouchError> {
    let mut buf = [0u8; REPORT_LEN];
    let n = source.read(&mut buf, timeout).map_err(|e| match e {
        TouchError::ReadIo(_) => e,
        other => TouchError::ReadIo(other.to_string()),
    })?;

    match RawReport::from_slice(&buf[..n.min(REPORT_LEN)]) {
        Some(report) => Ok(ReadOutcome::Report(report)),
        None => {
            if n > 0 {
                trace!("{}", TouchError::ShortOrEmptyRead { len: n });
            }
            Ok(ReadOutcome::NoData)
        }
    }
}

/// Why a read loop ended.
#[derive(Debug)]
pub enum LoopExit {
    /// Shutdown was requested.
    Cancelled,
    /// The consumer dropped its receiver.
    ConsumerGone,
    /// The device handle failed; reconnect.
    DeviceLost(TouchError),
}

/// A finished read loop: the source handed back, why it stopped, and how many full reports
/// it processed.
pub struct Finished {
    pub source: BoxedSource,
    pub exit: LoopExit,
    pub reports: u64,
}

/// Blocking read loop for one connection.
///
/// Takes ownership of the source for its lifetime and hands it back on exit so the caller
/// decides when the OS handle is closed. The pipeline (and so all debounce state) lives
/// and dies with the loop.
pub struct ReadLoop {
    pipeline: TouchPipeline,
    updates: SyncSender<Update>,
    cancel: CancelToken,
    read_timeout: Duration,
    reports: u64,
}

impl ReadLoop {
    pub fn new(
        pipeline: TouchPipeline,
        updates: SyncSender<Update>,
        cancel: CancelToken,
        read_timeout: Duration,
    ) -> Self {
        Self {
            pipeline,
            updates,
            cancel,
            read_timeout,
            reports: 0,
        }
    }

    pub fn run(mut self, mut source: BoxedSource) -> Finished {
        let exit = self.drive(&mut source);
        debug!(?exit, reports = self.reports, "read loop finished");
        Finished {
            source,
            exit,
            reports: self.reports,
        }
    }

    fn drive(&mut self, source: &mut BoxedSource) -> LoopExit {
        let mut events: Vec<TouchEvent> = Vec::with_capacity(4);

        loop {
            if self.cancel.is_cancelled() {
                return LoopExit::Cancelled;
            }

            let report = match read_report(source, self.read_timeout) {
                Ok(ReadOutcome::Report(r)) => r,
                Ok(ReadOutcome::NoData) => continue,
                Err(e) => {
                    warn!(error = %e, "device read failed");
                    return LoopExit::DeviceLost(e);
                }
            };

            self.reports += 1;
            events.clear();
            let sample = self.pipeline.feed(&report, &mut events);
            trace!(?sample, "report");

            for ev in events.drain(..) {
                if self.updates.send(Update::Touch(ev)).is_err() {
                    return LoopExit::ConsumerGone;
                }
            }
        }
    }
}

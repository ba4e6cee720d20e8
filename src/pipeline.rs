//! Per-report processing: decode, debounce, map.

use crate::event::{TouchEvent, TouchKind};
use crate::mapper::CoordinateMapper;
use crate::report::{decode, RawReport, TouchSample};
use crate::tracker::{Thresholds, TouchStateTracker};

/// Decoder, tracker and mapper for one connection.
///
/// Owned by the read loop; dropped (and so reset) when the connection ends.
#[derive(Debug)]
pub struct TouchPipeline {
    tracker: TouchStateTracker,
    mapper: CoordinateMapper,
    scratch: Vec<TouchKind>,
}

impl TouchPipeline {
    pub fn new(thresholds: Thresholds, mapper: CoordinateMapper) -> Self {
        Self {
            tracker: TouchStateTracker::new(thresholds),
            mapper,
            scratch: Vec::with_capacity(4),
        }
    }

    /// Process one report, appending the resulting events to `out` in emission order:
    /// frame-boundary transitions first, then the sample's own marker.
    pub fn feed(&mut self, report: &RawReport, out: &mut Vec<TouchEvent>) -> TouchSample {
        let sample = decode(report);
        self.feed_sample(&sample, out);
        sample
    }

    pub fn feed_sample(&mut self, sample: &TouchSample, out: &mut Vec<TouchEvent>) {
        self.scratch.clear();
        self.tracker.advance(sample, &mut self.scratch);

        if sample.contact {
            let (px, py) = self.mapper.map(sample.x, sample.y);
            self.scratch.push(TouchKind::Marker { px, py });
        }

        out.extend(self.scratch.drain(..).map(|kind| TouchEvent {
            timestamp: sample.timestamp,
            kind,
        }));
    }
}

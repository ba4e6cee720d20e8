//! Contact-count debouncing.
//!
//! Individual sensor readings toggle near the detection threshold, so the number of
//! contacts seen per report flickers. [`TouchStateTracker`] counts contacts per *frame*
//! (all reports sharing one device timestamp) and only accepts a new count once it has
//! been seen at every frame boundary for more than `confirm_ticks` device ticks.
//!
//! All timestamp arithmetic is modulo 65536. Thresholds are raw device ticks; the
//! device does not document its tick rate, so they are not milliseconds.

use crate::event::TouchKind;
use crate::report::{wrapping_sub, TouchSample};
use serde::{Deserialize, Serialize};

/// Ticks a candidate count must persist before it is confirmed (exclusive).
pub const DEFAULT_CONFIRM_TICKS: u16 = 200;
/// A timestamp jump larger than this is reported as an idle gap.
pub const DEFAULT_IDLE_TICKS: u16 = 980;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub confirm_ticks: u16,
    pub idle_ticks: u16,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confirm_ticks: DEFAULT_CONFIRM_TICKS,
            idle_ticks: DEFAULT_IDLE_TICKS,
        }
    }
}

/// Debounce state for one connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TouchState {
    /// Contacts counted in the frame currently being received.
    pub frame_contact_tally: u32,
    pub confirmed_count: u32,
    pub pending_count: u32,
    /// Timestamp at which `pending_count` was first observed.
    pub pending_since_ts: u16,
    pub last_ts: u16,
    /// Set once the first sample has seeded `last_ts`.
    primed: bool,
}

/// Observable debounce phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TouchPhase {
    NoPendingChange,
    PendingChange { candidate: u32, since: u16 },
}

#[derive(Debug, Default)]
pub struct TouchStateTracker {
    state: TouchState,
    thresholds: Thresholds,
}

impl TouchStateTracker {
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            state: TouchState::default(),
            thresholds,
        }
    }

    /// Advance by one decoded sample.
    ///
    /// Pushes `CountConfirmed` and `Idle` transitions onto `out`. Positional markers are
    /// the caller's business; this only counts `sample.contact`.
    pub fn advance(&mut self, sample: &TouchSample, out: &mut Vec<TouchKind>) {
        let ts = sample.timestamp;

        if self.state.primed {
            let ts_diff = wrapping_sub(ts, self.state.last_ts);
            if ts_diff > 0 {
                self.frame_boundary(ts, ts_diff, out);
            }
        } else {
            // First sample after (re)connect seeds the clock; there is no previous frame.
            self.state.primed = true;
        }

        if sample.contact {
            self.state.frame_contact_tally += 1;
        }
        self.state.last_ts = ts;
    }

    fn frame_boundary(&mut self, ts: u16, ts_diff: u16, out: &mut Vec<TouchKind>) {
        let s = &mut self.state;

        if s.frame_contact_tally != s.confirmed_count {
            if s.frame_contact_tally != s.pending_count {
                s.pending_count = s.frame_contact_tally;
                s.pending_since_ts = s.last_ts;
            } else if wrapping_sub(ts, s.pending_since_ts) > self.thresholds.confirm_ticks {
                s.confirmed_count = s.pending_count;
                tracing::info!(count = s.confirmed_count, ts, "contact count confirmed");
                out.push(TouchKind::CountConfirmed {
                    count: s.confirmed_count,
                });
            }
        } else {
            s.pending_count = s.confirmed_count;
        }

        s.frame_contact_tally = 0;

        if ts_diff > self.thresholds.idle_ticks {
            tracing::debug!(since = s.last_ts, ts, gap = ts_diff, "idle gap");
            out.push(TouchKind::Idle {
                since_ts: s.last_ts,
            });
        }
    }

    /// Forget everything; used when the device is reconnected.
    pub fn reset(&mut self) {
        self.state = TouchState::default();
    }

    pub fn state(&self) -> &TouchState {
        &self.state
    }

    pub fn confirmed_count(&self) -> u32 {
        self.state.confirmed_count
    }

    pub fn phase(&self) -> TouchPhase {
        if self.state.pending_count == self.state.confirmed_count {
            TouchPhase::NoPendingChange
        } else {
            TouchPhase::PendingChange {
                candidate: self.state.pending_count,
                since: self.state.pending_since_ts,
            }
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(ts: u16, contact: bool) -> TouchSample {
        let z = if contact { 500 } else { 0 };
        TouchSample {
            timestamp: ts,
            x: 100,
            y: 100,
            z,
            contact,
        }
    }

    /// Feed `contacts` contact samples and one empty sample at `ts`.
    fn frame(t: &mut TouchStateTracker, ts: u16, contacts: u32, out: &mut Vec<TouchKind>) {
        for _ in 0..contacts {
            t.advance(&sample(ts, true), out);
        }
        t.advance(&sample(ts, false), out);
    }

    fn confirmed(out: &[TouchKind]) -> Vec<u32> {
        out.iter()
            .filter_map(|k| match k {
                TouchKind::CountConfirmed { count } => Some(*count),
                _ => None,
            })
            .collect()
    }

    fn idles(out: &[TouchKind]) -> usize {
        out.iter()
            .filter(|k| matches!(k, TouchKind::Idle { .. }))
            .count()
    }

    #[test]
    fn sustained_change_confirms_once_at_first_qualifying_boundary() {
        let mut t = TouchStateTracker::default();
        let mut out = Vec::new();

        for ts in 0..=200u16 {
            frame(&mut t, ts, 1, &mut out);
        }
        // Pending since ts 0; 200 - 0 is not > 200.
        assert!(confirmed(&out).is_empty());
        assert_eq!(
            t.phase(),
            TouchPhase::PendingChange {
                candidate: 1,
                since: 0
            }
        );

        frame(&mut t, 201, 1, &mut out);
        assert_eq!(confirmed(&out), vec![1]);
        assert_eq!(t.confirmed_count(), 1);

        for ts in 202..400u16 {
            frame(&mut t, ts, 1, &mut out);
        }
        assert_eq!(confirmed(&out), vec![1]);
        assert_eq!(t.phase(), TouchPhase::NoPendingChange);
    }

    #[test]
    fn flicker_that_reverts_within_window_is_rejected() {
        let mut t = TouchStateTracker::default();
        let mut out = Vec::new();

        for ts in 0..200u16 {
            frame(&mut t, ts, 1, &mut out);
        }
        for ts in 200..600u16 {
            frame(&mut t, ts, 0, &mut out);
        }
        assert!(confirmed(&out).is_empty());
        assert_eq!(t.confirmed_count(), 0);
        assert_eq!(t.phase(), TouchPhase::NoPendingChange);
    }

    #[test]
    fn changing_candidate_restarts_window() {
        let mut t = TouchStateTracker::default();
        let mut out = Vec::new();

        for ts in 0..150u16 {
            frame(&mut t, ts, 1, &mut out);
        }
        // Second finger lands: candidate becomes 2 with a fresh window.
        for ts in 150..340u16 {
            frame(&mut t, ts, 2, &mut out);
        }
        assert!(confirmed(&out).is_empty());
        for ts in 340..360u16 {
            frame(&mut t, ts, 2, &mut out);
        }
        assert_eq!(confirmed(&out), vec![2]);
    }

    #[test]
    fn tally_counts_contacts_within_one_frame() {
        let mut t = TouchStateTracker::default();
        let mut out = Vec::new();
        frame(&mut t, 10, 3, &mut out);
        assert_eq!(t.state().frame_contact_tally, 3);
        t.advance(&sample(11, false), &mut out);
        assert_eq!(t.state().frame_contact_tally, 0);
        assert_eq!(t.state().pending_count, 3);
        assert_eq!(t.state().pending_since_ts, 10);
    }

    #[test]
    fn idle_gap_reported_once_per_gap() {
        let mut t = TouchStateTracker::default();
        let mut out = Vec::new();
        frame(&mut t, 100, 0, &mut out);
        // Several samples arriving after a 2000 tick gap, all on one timestamp.
        for _ in 0..5 {
            t.advance(&sample(2100, false), &mut out);
        }
        assert_eq!(out, vec![TouchKind::Idle { since_ts: 100 }]);

        // Exactly the threshold is not idle.
        frame(&mut t, 2100 + 980, 0, &mut out);
        assert_eq!(idles(&out), 1);
        frame(&mut t, 2100 + 980 + 981, 0, &mut out);
        assert_eq!(idles(&out), 2);
    }

    #[test]
    fn confirmation_window_spans_timestamp_wraparound() {
        let mut t = TouchStateTracker::default();
        let mut out = Vec::new();
        let start = 65_500u16;
        frame(&mut t, start, 0, &mut out);

        let mut ts = start;
        for _ in 0..300 {
            ts = ts.wrapping_add(1);
            frame(&mut t, ts, 1, &mut out);
        }
        assert_eq!(confirmed(&out), vec![1]);
        // Stepping by one tick across 65535 -> 0 never looks like an idle gap.
        assert_eq!(idles(&out), 0);
    }

    #[test]
    fn first_sample_does_not_open_a_frame() {
        let mut t = TouchStateTracker::default();
        let mut out = Vec::new();
        t.advance(&sample(5000, true), &mut out);
        assert!(out.is_empty());
        assert_eq!(t.state().frame_contact_tally, 1);
        assert_eq!(t.state().last_ts, 5000);
    }

    #[test]
    fn reset_discards_state() {
        let mut t = TouchStateTracker::default();
        let mut out = Vec::new();
        for ts in 0..300u16 {
            frame(&mut t, ts, 1, &mut out);
        }
        assert_eq!(t.confirmed_count(), 1);
        t.reset();
        assert_eq!(*t.state(), TouchState::default());
        assert_eq!(t.phase(), TouchPhase::NoPendingChange);
    }
}

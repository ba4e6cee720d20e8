//! Events handed to the rendering side.
//!
//! The read loop produces [`TouchEvent`]s in device-timestamp order; the connection manager
//! interleaves [`Update::Connection`] notices at state transitions. Both travel over one
//! bounded channel, so a consumer always sees whole events.
//!
//! ## Value conventions
//! - `Marker` coordinates are destination-surface pixels with a top-left origin
//!   (see [`CoordinateMapper`](crate::mapper::CoordinateMapper)).
//! - `timestamp` and `since_ts` are raw 16-bit device ticks and wrap at 65536.

use crate::metadata::DeviceMeta;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum TouchKind {
    /// A contact was seen at this surface position.
    Marker { px: i32, py: i32 },

    /// The debounced number of simultaneous contacts changed.
    CountConfirmed { count: u32 },

    /// The device timestamp jumped past the idle threshold. `since_ts` is the last
    /// timestamp seen before the gap.
    Idle { since_ts: u16 },
}

/// A touch event stamped with the device timestamp of the report that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct TouchEvent {
    pub timestamp: u16,
    pub kind: TouchKind,
}

/// Connection lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    Disconnected,
    /// Discovery is running.
    Connecting,
    /// A device is open and the read loop is running.
    Connected,
    /// Terminal; the service has released its resources.
    Shutdown,
}

/// Item carried on the service channel.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "update", rename_all = "snake_case")]
pub enum Update {
    Connection {
        state: ConnectionState,
        device: Option<DeviceMeta>,
    },
    Touch(TouchEvent),
}

impl Update {
    pub fn touch(&self) -> Option<&TouchEvent> {
        match self {
            Update::Touch(ev) => Some(ev),
            Update::Connection { .. } => None,
        }
    }
}

/// Callback-style consumer of [`Update`]s.
pub trait UpdateListener {
    fn on_update(&mut self, update: &Update);
}

impl<F: FnMut(&Update)> UpdateListener for F {
    fn on_update(&mut self, update: &Update) {
        self(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tags() {
        let ev = Update::Touch(TouchEvent {
            timestamp: 42,
            kind: TouchKind::Marker { px: 10, py: 20 },
        });
        let json = serde_json::to_string(&ev).unwrap();
        assert_eq!(
            json,
            r#"{"update":"touch","timestamp":42,"kind":{"type":"Marker","px":10,"py":20}}"#
        );

        let conn = Update::Connection {
            state: ConnectionState::Connecting,
            device: None,
        };
        let json = serde_json::to_string(&conn).unwrap();
        assert_eq!(
            json,
            r#"{"update":"connection","state":"Connecting","device":null}"#
        );
    }

    #[test]
    fn closures_are_listeners() {
        let mut seen = 0;
        {
            let mut l = |u: &Update| {
                if u.touch().is_some() {
                    seen += 1;
                }
            };
            l.on_update(&Update::Touch(TouchEvent {
                timestamp: 0,
                kind: TouchKind::CountConfirmed { count: 1 },
            }));
        }
        assert_eq!(seen, 1);
    }
}

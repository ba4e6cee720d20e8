//! Logging helpers for hosts.
use crate::event::{ConnectionState, TouchKind, Update, UpdateListener};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

/// Install a global fmt subscriber at `level`. Returns `false` if one was already set.
pub fn init(level: Level) -> bool {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .is_ok()
}

/// A listener that logs every update. Markers go to `debug`, everything else to `info`.
#[derive(Debug, Default)]
pub struct LogListener;

impl LogListener {
    pub fn new() -> Self {
        LogListener
    }
}

impl UpdateListener for LogListener {
    fn on_update(&mut self, update: &Update) {
        match update {
            Update::Connection {
                state: ConnectionState::Connected,
                device: Some(dev),
            } => info!(device = %dev, "device connected"),
            Update::Connection { state, .. } => info!(?state, "connection"),
            Update::Touch(ev) => match ev.kind {
                TouchKind::Marker { px, py } => debug!(ts = ev.timestamp, px, py, "marker"),
                TouchKind::CountConfirmed { count } => {
                    info!(ts = ev.timestamp, count, "state changed")
                }
                TouchKind::Idle { since_ts } => info!(ts = ev.timestamp, since_ts, "idle"),
            },
        }
    }
}

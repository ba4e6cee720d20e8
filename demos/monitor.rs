//! Stand-in renderer: prints every update as a JSON line.
//!
//! Usage: `cargo run --example monitor [config.toml]`

use ftouch::logger::{self, LogListener};
use ftouch::{TouchConfig, TouchService, Update, UpdateListener};
use std::io::Write;
use std::time::Duration;
use tracing::Level;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logger::init(Level::INFO);

    let config = match std::env::args().nth(1) {
        Some(path) => TouchConfig::load(path)?,
        None => TouchConfig::default(),
    };

    let service = TouchService::spawn_hid(config)?;
    let mut log = LogListener::new();

    while service.is_running() {
        if let Some(update) = service.recv_timeout(Duration::from_millis(250)) {
            emit(&mut log, &update)?;
        }
    }
    // The worker may have queued more (at least its final `Shutdown`) before exiting.
    for update in service.updates().try_iter() {
        emit(&mut log, &update)?;
    }

    service.shutdown()?;
    Ok(())
}

fn emit(log: &mut LogListener, update: &Update) -> Result<(), Box<dyn std::error::Error>> {
    log.on_update(update);
    let mut out = std::io::stdout().lock();
    serde_json::to_writer(&mut out, update)?;
    writeln!(out)?;
    Ok(())
}

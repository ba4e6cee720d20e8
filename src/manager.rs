//! Connection management.
//!
//! [`TouchService`] runs two units of execution:
//!
//! - the **connection thread** owns the [`DeviceDescriptor`] and the enumerator. It runs
//!   discovery, publishes connection state, and restarts discovery when a device is lost;
//! - the **reader thread** is spawned per connection. It borrows the device handle (by
//!   move) for its lifetime, owns the debounce state, and is the only producer of
//!   [`TouchEvent`](crate::event::TouchEvent)s.
//!
//! Both publish on the same bounded channel, never at the same time: the connection thread
//! only sends while no reader is running. Shutdown is cooperative through a shared
//! [`CancelToken`]; the reader notices it within one read timeout.
//!
//! State machine: `Disconnected → Connecting → Connected → (device lost) Disconnected → …`,
//! and `Shutdown` once cancelled or the consumer hangs up. A device that opens but fails
//! before delivering a single report is retried on the same backoff schedule as discovery.

use crate::config::TouchConfig;
use crate::device::{DeviceDescriptor, DeviceEnumerator};
use crate::error::TouchError;
use crate::event::{ConnectionState, Update, UpdateListener};
use crate::locator::DeviceLocator;
use crate::mapper::CoordinateMapper;
use crate::pipeline::TouchPipeline;
use crate::reader::{Finished, LoopExit, ReadLoop};
use crate::shutdown::CancelToken;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Drives discovery and reconnection for one device.
pub struct ConnectionManager<E> {
    config: TouchConfig,
    locator: DeviceLocator,
    descriptor: DeviceDescriptor,
    enumerator: E,
    updates: SyncSender<Update>,
    cancel: CancelToken,
    /// Consecutive sessions lost without a single report.
    losses: u32,
}

impl<E: DeviceEnumerator> ConnectionManager<E> {
    pub fn new(
        config: TouchConfig,
        enumerator: E,
        updates: SyncSender<Update>,
        cancel: CancelToken,
    ) -> Result<Self, TouchError> {
        config.validate()?;
        let pattern = config.pattern()?;
        let locator = DeviceLocator::new(pattern.clone(), config.retry, config.device.transport);
        Ok(Self {
            config,
            locator,
            descriptor: DeviceDescriptor::new(pattern),
            enumerator,
            updates,
            cancel,
            losses: 0,
        })
    }

    /// Run until shutdown. Returns `Ok(())` on a requested shutdown or when the consumer
    /// went away, and an error only if discovery gave up (finite retry budget).
    pub fn run(mut self) -> Result<(), TouchError> {
        let result = self.run_inner();
        self.descriptor.release();
        self.descriptor.state = ConnectionState::Shutdown;
        // Fails only if the consumer is gone already.
        let _ = self.updates.send(Update::Connection {
            state: ConnectionState::Shutdown,
            device: None,
        });
        info!("touch service stopped");
        result
    }

    fn run_inner(&mut self) -> Result<(), TouchError> {
        loop {
            self.descriptor.state = ConnectionState::Connecting;
            if !self.publish(ConnectionState::Connecting) {
                return Ok(());
            }
            info!(pattern = self.locator.pattern().as_str(), "connecting to device");

            let located = match self.locator.locate(&mut self.enumerator, &self.cancel) {
                Ok(found) => found,
                Err(TouchError::Cancelled) => return Ok(()),
                Err(e) => {
                    error!(error = %e, "giving up on discovery");
                    return Err(e);
                }
            };

            self.descriptor.attach(located.meta, located.source);
            if !self.publish(ConnectionState::Connected) {
                return Ok(());
            }
            info!(device = ?self.descriptor.resolved, "device connected");

            let (exit, reports) = self.serve()?;

            self.descriptor.release();
            match exit {
                LoopExit::Cancelled | LoopExit::ConsumerGone => return Ok(()),
                LoopExit::DeviceLost(e) => {
                    warn!(error = %e, reports, "device lost, reconnecting");
                    if !self.publish(ConnectionState::Disconnected) {
                        return Ok(());
                    }
                    if self.back_off(reports) {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Sleep before rediscovery when the last session died without delivering data.
    /// `true` if cancelled while waiting.
    fn back_off(&mut self, reports: u64) -> bool {
        if reports > 0 {
            self.losses = 0;
            return false;
        }
        self.losses = self.losses.saturating_add(1);
        let delay = self.config.retry.delay_after(self.losses);
        debug!(
            losses = self.losses,
            delay_ms = delay.as_millis() as u64,
            "device failed before delivering data, backing off"
        );
        self.cancel.wait_timeout(delay)
    }

    /// Lend the handle to a fresh reader thread and wait for it to come back.
    /// Returns why the reader stopped and how many reports it processed.
    fn serve(&mut self) -> Result<(LoopExit, u64), TouchError> {
        let Some(source) = self.descriptor.lend() else {
            let lost = TouchError::ReadIo("no device handle attached".into());
            return Ok((LoopExit::DeviceLost(lost), 0));
        };

        let pipeline = TouchPipeline::new(
            self.config.debounce,
            CoordinateMapper::new(self.config.surface),
        );
        let read_loop = ReadLoop::new(
            pipeline,
            self.updates.clone(),
            self.cancel.clone(),
            self.config.device.read_timeout,
        );

        let reader = thread::Builder::new()
            .name("ftouch-reader".into())
            .spawn(move || read_loop.run(source))?;

        match reader.join() {
            Ok(Finished {
                source,
                exit,
                reports,
            }) => {
                self.descriptor.give_back(source);
                Ok((exit, reports))
            }
            Err(_) => {
                error!("reader thread panicked");
                let lost = TouchError::ReadIo("reader thread panicked".into());
                Ok((LoopExit::DeviceLost(lost), 0))
            }
        }
    }

    /// Send a state update. `false` if the consumer is gone.
    fn publish(&self, state: ConnectionState) -> bool {
        let device = match state {
            ConnectionState::Connected => self.descriptor.resolved.clone(),
            _ => None,
        };
        debug!(?state, "connection state");
        self.updates
            .send(Update::Connection { state, device })
            .is_ok()
    }
}

/// Handle to a running touch service.
///
/// Dropping the handle requests shutdown and waits for both threads to finish.
pub struct TouchService {
    updates: Receiver<Update>,
    cancel: CancelToken,
    worker: Option<JoinHandle<Result<(), TouchError>>>,
}

impl TouchService {
    /// Validate `config` and start the connection thread.
    ///
    /// `make_enumerator` runs on the connection thread, so the enumerator itself does not
    /// need to be `Send`.
    pub fn spawn<E, F>(config: TouchConfig, make_enumerator: F) -> Result<Self, TouchError>
    where
        E: DeviceEnumerator,
        F: FnOnce() -> Result<E, TouchError> + Send + 'static,
    {
        config.validate()?;
        let (tx, rx) = mpsc::sync_channel(config.events.channel_capacity);
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let worker = thread::Builder::new()
            .name("ftouch-connection".into())
            .spawn(move || {
                let enumerator = match make_enumerator() {
                    Ok(e) => e,
                    Err(e) => {
                        error!(error = %e, "failed to initialise device backend");
                        let _ = tx.send(Update::Connection {
                            state: ConnectionState::Shutdown,
                            device: None,
                        });
                        return Err(e);
                    }
                };
                ConnectionManager::new(config, enumerator, tx, token)?.run()
            })?;

        Ok(Self {
            updates: rx,
            cancel,
            worker: Some(worker),
        })
    }

    /// Start the service on the hidapi backend.
    #[cfg(feature = "hid")]
    pub fn spawn_hid(config: TouchConfig) -> Result<Self, TouchError> {
        Self::spawn(config, crate::backends::hid::HidEnumerator::new)
    }

    pub fn updates(&self) -> &Receiver<Update> {
        &self.updates
    }

    pub fn try_recv(&self) -> Option<Update> {
        match self.updates.try_recv() {
            Ok(u) => Some(u),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Wait up to `timeout` for the next update. `None` on timeout or after shutdown.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Update> {
        match self.updates.recv_timeout(timeout) {
            Ok(u) => Some(u),
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Deliver every pending update to `listener` without blocking. Returns how many.
    pub fn drain_into(&self, listener: &mut dyn UpdateListener) -> usize {
        let mut n = 0;
        for update in self.updates.try_iter() {
            listener.on_update(&update);
            n += 1;
        }
        n
    }

    /// A token that stops the service when cancelled. Useful for signal handlers.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Request shutdown and wait for the service threads to release the device.
    pub fn shutdown(mut self) -> Result<(), TouchError> {
        self.stop()
    }

    fn stop(&mut self) -> Result<(), TouchError> {
        self.cancel.cancel();
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        // A full channel would block the producer; drain so it can observe cancellation.
        loop {
            if worker.is_finished() {
                break;
            }
            while self.updates.try_recv().is_ok() {}
            thread::sleep(Duration::from_millis(1));
        }
        match worker.join() {
            Ok(result) => result,
            Err(_) => Err(TouchError::Io(std::io::Error::other(
                "connection thread panicked",
            ))),
        }
    }
}

impl Drop for TouchService {
    fn drop(&mut self) {
        if let Err(e) = self.stop() {
            debug!(error = %e, "touch service ended with error");
        }
    }
}

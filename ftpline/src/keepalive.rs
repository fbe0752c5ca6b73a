//! # Keep-alive
//!
//! Background worker probing an idle control connection with `NOOP`.
//!
//! The worker never waits for the control channel: when a foreground command holds it,
//! the tick is skipped. A dead connection is reported once through the session event
//! channel, then the worker exits.

use std::io;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::TryLockError;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::command::Command;
use super::config::KeepAliveConfig;
use super::control::SharedControl;
use super::event::SessionEvent;
use super::status::Status;
use super::types::{FtpError, FtpResult, Response};

/// Lifecycle of the keep-alive worker
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeepAliveState {
    /// Never started
    Idle,
    Running,
    /// A stop was requested and the worker is being joined
    Stopping,
    /// Stopped on request, or because the connection died
    Stopped,
}

/// Handle to the keep-alive worker. Dropping it stops the worker.
#[derive(Debug)]
pub struct KeepAlive {
    state: KeepAliveState,
    stop_tx: Option<Sender<()>>,
    worker: Option<JoinHandle<()>>,
}

impl KeepAlive {
    /// A handle with no worker behind it
    pub fn idle() -> Self {
        Self {
            state: KeepAliveState::Idle,
            stop_tx: None,
            worker: None,
        }
    }

    /// Spawn the worker probing `control`; reports are sent to `events`
    pub fn start(
        control: SharedControl,
        config: KeepAliveConfig,
        events: Sender<SessionEvent>,
    ) -> FtpResult<Self> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let worker = thread::Builder::new()
            .name("keepalive".to_string())
            .spawn(move || {
                let mut cadence = Cadence::new(config);
                loop {
                    match stop_rx.recv_timeout(cadence.interval()) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    match probe(&control) {
                        Probe::Skipped => trace!("control channel busy; keep-alive tick skipped"),
                        Probe::Alive(response) => {
                            cadence.success();
                            if events.send(SessionEvent::KeepAlive(response)).is_err() {
                                break;
                            }
                        }
                        Probe::Failed(err) => {
                            warn!("keep-alive probe failed: {err}");
                            cadence.failure();
                            if events
                                .send(SessionEvent::KeepAliveFailed(err.to_string()))
                                .is_err()
                            {
                                break;
                            }
                        }
                        Probe::Dead(reason) => {
                            error!("connection lost: {reason}");
                            let _ = events.send(SessionEvent::ConnectionLost(reason));
                            break;
                        }
                    }
                }
                debug!("keep-alive worker terminated");
            })
            .map_err(FtpError::LocalIo)?;
        info!(
            "keep-alive started (interval {:?}, extended {:?})",
            config.interval, config.extended_interval
        );
        Ok(Self {
            state: KeepAliveState::Running,
            stop_tx: Some(stop_tx),
            worker: Some(worker),
        })
    }

    /// Current state; a worker which exited on its own is reported as stopped
    pub fn state(&self) -> KeepAliveState {
        match (&self.state, &self.worker) {
            (KeepAliveState::Running, Some(worker)) if worker.is_finished() => {
                KeepAliveState::Stopped
            }
            (state, _) => *state,
        }
    }

    /// Request the worker to stop and wait for it to exit. No-op if nothing is running.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        self.state = KeepAliveState::Stopping;
        if let Some(stop_tx) = self.stop_tx.take() {
            // the worker may already be gone
            let _ = stop_tx.send(());
        }
        if worker.join().is_err() {
            error!("keep-alive worker panicked");
        }
        self.state = KeepAliveState::Stopped;
        debug!("keep-alive stopped");
    }
}

impl Drop for KeepAlive {
    fn drop(&mut self) {
        self.stop();
    }
}

enum Probe {
    Skipped,
    Alive(Response),
    Failed(FtpError),
    Dead(String),
}

fn probe(control: &SharedControl) -> Probe {
    let mut channel = match control.try_lock() {
        Ok(channel) => channel,
        Err(TryLockError::WouldBlock) => return Probe::Skipped,
        Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
    };
    match channel.exchange(Command::Noop) {
        Ok(response) if response.is_success() => Probe::Alive(response),
        Ok(response) if response.status == Status::NotAvailable => {
            Probe::Dead(response.to_string())
        }
        Ok(response) => Probe::Failed(FtpError::UnexpectedResponse(response)),
        Err(err) if is_connection_dead(&err) => Probe::Dead(err.to_string()),
        Err(err) => Probe::Failed(err),
    }
}

/// Whether `err` means the control connection can't be used anymore
pub fn is_connection_dead(err: &FtpError) -> bool {
    match err {
        FtpError::ConnectionError(err) => matches!(
            err.kind(),
            io::ErrorKind::UnexpectedEof
                | io::ErrorKind::TimedOut
                | io::ErrorKind::WouldBlock
                | io::ErrorKind::ConnectionReset
                | io::ErrorKind::ConnectionAborted
                | io::ErrorKind::BrokenPipe
                | io::ErrorKind::ConnectionRefused
                | io::ErrorKind::NotConnected
                | io::ErrorKind::NetworkUnreachable
                | io::ErrorKind::HostUnreachable
                | io::ErrorKind::NetworkDown
        ),
        FtpError::UnexpectedResponse(response) => response.status == Status::NotAvailable,
        _ => false,
    }
}

/// Probe interval, stretched once the connection proved healthy
#[derive(Debug)]
struct Cadence {
    config: KeepAliveConfig,
    successes: u32,
}

impl Cadence {
    fn new(config: KeepAliveConfig) -> Self {
        Self {
            config,
            successes: 0,
        }
    }

    fn interval(&self) -> Duration {
        if self.successes > self.config.success_threshold {
            self.config.extended_interval
        } else {
            self.config.interval
        }
    }

    fn success(&mut self) {
        self.successes = self.successes.saturating_add(1);
    }

    fn failure(&mut self) {
        self.successes = 0;
    }
}

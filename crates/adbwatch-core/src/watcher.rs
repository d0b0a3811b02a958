//! Live device tracking with automatic adb server restart.
//!
//! A [`DeviceWatcher`] owns one background task that holds a
//! `host:track-devices` session open, diffs every device list against the
//! previous one, and pushes the resulting [`DeviceStateChange`]s through a
//! single-reader channel. If the server dies mid-session the task restarts
//! it and reconnects; the last known device list survives the gap, so the
//! first list after reconnecting reports everything that changed while the
//! server was down.
//!
//! # Example
//!
//! ```rust,ignore
//! use adbwatch_core::{DeviceWatcher, WatcherConfig};
//!
//! let watcher = DeviceWatcher::from_config(&WatcherConfig::default());
//! let mut events = watcher.subscribe().expect("first subscriber");
//!
//! while let Some(change) = events.recv().await {
//!     println!("{}: {} -> {}", change.serial, change.old_state, change.new_state);
//! }
//!
//! // The stream ended: was it shutdown() or a failure?
//! if let Some(err) = watcher.last_error() {
//!     eprintln!("watcher failed: {err}");
//! }
//! ```
//!
//! # Backpressure
//!
//! The event channel holds a single change. The task waits for the
//! subscriber before processing further device lists, so a slow consumer
//! delays tracking but never loses changes.

use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwapOption;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use adbwatch_wire::Dialer;

use crate::config::{ReconnectConfig, WatcherConfig};
use crate::diff::{DeviceStateChange, diff};
use crate::error::WatchError;
use crate::restart::HostRestarter;
use crate::session::{TrackingSession, open_tracking_session};
use crate::states::DeviceStates;
use crate::stream::DeviceEventStream;

const EVENT_CHANNEL_CAPACITY: usize = 1;

// ── WatcherState ─────────────────────────────────────────────────────

/// Where the background task is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Dialing and requesting `host:track-devices`.
    Connecting,
    /// Session open, waiting for device lists.
    Listening,
    /// The server went away; restarting it. `attempt` counts from 1 and
    /// resets once a device list arrives.
    Reconnecting { attempt: u32 },
    /// Task exited. Final.
    Terminated,
}

impl fmt::Display for WatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connecting => f.write_str("connecting"),
            Self::Listening => f.write_str("listening"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            Self::Terminated => f.write_str("terminated"),
        }
    }
}

// ── DeviceWatcher ────────────────────────────────────────────────────

/// Handle to a running device watcher.
///
/// The event stream from [`subscribe`](Self::subscribe) simply ends when
/// the watcher stops, whatever the reason. Callers must check
/// [`last_error`](Self::last_error) afterwards: `None` means the watcher
/// was shut down cleanly, `Some` carries the failure.
///
/// Call [`shutdown`](Self::shutdown) when done. Dropping the handle also
/// stops the task.
pub struct DeviceWatcher {
    events: Mutex<Option<mpsc::Receiver<DeviceStateChange>>>,
    last_error: Arc<ArcSwapOption<WatchError>>,
    state: watch::Receiver<WatcherState>,
    cancel: CancellationToken,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl DeviceWatcher {
    /// Spawn the tracking task.
    ///
    /// Returns immediately; the first connection attempt happens on the
    /// task. Must be called from within a tokio runtime.
    pub fn spawn<D, R>(dialer: D, restarter: R, reconnect: ReconnectConfig) -> Self
    where
        D: Dialer,
        R: HostRestarter,
    {
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(WatcherState::Connecting);
        let last_error = Arc::new(ArcSwapOption::empty());
        let cancel = CancellationToken::new();

        let worker = Worker {
            dialer,
            restarter,
            reconnect,
            events: event_tx,
            state: state_tx,
            cancel: cancel.clone(),
            last_error: Arc::clone(&last_error),
            known: DeviceStates::new(),
        };
        let task = tokio::spawn(worker.run());

        Self {
            events: Mutex::new(Some(event_rx)),
            last_error,
            state: state_rx,
            cancel,
            task: tokio::sync::Mutex::new(Some(task)),
        }
    }

    /// Watch a TCP adb server, restarting it with `adb start-server`.
    pub fn from_config(config: &WatcherConfig) -> Self {
        Self::spawn(config.dialer(), config.launcher(), config.reconnect.clone())
    }

    /// Take the event stream. Only the first call returns `Some`.
    pub fn subscribe(&self) -> Option<DeviceEventStream> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(DeviceEventStream::new)
    }

    /// The error that terminated the watcher.
    ///
    /// Set before the event stream ends. `None` while the watcher is
    /// running and after a clean [`shutdown`](Self::shutdown).
    pub fn last_error(&self) -> Option<Arc<WatchError>> {
        self.last_error.load_full()
    }

    /// Ask the task to stop and close the event stream without recording
    /// an error.
    ///
    /// Interrupts whatever the task is blocked on (dial, read, restart,
    /// backoff, or delivering an event). Returns immediately; use
    /// [`join`](Self::join) to wait for teardown. Safe to call repeatedly.
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            debug!("device watcher shutdown requested");
        }
        self.cancel.cancel();
    }

    /// Observe the task's lifecycle state.
    pub fn state(&self) -> watch::Receiver<WatcherState> {
        self.state.clone()
    }

    /// Wait for the task to exit. Returns immediately if already joined.
    pub async fn join(&self) {
        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "device watcher task failed");
            }
        }
    }
}

impl Drop for DeviceWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Background task ──────────────────────────────────────────────────

struct Worker<D, R> {
    dialer: D,
    restarter: R,
    reconnect: ReconnectConfig,
    events: mpsc::Sender<DeviceStateChange>,
    state: watch::Sender<WatcherState>,
    cancel: CancellationToken,
    last_error: Arc<ArcSwapOption<WatchError>>,
    /// Last device list received. Kept across reconnects.
    known: DeviceStates,
}

impl<D, R> Worker<D, R>
where
    D: Dialer,
    R: HostRestarter,
{
    async fn run(mut self) {
        let Err(reason) = self.drive().await;
        match reason {
            WatchError::ShutdownRequested => {
                info!("device watcher stopped");
            }
            err => {
                error!(error = %err, "device watcher terminated");
                // Publish before `self.events` drops and closes the stream.
                self.last_error.store(Some(Arc::new(err)));
            }
        }
        self.state.send_replace(WatcherState::Terminated);
    }

    /// Connecting → Listening → Reconnecting → Connecting ...
    ///
    /// Returns only on shutdown or a fatal error.
    async fn drive(&mut self) -> Result<Infallible, WatchError> {
        let mut attempt: u32 = 0;

        loop {
            self.state.send_replace(WatcherState::Connecting);
            let mut session = self.until_cancelled(open_tracking_session(&self.dialer)).await?;
            info!("tracking adb devices");

            self.state.send_replace(WatcherState::Listening);
            match self.listen(&mut session, &mut attempt).await {
                WatchError::ConnectionReset => {
                    drop(session);
                    warn!(attempt, "adb server connection reset");
                }
                err => return Err(err),
            }

            if !self.reconnect.allows(attempt) {
                return Err(WatchError::RestartsExhausted { attempts: attempt });
            }
            self.state
                .send_replace(WatcherState::Reconnecting { attempt: attempt + 1 });

            let delay = self.reconnect.backoff(attempt);
            if !delay.is_zero() {
                info!(
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    attempt,
                    "waiting before restarting adb server"
                );
                tokio::select! {
                    biased;
                    () = self.cancel.cancelled() => return Err(WatchError::ShutdownRequested),
                    () = tokio::time::sleep(delay) => {}
                }
            }

            // A restart interrupted by shutdown is abandoned, result unseen.
            self.until_cancelled(async {
                self.restarter.restart().await.map_err(WatchError::from)
            })
            .await?;
            attempt += 1;
            info!(attempt, "adb server restarted, reconnecting");
        }
    }

    /// Read, diff and publish until the session fails. Returns why it
    /// stopped.
    async fn listen<C>(&mut self, session: &mut TrackingSession<C>, attempt: &mut u32) -> WatchError
    where
        C: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
    {
        loop {
            let states = match self.until_cancelled(session.next_states()).await {
                Ok(states) => states,
                Err(err) => return err,
            };
            *attempt = 0;

            let changes = diff(&self.known, &states);
            debug!(
                devices = states.len(),
                changes = changes.len(),
                "device list received"
            );

            for change in changes {
                if let Err(err) = self.publish(change).await {
                    return err;
                }
            }
            self.known = states;
        }
    }

    /// Hand one change to the subscriber, waiting until it has room.
    async fn publish(&self, change: DeviceStateChange) -> Result<(), WatchError> {
        debug!(
            serial = %change.serial,
            old = %change.old_state,
            new = %change.new_state,
            kind = %change.kind(),
            "device state changed"
        );

        self.until_cancelled(async {
            self.events.send(change).await.map_err(|_| {
                debug!("event stream dropped by subscriber");
                WatchError::ShutdownRequested
            })
        })
        .await
    }

    /// Race `fut` against shutdown. Shutdown wins ties.
    async fn until_cancelled<T>(
        &self,
        fut: impl Future<Output = Result<T, WatchError>>,
    ) -> Result<T, WatchError> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => Err(WatchError::ShutdownRequested),
            result = fut => result,
        }
    }
}

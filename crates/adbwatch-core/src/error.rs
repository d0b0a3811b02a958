// ── Watcher error types ──
//
// Every failure the tracking worker can hit, classified by what the
// worker does about it. Only `ConnectionReset` is recoverable; the
// `From<adbwatch_wire::Error>` impl is where that classification happens.

use thiserror::Error;

use crate::restart::RestartError;

/// Why a [`DeviceWatcher`](crate::DeviceWatcher) stopped, or why a single
/// protocol step failed.
#[derive(Debug, Error)]
pub enum WatchError {
    // ── Fatal ────────────────────────────────────────────────────────
    /// No connection to the adb server could be established.
    #[error("Cannot reach adb server: {0}")]
    Dial(#[source] adbwatch_wire::Error),

    /// The server rejected the tracking request or sent bytes that do
    /// not frame correctly. Client and server are out of sync.
    #[error("adb protocol error: {0}")]
    Protocol(#[source] adbwatch_wire::Error),

    /// A device list contained a line that is not `<serial>\t<state>`.
    /// `line` is 1-based.
    #[error("Invalid device state line {line}: {text:?}")]
    Parse { line: usize, text: String },

    /// Any other I/O failure on an established connection.
    #[error("adb connection failed: {0}")]
    Transport(#[source] adbwatch_wire::Error),

    /// The restart action failed after the server went away.
    #[error("Failed to restart adb server: {0}")]
    Restart(#[from] RestartError),

    /// The server kept dying and the restart budget ran out.
    #[error("adb server connection lost; gave up after {attempts} restarts")]
    RestartsExhausted { attempts: u32 },

    // ── Transient ────────────────────────────────────────────────────
    /// The server went away mid-session.
    #[error("Connection to adb server was reset")]
    ConnectionReset,

    // ── Internal ─────────────────────────────────────────────────────
    /// A blocking step was interrupted by `shutdown()`. Never reported
    /// through `last_error()`.
    #[error("Shutdown requested")]
    ShutdownRequested,
}

impl WatchError {
    /// Returns `true` if the server should be restarted and the session
    /// re-established.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionReset)
    }

    /// Returns `true` if the stream and the server disagree about the
    /// protocol.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Parse { .. })
    }
}

impl From<adbwatch_wire::Error> for WatchError {
    fn from(err: adbwatch_wire::Error) -> Self {
        if err.is_connection_reset() {
            Self::ConnectionReset
        } else if err.is_dial_failure() {
            Self::Dial(err)
        } else if err.is_protocol_violation() {
            Self::Protocol(err)
        } else {
            Self::Transport(err)
        }
    }
}

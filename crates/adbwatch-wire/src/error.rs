use std::io;

use thiserror::Error;

/// Transport-level error for everything that touches the adb server socket.
///
/// `adbwatch-core` classifies these into transient and fatal watcher
/// failures; see [`Error::is_connection_reset`].
#[derive(Debug, Error)]
pub enum Error {
    // ── Connection ──────────────────────────────────────────────────
    /// TCP connect failed (server not listening, host unreachable, etc.)
    #[error("Cannot connect to adb server at {addr}: {source}")]
    Dial {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Connect did not complete in time.
    #[error("Connecting to adb server at {addr} timed out after {timeout_ms}ms")]
    Timeout { addr: String, timeout_ms: u64 },

    /// Read or write failure on an established connection.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The server closed the stream between two messages.
    #[error("Connection closed by adb server")]
    ConnectionClosed,

    // ── Framing ─────────────────────────────────────────────────────
    /// The stream ended in the middle of a message: the server died
    /// while writing it.
    #[error("Incomplete message: expected {expected} bytes, got {actual}")]
    IncompleteMessage { expected: usize, actual: usize },

    /// The 4-byte length header was not hex.
    #[error("Invalid message length header {header:?}")]
    InvalidLength { header: String },

    /// Outgoing payload does not fit the 4-digit hex header.
    #[error("Message too long: {len} bytes (max {max})")]
    MessageTooLong { len: usize, max: usize },

    // ── Status ──────────────────────────────────────────────────────
    /// The server answered with something other than `OKAY` or `FAIL`.
    #[error("Unexpected status {status:?} in response to '{command}'")]
    UnexpectedStatus { command: String, status: String },

    /// The server answered `FAIL`.
    #[error("adb server rejected '{command}': {message}")]
    CommandFailed { command: String, message: String },
}

impl Error {
    /// Returns `true` if the server went away underneath an established
    /// connection (process died or restarted).
    pub fn is_connection_reset(&self) -> bool {
        match self {
            Self::ConnectionClosed | Self::IncompleteMessage { .. } => true,
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }

    /// Returns `true` if no connection was ever established.
    pub fn is_dial_failure(&self) -> bool {
        matches!(self, Self::Dial { .. } | Self::Timeout { .. })
    }

    /// Returns `true` if the server and client disagree about the byte
    /// stream. Reconnecting does not fix these.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            Self::InvalidLength { .. }
                | Self::MessageTooLong { .. }
                | Self::UnexpectedStatus { .. }
                | Self::CommandFailed { .. }
        )
    }
}

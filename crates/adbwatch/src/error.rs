//! CLI error types with miette diagnostics.
//!
//! Maps watcher and config failures into user-facing errors with
//! actionable help text.

use std::sync::Arc;

use miette::Diagnostic;
use thiserror::Error;

use adbwatch_config::ConfigError;
use adbwatch_core::{WatchError, WatcherConfig};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 3;
    pub const CONNECTION: i32 = 4;
    pub const RESTART: i32 = 5;
    pub const PROTOCOL: i32 = 6;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Invalid configuration")]
    #[diagnostic(
        code(adbwatch::config),
        help(
            "Check the config file and ADBWATCH_* environment variables.\n\
             Config file: {path}\n\
             Run: adbwatch config show"
        )
    )]
    Config {
        path: String,
        #[source]
        source: ConfigError,
    },

    // ── adb server ───────────────────────────────────────────────────

    #[error("Could not reach the adb server at {addr}")]
    #[diagnostic(
        code(adbwatch::server_unreachable),
        help(
            "Check that the adb server is running and listening on {addr}.\n\
             Try: adb start-server"
        )
    )]
    ServerUnreachable {
        addr: String,
        #[source]
        source: Arc<WatchError>,
    },

    #[error("The adb server went away and could not be brought back")]
    #[diagnostic(
        code(adbwatch::restart_failed),
        help(
            "adbwatch restarts the server with: {adb_path} start-server\n\
             Make sure that command works, or point --adb-path at a working adb."
        )
    )]
    RestartFailed {
        adb_path: String,
        #[source]
        source: Arc<WatchError>,
    },

    #[error("The adb server sent something unexpected")]
    #[diagnostic(
        code(adbwatch::protocol),
        help("The server may be incompatible with host:track-devices, or not an adb server.")
    )]
    Protocol {
        #[source]
        source: Arc<WatchError>,
    },

    #[error("Device tracking failed")]
    #[diagnostic(code(adbwatch::watch))]
    Watch {
        #[source]
        source: Arc<WatchError>,
    },

    #[error("The device event stream was already taken")]
    #[diagnostic(code(adbwatch::stream_taken))]
    StreamTaken,

    // ── Output ───────────────────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to encode event: {0}")]
    #[diagnostic(code(adbwatch::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config { .. } => exit_code::CONFIG,
            Self::ServerUnreachable { .. } => exit_code::CONNECTION,
            Self::RestartFailed { .. } => exit_code::RESTART,
            Self::Protocol { .. } => exit_code::PROTOCOL,
            Self::Watch { .. } | Self::StreamTaken | Self::Io(_) | Self::Json(_) => {
                exit_code::GENERAL
            }
        }
    }

    /// Classify the error that terminated a watcher.
    pub fn from_watch(err: Arc<WatchError>, config: &WatcherConfig) -> Self {
        if matches!(*err, WatchError::Dial(_)) {
            return Self::ServerUnreachable {
                addr: format!("{}:{}", config.host, config.port),
                source: err,
            };
        }
        if matches!(
            *err,
            WatchError::Restart(_) | WatchError::RestartsExhausted { .. }
        ) {
            return Self::RestartFailed {
                adb_path: config.adb_path.display().to_string(),
                source: err,
            };
        }
        if err.is_protocol() {
            return Self::Protocol { source: err };
        }
        Self::Watch { source: err }
    }
}

#[cfg(test)]
mod tests {
    use adbwatch_core::RestartError;

    use super::*;

    #[test]
    fn dial_failure_names_the_server_address() {
        let config = WatcherConfig {
            host: "10.0.0.2".into(),
            port: 5038,
            ..WatcherConfig::default()
        };
        let err = Arc::new(WatchError::Dial(adbwatch_wire_refused()));

        let cli = CliError::from_watch(err, &config);
        assert_eq!(cli.exit_code(), exit_code::CONNECTION);
        assert_eq!(
            cli.to_string(),
            "Could not reach the adb server at 10.0.0.2:5038"
        );
    }

    #[test]
    fn restart_failures_share_an_exit_code() {
        let config = WatcherConfig::default();
        let failed = Arc::new(WatchError::Restart(RestartError::Other("boom".into())));
        let exhausted = Arc::new(WatchError::RestartsExhausted { attempts: 5 });

        assert_eq!(
            CliError::from_watch(failed, &config).exit_code(),
            exit_code::RESTART
        );
        assert_eq!(
            CliError::from_watch(exhausted, &config).exit_code(),
            exit_code::RESTART
        );
    }

    #[test]
    fn parse_error_is_protocol() {
        let err = Arc::new(WatchError::Parse {
            line: 1,
            text: "a-device".into(),
        });
        let cli = CliError::from_watch(err, &WatcherConfig::default());
        assert_eq!(cli.exit_code(), exit_code::PROTOCOL);
    }

    #[test]
    fn taken_stream_is_a_general_failure() {
        let err = CliError::StreamTaken;
        assert_eq!(err.exit_code(), exit_code::GENERAL);
        assert_eq!(err.to_string(), "The device event stream was already taken");
    }

    fn adbwatch_wire_refused() -> adbwatch_core::WireError {
        adbwatch_core::WireError::Dial {
            addr: "10.0.0.2:5038".into(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        }
    }
}

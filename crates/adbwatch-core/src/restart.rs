// ── Host restart ──
//
// When the adb server dies mid-session the watcher brings it back before
// reconnecting. The action is pluggable: production uses `adb
// start-server`, tests use closures.

use std::future::Future;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};

use thiserror::Error;
use tokio::process::Command;

use adbwatch_wire::DEFAULT_PORT;

/// Why the adb server could not be (re)started.
#[derive(Debug, Error)]
pub enum RestartError {
    #[error("failed to run {}: {source}", path.display())]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} start-server exited with {status}: {stderr}", path.display())]
    Failed {
        path: PathBuf,
        status: ExitStatus,
        stderr: String,
    },

    #[error("{0}")]
    Other(String),
}

/// Starts the adb server if it is not running.
pub trait HostRestarter: Send + Sync + 'static {
    fn restart(&self) -> impl Future<Output = Result<(), RestartError>> + Send;
}

impl<F, Fut> HostRestarter for F
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), RestartError>> + Send,
{
    fn restart(&self) -> impl Future<Output = Result<(), RestartError>> + Send {
        self()
    }
}

/// Runs `<adb> -P <port> start-server`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbServerLauncher {
    pub adb_path: PathBuf,
    pub port: u16,
}

impl Default for AdbServerLauncher {
    fn default() -> Self {
        Self {
            adb_path: PathBuf::from("adb"),
            port: DEFAULT_PORT,
        }
    }
}

impl AdbServerLauncher {
    pub fn new(adb_path: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            adb_path: adb_path.into(),
            port,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.adb_path);
        cmd.arg("-P")
            .arg(self.port.to_string())
            .arg("start-server")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl HostRestarter for AdbServerLauncher {
    async fn restart(&self) -> Result<(), RestartError> {
        tracing::info!(adb = %self.adb_path.display(), port = self.port, "starting adb server");

        let output = self
            .command()
            .output()
            .await
            .map_err(|source| RestartError::Spawn {
                path: self.adb_path.clone(),
                source,
            })?;

        if output.status.success() {
            return Ok(());
        }

        Err(RestartError::Failed {
            path: self.adb_path.clone(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        })
    }
}

// ── Runtime watcher configuration ──
//
// Describes where the adb server lives and how hard to try keeping it
// alive. Never touches disk; `adbwatch-config` builds one of these.

use std::path::PathBuf;
use std::time::Duration;

use adbwatch_wire::{DEFAULT_HOST, DEFAULT_PORT, TcpDialer};

use crate::restart::AdbServerLauncher;

/// Restart budget and backoff for a server that keeps dying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before the second consecutive restart. The first restart after
    /// a healthy session happens immediately. Default: 500ms.
    pub initial_delay: Duration,

    /// Upper bound on backoff delay. Default: 30s.
    pub max_delay: Duration,

    /// Consecutive restarts allowed without receiving a device list in
    /// between. `None` means retry forever. Default: 5.
    pub max_restarts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_restarts: Some(5),
        }
    }
}

impl ReconnectConfig {
    /// Delay to wait before restart number `attempt` (0-based, counted
    /// since the last device list received).
    ///
    /// `delay = min(initial * 2^(attempt-1), max) * jitter` for
    /// `attempt >= 1`; jitter is +-25% so that several watchers sharing a
    /// server don't restart it in lockstep.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * 2.0_f64.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());

        // Deterministic "jitter" seeded from the attempt number.
        let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
        Duration::from_secs_f64((capped * jitter_factor).max(0.0))
    }

    /// Whether restart number `attempt` (0-based) is still within budget.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_restarts.is_none_or(|max| attempt < max)
    }
}

/// Everything needed to watch a real adb server over TCP.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// adb server host. Default: `localhost`.
    pub host: String,
    /// adb server port. Default: 5037.
    pub port: u16,
    /// Connect timeout for each dial.
    pub dial_timeout: Duration,
    /// `adb` binary used to restart the server.
    pub adb_path: PathBuf,
    pub reconnect: ReconnectConfig,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            dial_timeout: Duration::from_secs(5),
            adb_path: PathBuf::from("adb"),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl WatcherConfig {
    pub fn dialer(&self) -> TcpDialer {
        TcpDialer::new(self.host.clone(), self.port).with_timeout(self.dial_timeout)
    }

    pub fn launcher(&self) -> AdbServerLauncher {
        AdbServerLauncher::new(self.adb_path.clone(), self.port)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_millis(500));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert_eq!(config.max_restarts, Some(5));
    }

    #[test]
    fn first_restart_is_immediate() {
        assert_eq!(ReconnectConfig::default().backoff(0), Duration::ZERO);
    }

    #[test]
    fn backoff_increases_exponentially() {
        let config = ReconnectConfig::default();

        let d1 = config.backoff(1);
        let d2 = config.backoff(2);
        let d3 = config.backoff(3);

        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
        assert!(d3 > d2, "d3 ({d3:?}) should be greater than d2 ({d2:?})");
    }

    #[test]
    fn backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
            max_restarts: None,
        };

        let d20 = config.backoff(20);
        // With jitter factor up to 1.25, max effective is 12.5s
        assert!(
            d20 <= Duration::from_millis(12_500),
            "delay at attempt 20 ({d20:?}) should be capped near max_delay"
        );
    }

    #[test]
    fn restart_budget() {
        let bounded = ReconnectConfig {
            max_restarts: Some(2),
            ..ReconnectConfig::default()
        };
        assert!(bounded.allows(0));
        assert!(bounded.allows(1));
        assert!(!bounded.allows(2));

        let unbounded = ReconnectConfig {
            max_restarts: None,
            ..ReconnectConfig::default()
        };
        assert!(unbounded.allows(u32::MAX));
    }

    #[test]
    fn watcher_config_builds_collaborators() {
        let config = WatcherConfig {
            host: "10.0.0.2".into(),
            port: 5038,
            adb_path: PathBuf::from("/usr/bin/adb"),
            ..WatcherConfig::default()
        };

        assert_eq!(config.dialer().addr(), "10.0.0.2:5038");
        assert_eq!(config.launcher(), AdbServerLauncher::new("/usr/bin/adb", 5038));
    }
}

//! Configuration for the adbwatch binary.
//!
//! Layers built-in defaults, an optional TOML file and `ADBWATCH_*`
//! environment variables, then validates the result into an
//! `adbwatch_core::WatcherConfig`.
//!
//! ```toml
//! host = "localhost"
//! port = 5037
//! adb_path = "adb"
//! dial_timeout_secs = 5
//!
//! [reconnect]
//! initial_delay_ms = 500
//! max_delay_ms = 30000
//! max_restarts = 5   # 0 = keep restarting forever
//! ```
//!
//! Nested keys are reached from the environment with a double underscore,
//! e.g. `ADBWATCH_RECONNECT__MAX_RESTARTS=0`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use adbwatch_core::{ReconnectConfig, WatcherConfig};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "ADBWATCH_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl ConfigError {
    fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// adb server host.
    pub host: String,

    /// adb server port.
    pub port: u16,

    /// `adb` binary used to restart the server.
    pub adb_path: PathBuf,

    /// Connect timeout per dial, in seconds.
    pub dial_timeout_secs: u64,

    pub reconnect: Reconnect,
}

impl Default for Config {
    fn default() -> Self {
        let core = WatcherConfig::default();
        Self {
            host: core.host,
            port: core.port,
            adb_path: core.adb_path,
            dial_timeout_secs: core.dial_timeout.as_secs(),
            reconnect: Reconnect::default(),
        }
    }
}

/// The `[reconnect]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Reconnect {
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,

    /// Consecutive restarts before giving up. `0` means never give up.
    pub max_restarts: u32,
}

impl Default for Reconnect {
    fn default() -> Self {
        let core = ReconnectConfig::default();
        Self {
            initial_delay_ms: millis(core.initial_delay),
            max_delay_ms: millis(core.max_delay),
            max_restarts: core.max_restarts.unwrap_or(0),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

// ── Validation ──────────────────────────────────────────────────────

impl Config {
    /// Validate and convert into the watcher's runtime configuration.
    pub fn to_watcher_config(&self) -> Result<WatcherConfig, ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid("host", "must not be empty"));
        }
        if self.port == 0 {
            return Err(ConfigError::invalid("port", "must be between 1 and 65535"));
        }
        if self.adb_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("adb_path", "must not be empty"));
        }
        if self.dial_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "dial_timeout_secs",
                "must be at least 1 second",
            ));
        }
        if self.reconnect.max_delay_ms < self.reconnect.initial_delay_ms {
            return Err(ConfigError::invalid(
                "reconnect.max_delay_ms",
                format!(
                    "{} is below reconnect.initial_delay_ms ({})",
                    self.reconnect.max_delay_ms, self.reconnect.initial_delay_ms
                ),
            ));
        }

        Ok(WatcherConfig {
            host: self.host.clone(),
            port: self.port,
            dial_timeout: Duration::from_secs(self.dial_timeout_secs),
            adb_path: self.adb_path.clone(),
            reconnect: ReconnectConfig {
                initial_delay: Duration::from_millis(self.reconnect.initial_delay_ms),
                max_delay: Duration::from_millis(self.reconnect.max_delay_ms),
                max_restarts: (self.reconnect.max_restarts > 0)
                    .then_some(self.reconnect.max_restarts),
            },
        })
    }

    /// Render as TOML, as it would appear in the config file.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "adbwatch", "adbwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("adbwatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the default path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` + environment. A missing file is not an
/// error; defaults and environment still apply.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use figment::Jail;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_match_the_core_defaults() {
        let watcher = Config::default().to_watcher_config().unwrap();
        let core = WatcherConfig::default();

        assert_eq!(watcher.host, core.host);
        assert_eq!(watcher.port, core.port);
        assert_eq!(watcher.adb_path, core.adb_path);
        assert_eq!(watcher.dial_timeout, core.dial_timeout);
        assert_eq!(watcher.reconnect, core.reconnect);
    }

    #[test]
    fn missing_file_yields_defaults() {
        Jail::expect_with(|_jail| {
            let config = load_config_from(Path::new("does-not-exist.toml")).unwrap();
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn file_overrides_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                    host = "10.0.0.2"
                    adb_path = "/opt/platform-tools/adb"

                    [reconnect]
                    max_restarts = 2
                "#,
            )?;

            let config = load_config_from(Path::new("config.toml")).unwrap();
            assert_eq!(config.host, "10.0.0.2");
            assert_eq!(config.port, 5037);
            assert_eq!(config.adb_path, PathBuf::from("/opt/platform-tools/adb"));
            assert_eq!(config.reconnect.max_restarts, 2);
            assert_eq!(config.reconnect.initial_delay_ms, 500);
            Ok(())
        });
    }

    #[test]
    fn environment_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "port = 5038\n")?;
            jail.set_env("ADBWATCH_PORT", "5039");
            jail.set_env("ADBWATCH_ADB_PATH", "/usr/local/bin/adb");
            jail.set_env("ADBWATCH_RECONNECT__MAX_RESTARTS", "0");

            let config = load_config_from(Path::new("config.toml")).unwrap();
            assert_eq!(config.port, 5039);
            assert_eq!(config.adb_path, PathBuf::from("/usr/local/bin/adb"));

            let watcher = config.to_watcher_config().unwrap();
            assert_eq!(watcher.reconnect.max_restarts, None);
            Ok(())
        });
    }

    #[test]
    fn malformed_file_is_figment_error() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "port = \"not a number\"\n")?;

            let err = load_config_from(Path::new("config.toml")).unwrap_err();
            assert!(matches!(err, ConfigError::Figment(_)), "got {err:?}");
            Ok(())
        });
    }

    #[test]
    fn zero_port_is_rejected() {
        let config = Config {
            port: 0,
            ..Config::default()
        };
        let err = config.to_watcher_config().unwrap_err();
        assert!(
            matches!(&err, ConfigError::Validation { field, .. } if field == "port"),
            "got {err:?}"
        );
    }

    #[test]
    fn max_delay_below_initial_is_rejected() {
        let config = Config {
            reconnect: Reconnect {
                initial_delay_ms: 1_000,
                max_delay_ms: 10,
                max_restarts: 5,
            },
            ..Config::default()
        };
        let err = config.to_watcher_config().unwrap_err();
        assert!(
            err.to_string().contains("reconnect.max_delay_ms"),
            "got {err}"
        );
    }

    #[test]
    fn toml_rendering_includes_reconnect_table() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("port = 5037"), "{rendered}");
        assert!(rendered.contains("[reconnect]"), "{rendered}");

        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn config_path_is_a_toml_file() {
        assert!(config_path().ends_with("config.toml"));
    }
}

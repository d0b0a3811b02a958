//! Clap derive structures for the `adbwatch` CLI.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use adbwatch_config::Config;

// ── Top-Level CLI ────────────────────────────────────────────────────

/// adbwatch -- follow adb devices as they come and go
#[derive(Debug, Parser)]
#[command(
    name = "adbwatch",
    version,
    about = "Stream Android device state changes from the adb server",
    long_about = "Tracks the devices known to a local or remote adb server and prints one\n\
        line per device that appears, disappears or changes state.\n\n\
        If the adb server dies, adbwatch restarts it and carries on.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file to load instead of the default location
    #[arg(long, env = "ADBWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl GlobalOpts {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(adbwatch_config::config_path)
    }
}

// ── Output ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Tab-separated: kind, serial, old state, new state
    Plain,
    /// One JSON object per line
    Json,
}

// ── Commands ─────────────────────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Stream device changes until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Inspect configuration
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Output format
    #[arg(long, short = 'o', default_value = "plain")]
    pub output: OutputFormat,

    /// adb server host (overrides config)
    #[arg(long, short = 'H')]
    pub host: Option<String>,

    /// adb server port (overrides config)
    #[arg(long, short = 'P')]
    pub port: Option<u16>,

    /// adb binary used to restart the server (overrides config)
    #[arg(long)]
    pub adb_path: Option<PathBuf>,
}

impl WatchArgs {
    /// Layer command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(adb_path) = &self.adb_path {
            config.adb_path.clone_from(adb_path);
        }
    }
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Display the resolved configuration (defaults, file and environment)
    Show,
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_tree_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn watch_overrides_replace_config_values() {
        let cli = Cli::try_parse_from([
            "adbwatch", "watch", "--host", "10.0.0.2", "-P", "5038", "--adb-path", "/opt/adb",
        ])
        .unwrap();
        let Command::Watch(args) = cli.command else {
            panic!("expected watch command");
        };

        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.host, "10.0.0.2");
        assert_eq!(config.port, 5038);
        assert_eq!(config.adb_path, PathBuf::from("/opt/adb"));
    }

    #[test]
    fn watch_without_overrides_keeps_config() {
        let cli = Cli::try_parse_from(["adbwatch", "watch"]).unwrap();
        let Command::Watch(args) = cli.command else {
            panic!("expected watch command");
        };
        assert_eq!(args.output, OutputFormat::Plain);

        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config, Config::default());
    }
}

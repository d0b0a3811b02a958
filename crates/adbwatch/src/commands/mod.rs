//! Command dispatch.

pub mod config_cmd;
pub mod watch;

use adbwatch_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Load the layered config from `--config` (or the default path) plus
/// the environment.
pub(crate) fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = global.config_path();
    adbwatch_config::load_config_from(&path).map_err(|source| CliError::Config {
        path: path.display().to_string(),
        source,
    })
}

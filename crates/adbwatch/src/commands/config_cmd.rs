//! Config subcommand handlers.

use std::io::Write;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut out = std::io::stdout().lock();

    match args.command {
        ConfigCommand::Path => {
            writeln!(out, "{}", global.config_path().display())?;
        }
        ConfigCommand::Show => {
            let config = super::load_config(global)?;
            let rendered = config.to_toml().map_err(|source| CliError::Config {
                path: global.config_path().display().to_string(),
                source,
            })?;
            write!(out, "{rendered}")?;
        }
    }

    Ok(())
}

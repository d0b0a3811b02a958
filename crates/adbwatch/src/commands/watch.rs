//! `adbwatch watch`: stream device changes to stdout.

use tracing::{debug, info, warn};

use adbwatch_core::DeviceWatcher;

use crate::cli::{GlobalOpts, WatchArgs};
use crate::error::CliError;
use crate::output;

pub async fn handle(args: &WatchArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let mut config = super::load_config(global)?;
    args.apply(&mut config);
    let watcher_config = config.to_watcher_config().map_err(|source| CliError::Config {
        path: global.config_path().display().to_string(),
        source,
    })?;

    info!(
        host = %watcher_config.host,
        port = watcher_config.port,
        "watching adb devices"
    );
    let watcher = DeviceWatcher::from_config(&watcher_config);
    let Some(mut events) = watcher.subscribe() else {
        return Err(CliError::StreamTaken);
    };

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            change = events.recv() => {
                let Some(change) = change else { break };
                output::write_change(&mut std::io::stdout(), args.output, &change)?;
            }
            result = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                match result {
                    Ok(()) => {
                        debug!("interrupted, shutting down");
                        watcher.shutdown();
                    }
                    Err(e) => warn!(error = %e, "cannot listen for Ctrl-C"),
                }
            }
        }
    }

    watcher.join().await;
    match watcher.last_error() {
        Some(err) => Err(CliError::from_watch(err, &watcher_config)),
        None => Ok(()),
    }
}

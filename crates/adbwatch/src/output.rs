//! Event rendering: plain text or JSON lines.

use std::io::Write;

use serde::Serialize;

use adbwatch_core::{ChangeKind, DeviceStateChange};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Placeholder for the missing side of an added/removed device in plain
/// output.
const ABSENT: &str = "-";

#[derive(Serialize)]
struct JsonChange<'a> {
    kind: ChangeKind,
    #[serde(flatten)]
    change: &'a DeviceStateChange,
}

/// Render one change as a single line, without the trailing newline.
pub fn render_change(format: OutputFormat, change: &DeviceStateChange) -> Result<String, CliError> {
    match format {
        OutputFormat::Plain => Ok(format!(
            "{}\t{}\t{}\t{}",
            change.kind(),
            change.serial,
            or_absent(&change.old_state),
            or_absent(&change.new_state),
        )),
        OutputFormat::Json => Ok(serde_json::to_string(&JsonChange {
            kind: change.kind(),
            change,
        })?),
    }
}

/// Write one change and flush, so each event is visible as it happens.
pub fn write_change(
    out: &mut impl Write,
    format: OutputFormat,
    change: &DeviceStateChange,
) -> Result<(), CliError> {
    let line = render_change(format, change)?;
    writeln!(out, "{line}")?;
    out.flush()?;
    Ok(())
}

fn or_absent(state: &str) -> &str {
    if state.is_empty() { ABSENT } else { state }
}

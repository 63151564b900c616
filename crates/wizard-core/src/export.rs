use model::log::LogEntry;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::{error::WizardError, state::WizardState};

/// Renders logs as `[timestamp] LEVEL: message` lines joined by `\n`.
pub fn render_log_export(logs: &[LogEntry]) -> String {
    logs.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn log_file_name(migration_id: Option<&str>) -> String {
    format!("migration-logs-{}.txt", migration_id.unwrap_or("unsaved"))
}

/// Writes the console logs of `state` into `dir` and returns the file path.
pub async fn write_log_export(dir: &Path, state: &WizardState) -> Result<PathBuf, WizardError> {
    let path = dir.join(log_file_name(state.migration_id.as_deref()));
    tokio::fs::write(&path, render_log_export(&state.logs)).await?;
    info!(path = %path.display(), entries = state.logs.len(), "Wrote log export");
    Ok(path)
}

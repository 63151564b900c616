use model::{
    connection::DatabaseConfig,
    rule::{ManualRule, fill_missing_ids},
    selection::SchemaSelection,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};
use wizard_core::clock::Clock;
use wizard_runtime::settings::SimulationSettings;

use crate::{env::EnvManager, error::CliError};

/// What a user would enter across the wizard's input steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    pub database_config: DatabaseConfig,
    pub schema_selection: SchemaSelection,
    #[serde(default)]
    pub manual_rules: Vec<ManualRule>,
}

/// Reads a session file. Rules written without an id get one from `clock`.
pub async fn load_session(path: &Path, clock: &dyn Clock) -> Result<SessionConfig, CliError> {
    let source = tokio::fs::read_to_string(path).await?;
    let mut session: SessionConfig = serde_json::from_str(&source)?;

    let filled = fill_missing_ids(&mut session.manual_rules, clock.now());
    if filled > 0 {
        debug!(filled, "Assigned ids to manual rules");
    }
    info!(
        path = %path.display(),
        tables = session.schema_selection.selected_tables.len(),
        rules = session.manual_rules.len(),
        "Loaded session"
    );
    Ok(session)
}

/// Settings from an optional JSON file, then `WIZARD_*` overrides.
pub async fn load_settings(
    path: Option<&Path>,
    env: &EnvManager,
) -> Result<SimulationSettings, CliError> {
    let mut settings = match path {
        Some(path) => {
            let source = tokio::fs::read_to_string(path).await?;
            serde_json::from_str(&source)?
        }
        None => SimulationSettings::default(),
    };

    env.apply(&mut settings)?;
    settings.validate()?;
    Ok(settings)
}

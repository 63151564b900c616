use model::{
    connection::DatabaseConfig, log::LogEntry, report::DryRunResult, rule::ManualRule,
    selection::SchemaSelection,
};
use serde::{Deserialize, Serialize};

use crate::step::FIRST_STEP;

/// Snapshot of the whole migration wizard.
///
/// Every view reads from this and nothing else; changes go through
/// [`crate::reducer::reduce`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardState {
    /// 1-based step index. Not bounds-checked here; see [`crate::step`].
    pub current_step: i64,
    pub is_completed: bool,
    pub database_config: Option<DatabaseConfig>,
    pub schema_selection: Option<SchemaSelection>,
    pub dry_run_result: Option<DryRunResult>,
    pub manual_rules: Vec<ManualRule>,
    pub migration_id: Option<String>,
    pub is_running: bool,
    pub logs: Vec<LogEntry>,
}

impl Default for WizardState {
    fn default() -> Self {
        WizardState {
            current_step: FIRST_STEP,
            is_completed: false,
            database_config: None,
            schema_selection: None,
            dry_run_result: None,
            manual_rules: Vec::new(),
            migration_id: None,
            is_running: false,
            logs: Vec::new(),
        }
    }
}

impl WizardState {
    pub fn rule(&self, id: &str) -> Option<&ManualRule> {
        self.manual_rules.iter().find(|r| r.id == id)
    }

    pub fn selected_tables(&self) -> &[String] {
        self.schema_selection
            .as_ref()
            .map(|s| s.selected_tables.as_slice())
            .unwrap_or_default()
    }
}

use chrono::{DateTime, Utc};
use model::{
    connection::EngineKind,
    report::{IssueStats, format_minutes},
};
use serde::Serialize;

use crate::{action::WizardAction, state::WizardState, step::WizardStep};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSummary {
    pub engine: EngineKind,
    pub address: String,
    pub ssl: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSummary {
    pub id: String,
    pub source_table: String,
    pub target_table: String,
    pub transformations: usize,
}

/// Everything the confirmation screen shows before a run is started.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewSummary {
    pub source: Option<EndpointSummary>,
    pub target: Option<EndpointSummary>,
    pub tables: usize,
    pub views: usize,
    pub functions: usize,
    pub include_data: bool,
    pub include_indexes: bool,
    pub include_constraints: bool,
    pub issues: IssueStats,
    pub estimated_time: Option<String>,
    pub estimated_rows: Option<u64>,
    pub rules: Vec<RuleSummary>,
}

impl PreviewSummary {
    pub fn from_state(state: &WizardState) -> Self {
        let endpoint = |cfg: &model::connection::ConnectionConfig| EndpointSummary {
            engine: cfg.engine,
            address: cfg.display_address(),
            ssl: cfg.ssl_enabled(),
        };
        let selection = state.schema_selection.as_ref();
        let dry_run = state.dry_run_result.as_ref();

        PreviewSummary {
            source: state.database_config.as_ref().map(|c| endpoint(&c.source)),
            target: state.database_config.as_ref().map(|c| endpoint(&c.target)),
            tables: selection.map_or(0, |s| s.selected_tables.len()),
            views: selection.map_or(0, |s| s.selected_views.len()),
            functions: selection.map_or(0, |s| s.selected_functions.len()),
            include_data: selection.is_some_and(|s| s.include_data),
            include_indexes: selection.is_some_and(|s| s.include_indexes),
            include_constraints: selection.is_some_and(|s| s.include_constraints),
            issues: dry_run.map(|r| r.stats()).unwrap_or_default(),
            estimated_time: dry_run.map(|r| format_minutes(r.estimated_time)),
            estimated_rows: dry_run.map(|r| r.estimated_rows),
            rules: state
                .manual_rules
                .iter()
                .map(|r| RuleSummary {
                    id: r.id.clone(),
                    source_table: r.source_table.clone(),
                    target_table: r.target_table.clone(),
                    transformations: r.transformations.len(),
                })
                .collect(),
        }
    }
}

/// Id in the `migration-<unix millis>` form.
pub fn migration_id(now: DateTime<Utc>) -> String {
    format!("migration-{}", now.timestamp_millis())
}

/// Actions the confirm button dispatches, in order.
pub fn start_actions(migration_id: &str) -> [WizardAction; 2] {
    [
        WizardAction::StartMigration(migration_id.to_string()),
        WizardAction::SetStep(WizardStep::MigrationConsole.index()),
    ]
}

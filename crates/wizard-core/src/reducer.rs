//! The wizard reducer: a total function from `(state, action)` to the next state.

use chrono::{DateTime, Utc};
use model::log::{LogEntry, LogLevel};

use crate::{
    action::{JournalEntry, WizardAction},
    clock::Clock,
    state::WizardState,
};

pub const MIGRATION_STARTED: &str = "Migration started";

/// Applies `action` to `state`. `now` stamps any log entry the action creates.
///
/// Never fails: unknown rule ids are no-ops and step indices are stored as
/// given.
pub fn reduce(mut state: WizardState, action: WizardAction, now: DateTime<Utc>) -> WizardState {
    match action {
        WizardAction::SetStep(step) => state.current_step = step,
        WizardAction::SetDatabaseConfig(config) => state.database_config = Some(config),
        WizardAction::SetSchemaSelection(selection) => state.schema_selection = Some(selection),
        WizardAction::SetDryRunResult(result) => state.dry_run_result = Some(result),
        WizardAction::AddManualRule(rule) => state.manual_rules.push(rule),
        WizardAction::UpdateManualRule { id, rule } => {
            // Every matching rule receives the patch.
            for existing in state.manual_rules.iter_mut().filter(|r| r.id == id) {
                existing.merge(rule.clone());
            }
        }
        WizardAction::RemoveManualRule(id) => state.manual_rules.retain(|r| r.id != id),
        WizardAction::StartMigration(id) => {
            state.migration_id = Some(id);
            state.is_running = true;
            state.logs = vec![LogEntry::new(now, LogLevel::Info, MIGRATION_STARTED)];
        }
        WizardAction::StopMigration => state.is_running = false,
        WizardAction::AddLog { level, message } => {
            state.logs.push(LogEntry::new(now, level, message));
        }
        WizardAction::ResetWizard => state = WizardState::default(),
    }
    state
}

/// Folds bare actions from the initial state, stamping each with `clock`.
pub fn replay<I>(actions: I, clock: &dyn Clock) -> WizardState
where
    I: IntoIterator<Item = WizardAction>,
{
    actions
        .into_iter()
        .fold(WizardState::default(), |state, action| {
            reduce(state, action, clock.now())
        })
}

/// Folds a recorded journal, reusing the time each action was first applied
/// with, so the result matches the live state exactly.
pub fn replay_journal<I>(entries: I) -> WizardState
where
    I: IntoIterator<Item = JournalEntry>,
{
    entries
        .into_iter()
        .fold(WizardState::default(), |state, entry| {
            reduce(state, entry.action, entry.at)
        })
}

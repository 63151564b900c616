use chrono::{DateTime, Utc};
use model::{
    connection::DatabaseConfig,
    log::LogLevel,
    report::DryRunResult,
    rule::{ManualRule, ManualRulePatch},
    selection::SchemaSelection,
};
use serde::{Deserialize, Serialize};

use crate::error::WizardError;

/// Commands accepted by the wizard store.
///
/// On the wire an action is `{ "type": "SET_STEP", "payload": 2 }`; actions
/// without data omit `payload`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WizardAction {
    SetStep(i64),
    SetDatabaseConfig(DatabaseConfig),
    SetSchemaSelection(SchemaSelection),
    SetDryRunResult(DryRunResult),
    AddManualRule(ManualRule),
    UpdateManualRule { id: String, rule: ManualRulePatch },
    RemoveManualRule(String),
    StartMigration(String),
    StopMigration,
    AddLog { level: LogLevel, message: String },
    ResetWizard,
}

impl WizardAction {
    pub fn kind(&self) -> &'static str {
        match self {
            WizardAction::SetStep(_) => "SET_STEP",
            WizardAction::SetDatabaseConfig(_) => "SET_DATABASE_CONFIG",
            WizardAction::SetSchemaSelection(_) => "SET_SCHEMA_SELECTION",
            WizardAction::SetDryRunResult(_) => "SET_DRY_RUN_RESULT",
            WizardAction::AddManualRule(_) => "ADD_MANUAL_RULE",
            WizardAction::UpdateManualRule { .. } => "UPDATE_MANUAL_RULE",
            WizardAction::RemoveManualRule(_) => "REMOVE_MANUAL_RULE",
            WizardAction::StartMigration(_) => "START_MIGRATION",
            WizardAction::StopMigration => "STOP_MIGRATION",
            WizardAction::AddLog { .. } => "ADD_LOG",
            WizardAction::ResetWizard => "RESET_WIZARD",
        }
    }

    pub fn log(level: LogLevel, message: impl Into<String>) -> Self {
        WizardAction::AddLog {
            level,
            message: message.into(),
        }
    }

    pub fn update_rule(id: impl Into<String>, rule: ManualRulePatch) -> Self {
        WizardAction::UpdateManualRule {
            id: id.into(),
            rule,
        }
    }
}

/// One recorded dispatch: the action and the time the store stamped it with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub at: DateTime<Utc>,
    pub action: WizardAction,
}

/// Parses a recorded action journal: a JSON array of
/// `{ "at": ..., "action": { "type": ..., "payload": ... } }` entries.
pub fn parse_journal(json: &str) -> Result<Vec<JournalEntry>, WizardError> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_tagged_actions() {
        let json = r#"[
            {"type": "SET_STEP", "payload": 2},
            {"type": "REMOVE_MANUAL_RULE", "payload": "r1"},
            {"type": "ADD_LOG", "payload": {"level": "error", "message": "x"}},
            {"type": "UPDATE_MANUAL_RULE", "payload": {"id": "r2", "rule": {"targetTable": "t2"}}},
            {"type": "STOP_MIGRATION"},
            {"type": "RESET_WIZARD"}
        ]"#;

        let actions: Vec<WizardAction> = serde_json::from_str(json).unwrap();
        assert_eq!(actions[0], WizardAction::SetStep(2));
        assert_eq!(actions[1], WizardAction::RemoveManualRule("r1".into()));
        assert_eq!(actions[2], WizardAction::log(LogLevel::Error, "x"));
        assert_eq!(
            actions[3],
            WizardAction::update_rule("r2", ManualRulePatch::target_table("t2"))
        );
        assert_eq!(actions[4], WizardAction::StopMigration);
        assert_eq!(actions[5], WizardAction::ResetWizard);
    }

    #[test]
    fn writes_payload_next_to_type() {
        let json = serde_json::to_value(WizardAction::StartMigration("m1".into())).unwrap();
        assert_eq!(json["type"], "START_MIGRATION");
        assert_eq!(json["payload"], "m1");
    }

    #[test]
    fn journal_entries_keep_their_timestamp() {
        let json = r#"[
            {"at": "2024-01-15T08:00:05.250Z", "action": {"type": "ADD_LOG", "payload": {"level": "info", "message": "tick"}}}
        ]"#;

        let entries = parse_journal(json).unwrap();
        assert_eq!(entries[0].at.timestamp_millis(), 1_705_305_605_250);
        assert_eq!(entries[0].action, WizardAction::log(LogLevel::Info, "tick"));
    }

    #[test]
    fn rejects_unknown_action_type() {
        assert!(
            parse_journal(r#"[{"at": "2024-01-15T08:00:00Z", "action": {"type": "UNDO"}}]"#)
                .is_err()
        );
    }
}

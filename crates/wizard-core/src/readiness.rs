//! Decides whether the wizard may move past its current step.
//!
//! All forward-progress gating lives here so views only render the result.

use model::connection::Endpoint;
use serde::Serialize;
use std::fmt;

use crate::{state::WizardState, step::WizardStep};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum BlockReason {
    StepOutOfRange { step: i64 },
    FinalStep,
    DatabaseNotConfigured,
    IncompleteConnection {
        endpoint: Endpoint,
        missing: Vec<&'static str>,
    },
    SchemaNotSelected,
    NoTablesSelected,
    DryRunMissing,
    DryRunErrors { count: usize },
    InvalidRule { id: String },
    MigrationRunning,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockReason::StepOutOfRange { step } => write!(f, "step {step} does not exist"),
            BlockReason::FinalStep => f.write_str("already at the final step"),
            BlockReason::DatabaseNotConfigured => {
                f.write_str("database configuration has not been saved")
            }
            BlockReason::IncompleteConnection { endpoint, missing } => write!(
                f,
                "{endpoint} connection is missing: {}",
                missing.join(", ")
            ),
            BlockReason::SchemaNotSelected => f.write_str("schema selection has not been saved"),
            BlockReason::NoTablesSelected => f.write_str("no tables selected"),
            BlockReason::DryRunMissing => f.write_str("dry run has not been executed"),
            BlockReason::DryRunErrors { count } => {
                write!(f, "dry run reported {count} error(s); fix errors first")
            }
            BlockReason::InvalidRule { id } => {
                write!(f, "rule `{id}` needs both a source and a target table")
            }
            BlockReason::MigrationRunning => f.write_str("a migration is already running"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reasons", rename_all = "camelCase")]
pub enum StepReadiness {
    Ready,
    Blocked(Vec<BlockReason>),
}

impl StepReadiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, StepReadiness::Ready)
    }

    pub fn reasons(&self) -> &[BlockReason] {
        match self {
            StepReadiness::Ready => &[],
            StepReadiness::Blocked(reasons) => reasons,
        }
    }

    fn from_reasons(reasons: Vec<BlockReason>) -> Self {
        if reasons.is_empty() {
            StepReadiness::Ready
        } else {
            StepReadiness::Blocked(reasons)
        }
    }
}

/// Readiness to move forward from `state.current_step`.
pub fn step_readiness(state: &WizardState) -> StepReadiness {
    let Some(step) = WizardStep::from_index(state.current_step) else {
        return StepReadiness::Blocked(vec![BlockReason::StepOutOfRange {
            step: state.current_step,
        }]);
    };
    readiness_for(state, step)
}

pub fn can_advance(state: &WizardState) -> bool {
    step_readiness(state).is_ready()
}

/// Readiness to leave `step`, regardless of where the wizard currently is.
pub fn readiness_for(state: &WizardState, step: WizardStep) -> StepReadiness {
    let mut reasons = Vec::new();

    match step {
        WizardStep::DatabaseConfig => check_database(state, &mut reasons),
        WizardStep::SchemaSelection => check_selection(state, &mut reasons),
        WizardStep::DryRun => check_dry_run(state, &mut reasons),
        WizardStep::ManualRules => check_rules(state, &mut reasons),
        WizardStep::Preview => {
            check_database(state, &mut reasons);
            check_selection(state, &mut reasons);
            check_dry_run(state, &mut reasons);
            if state.is_running {
                reasons.push(BlockReason::MigrationRunning);
            }
        }
        WizardStep::MigrationConsole => reasons.push(BlockReason::FinalStep),
    }

    StepReadiness::from_reasons(reasons)
}

fn check_database(state: &WizardState, reasons: &mut Vec<BlockReason>) {
    let Some(config) = &state.database_config else {
        reasons.push(BlockReason::DatabaseNotConfigured);
        return;
    };

    for endpoint in [Endpoint::Source, Endpoint::Target] {
        let missing = config.endpoint(endpoint).missing_fields();
        if !missing.is_empty() {
            reasons.push(BlockReason::IncompleteConnection { endpoint, missing });
        }
    }
}

fn check_selection(state: &WizardState, reasons: &mut Vec<BlockReason>) {
    match &state.schema_selection {
        None => reasons.push(BlockReason::SchemaNotSelected),
        Some(sel) if !sel.has_tables() => reasons.push(BlockReason::NoTablesSelected),
        Some(_) => {}
    }
}

fn check_dry_run(state: &WizardState, reasons: &mut Vec<BlockReason>) {
    match &state.dry_run_result {
        None => reasons.push(BlockReason::DryRunMissing),
        Some(result) if result.has_errors() => reasons.push(BlockReason::DryRunErrors {
            count: result.stats().error,
        }),
        Some(_) => {}
    }
}

fn check_rules(state: &WizardState, reasons: &mut Vec<BlockReason>) {
    reasons.extend(
        state
            .manual_rules
            .iter()
            .filter(|r| !r.is_valid())
            .map(|r| BlockReason::InvalidRule { id: r.id.clone() }),
    );
}

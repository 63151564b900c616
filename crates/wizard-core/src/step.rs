use serde::Serialize;
use std::fmt;

pub const FIRST_STEP: i64 = 1;
pub const LAST_STEP: i64 = 6;

/// The six screens of the wizard, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WizardStep {
    DatabaseConfig = 1,
    SchemaSelection = 2,
    DryRun = 3,
    ManualRules = 4,
    Preview = 5,
    MigrationConsole = 6,
}

impl WizardStep {
    pub const ALL: [WizardStep; 6] = [
        WizardStep::DatabaseConfig,
        WizardStep::SchemaSelection,
        WizardStep::DryRun,
        WizardStep::ManualRules,
        WizardStep::Preview,
        WizardStep::MigrationConsole,
    ];

    pub fn from_index(index: i64) -> Option<Self> {
        Self::ALL.iter().copied().find(|s| s.index() == index)
    }

    pub fn index(&self) -> i64 {
        *self as i64
    }

    pub fn title(&self) -> &'static str {
        match self {
            WizardStep::DatabaseConfig => "Database Configuration",
            WizardStep::SchemaSelection => "Schema Selection",
            WizardStep::DryRun => "Dry Run & Validation",
            WizardStep::ManualRules => "Manual Rules & Options",
            WizardStep::Preview => "Preview & Confirm",
            WizardStep::MigrationConsole => "Migration Console",
        }
    }

    pub fn next(&self) -> Option<Self> {
        Self::from_index(self.index() + 1)
    }

    pub fn previous(&self) -> Option<Self> {
        Self::from_index(self.index() - 1)
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Step {} of {}: {}", self.index(), LAST_STEP, self.title())
    }
}

/// Pulls an arbitrary step index back into `[FIRST_STEP, LAST_STEP]`.
pub fn clamp_step(step: i64) -> i64 {
    step.clamp(FIRST_STEP, LAST_STEP)
}

/// Overall wizard progress for the current step, in percent.
pub fn progress_percent(step: i64) -> f64 {
    clamp_step(step) as f64 / LAST_STEP as f64 * 100.0
}

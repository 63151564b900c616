//! Simulated pre-migration validation.

use chrono::Utc;
use model::{
    catalog::SchemaCatalog,
    events::DryRunProgress,
    report::{DryRunResult, Issue, Severity},
    selection::SchemaSelection,
};
use rand::Rng;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wizard_core::{
    action::WizardAction,
    event_bus::EventBus,
    persistence::{DRY_RUN_REPORTS, PersistenceClient},
    store::WizardHandle,
};

use crate::{error::SimulationError, settings::SimulationSettings};

pub const PHASES: [&str; 7] = [
    "Analyzing source schema...",
    "Checking target compatibility...",
    "Validating data types...",
    "Examining constraints...",
    "Testing foreign keys...",
    "Calculating estimates...",
    "Generating report...",
];

/// Phase shown at `progress` percent; `None` once the run is complete.
pub fn phase_for(progress: f64) -> Option<&'static str> {
    let index = (progress / 100.0 * PHASES.len() as f64).floor();
    if index < 0.0 {
        return PHASES.first().copied();
    }
    PHASES.get(index as usize).copied()
}

/// Every finding the simulated analyzer knows about.
fn known_issues() -> Vec<Issue> {
    vec![
        Issue::error(
            "users",
            "Column \"created_at\" has incompatible data type TIMESTAMP vs DATETIME",
            "Convert TIMESTAMP to DATETIME format during migration",
        ),
        Issue::error(
            "orders",
            "Primary key constraint name conflicts with target database reserved words",
            "Rename constraint from \"order\" to \"order_pk\"",
        ),
        Issue::warning(
            "orders",
            "Large table (45K+ rows) may take significant time to migrate",
            "Consider migrating in smaller batches of 10,000 rows",
        ),
        Issue::warning(
            "products",
            "Index \"idx_product_name\" uses unsupported collation in target database",
            "Will be recreated with compatible collation during migration",
        ),
        Issue::warning(
            "audit_logs",
            "Very large table (456K+ rows) detected",
            "Consider excluding historical data older than 1 year",
        ),
        Issue::info("categories", "Table structure is fully compatible"),
        Issue::info("suppliers", "Small table will migrate quickly"),
        Issue::info("inventory", "All data types are compatible"),
    ]
}

/// Findings and estimates for `selection`, restricted to selected tables.
pub fn analyze(selection: &SchemaSelection, catalog: &SchemaCatalog) -> DryRunResult {
    let issues = known_issues()
        .into_iter()
        .filter(|i| selection.is_table_selected(&i.table))
        .collect();
    let estimate = catalog.estimate(selection);
    let minutes = if selection.has_tables() {
        estimate.minutes.max(1)
    } else {
        0
    };

    DryRunResult {
        issues,
        estimated_time: minutes,
        estimated_rows: estimate.rows,
    }
}

pub struct DryRunner {
    settings: SimulationSettings,
    catalog: SchemaCatalog,
    client: Arc<dyn PersistenceClient>,
    bus: Option<EventBus>,
}

impl DryRunner {
    pub fn new(
        settings: SimulationSettings,
        catalog: SchemaCatalog,
        client: Arc<dyn PersistenceClient>,
    ) -> Self {
        DryRunner {
            settings,
            catalog,
            client,
            bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Runs the phased validation and stores the result in the wizard.
    ///
    /// Nothing is dispatched when the run is cancelled or times out.
    pub async fn run(
        &self,
        handle: &WizardHandle,
        cancel: &CancellationToken,
    ) -> Result<DryRunResult, SimulationError> {
        let selection = handle
            .read(|s| s.schema_selection.clone())
            .await
            .ok_or(SimulationError::NotConfigured("schema selection"))?;

        let timeout = self.settings.operation_timeout();
        let result = tokio::select! {
            _ = cancel.cancelled() => {
                warn!("Dry run cancelled");
                return Err(SimulationError::Cancelled);
            }
            ticked = tokio::time::timeout(timeout, self.tick_until_done()) => {
                ticked.map_err(|_| SimulationError::Timeout(timeout))?;
                analyze(&selection, &self.catalog)
            }
        };

        handle
            .dispatch(WizardAction::SetDryRunResult(result.clone()))
            .await;
        let report = serde_json::to_value(&result).unwrap_or_default();
        self.client.insert(DRY_RUN_REPORTS, report).await?;

        info!(
            errors = result.count(Severity::Error),
            warnings = result.count(Severity::Warning),
            "Dry run completed"
        );
        Ok(result)
    }

    async fn tick_until_done(&self) {
        let mut rng = self.settings.rng(2);
        let mut ticker = tokio::time::interval(self.settings.dry_run_tick());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let mut progress = 0.0_f64;
        let mut phase = None;

        while progress < 100.0 {
            ticker.tick().await;
            progress += rng.r#gen::<f64>() * self.settings.dry_run_max_step;

            let current = phase_for(progress);
            if current.is_some() && current != phase {
                phase = current;
                debug!(progress, phase = ?current, "Dry run phase");
            }

            if let Some(bus) = &self.bus {
                bus.publish(DryRunProgress {
                    percentage: progress.min(100.0),
                    phase: current,
                    timestamp: Utc::now(),
                })
                .await;
            }
        }
    }
}

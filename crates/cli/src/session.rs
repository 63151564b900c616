use model::{
    catalog::SchemaCatalog,
    connection::Endpoint,
    report::{DryRunResult, Severity},
};
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wizard_core::{
    action::WizardAction,
    clock::Clock,
    event_bus::EventBus,
    persistence::{PersistenceClient, stub::StubClient},
    preview::PreviewSummary,
    readiness::StepReadiness,
    store::{WizardHandle, WizardStore},
};
use wizard_runtime::{
    catalog::{SchemaLoader, save_selection},
    connection::{ConnectionOutcome, ConnectionProbe, SimulatedProbe},
    dry_run::DryRunner,
    migration::{MigrationOutcome, MigrationReport, MigrationRunner},
    settings::SimulationSettings,
};

use crate::{config::SessionConfig, error::CliError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub final_step: i64,
    pub dry_run: DryRunResult,
    pub preview: PreviewSummary,
    pub migration: Option<MigrationReport>,
    pub log_file: Option<PathBuf>,
}

/// Walks one wizard session through its steps without a UI.
pub struct SessionDriver {
    handle: WizardHandle,
    settings: SimulationSettings,
    client: Arc<dyn PersistenceClient>,
    bus: EventBus,
}

impl SessionDriver {
    pub fn new(settings: SimulationSettings, clock: Arc<dyn Clock>) -> Self {
        let bus = EventBus::new();
        let store = WizardStore::new(clock)
            .with_event_bus(bus.clone())
            .with_journal();

        SessionDriver {
            handle: WizardHandle::new(store),
            settings,
            client: Arc::new(StubClient::new()),
            bus,
        }
    }

    pub fn handle(&self) -> &WizardHandle {
        &self.handle
    }

    async fn advance(&self) -> Result<(), CliError> {
        let step = self.handle.read(|s| s.current_step).await;
        match self.handle.advance().await {
            StepReadiness::Ready => Ok(()),
            StepReadiness::Blocked(reasons) => Err(CliError::StepBlocked { step, reasons }),
        }
    }

    /// Step 1. Failed probes are reported but do not block saving, as in
    /// the form where testing is optional.
    pub async fn configure(
        &self,
        session: &SessionConfig,
        cancel: &CancellationToken,
    ) -> Result<(), CliError> {
        let probe = SimulatedProbe::new(self.settings.clone()).with_event_bus(self.bus.clone());

        for endpoint in [Endpoint::Source, Endpoint::Target] {
            let config = session.database_config.endpoint(endpoint);
            if let ConnectionOutcome::Failed { reason } = probe.probe(endpoint, config, cancel).await?
            {
                warn!(%endpoint, %reason, "Continuing with untested connection");
            }
        }

        self.handle
            .dispatch(WizardAction::SetDatabaseConfig(
                session.database_config.clone(),
            ))
            .await;
        self.advance().await
    }

    /// Step 2. Returns the loaded catalog for the dry run.
    pub async fn select_schema(
        &self,
        session: &SessionConfig,
        cancel: &CancellationToken,
    ) -> Result<SchemaCatalog, CliError> {
        let catalog = SchemaLoader::new(self.settings.clone(), self.client.clone())
            .load(&self.handle, cancel)
            .await?;
        save_selection(&self.handle, session.schema_selection.clone()).await?;
        self.advance().await?;
        Ok(catalog)
    }

    /// Step 3. Returns the result even when errors block the next step.
    pub async fn dry_run(
        &self,
        catalog: SchemaCatalog,
        cancel: &CancellationToken,
    ) -> Result<DryRunResult, CliError> {
        let result = DryRunner::new(self.settings.clone(), catalog, self.client.clone())
            .with_event_bus(self.bus.clone())
            .run(&self.handle, cancel)
            .await?;
        Ok(result)
    }

    /// Step 4.
    pub async fn add_rules(&self, session: &SessionConfig) -> Result<(), CliError> {
        self.handle
            .dispatch_all(
                session
                    .manual_rules
                    .iter()
                    .cloned()
                    .map(WizardAction::AddManualRule),
            )
            .await;
        self.advance().await
    }

    /// Steps 5 and 6: confirm, then run until done or cancelled.
    pub async fn migrate(&self, cancel: &CancellationToken) -> Result<MigrationReport, CliError> {
        let runner = MigrationRunner::new(self.settings.clone(), self.client.clone())
            .with_event_bus(self.bus.clone());
        runner.start(&self.handle).await?;
        Ok(runner.run(&self.handle, cancel).await?)
    }

    /// Runs every step in order. Stops after the dry run when `migrate` is
    /// false.
    pub async fn run(
        &self,
        session: &SessionConfig,
        migrate: bool,
        cancel: &CancellationToken,
    ) -> Result<SessionSummary, CliError> {
        self.configure(session, cancel).await?;
        let catalog = self.select_schema(session, cancel).await?;

        let result = self.dry_run(catalog, cancel).await?;
        for issue in result.with_severity(Severity::Error) {
            warn!(table = %issue.table, "{}", issue.message);
        }
        info!(
            errors = result.stats().error,
            warnings = result.stats().warning,
            "Dry run finished"
        );

        let migration = if migrate {
            self.advance().await?;
            self.add_rules(session).await?;
            let report = self.migrate(cancel).await?;
            if report.outcome == MigrationOutcome::Stopped {
                warn!(migration_id = %report.migration_id, "Migration did not complete");
            }
            Some(report)
        } else {
            None
        };

        let state = self.handle.snapshot().await;
        Ok(SessionSummary {
            final_step: state.current_step,
            dry_run: result,
            preview: PreviewSummary::from_state(&state),
            migration,
            log_file: None,
        })
    }
}

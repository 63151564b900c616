#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use model::{
    catalog::SchemaCatalog,
    connection::{ConnectionConfig, DatabaseConfig, EngineKind, Endpoint},
    report::DryRunResult,
    selection::SchemaSelection,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use wizard_core::{
    action::WizardAction,
    clock::FixedClock,
    event_bus::EventBus,
    persistence::stub::StubClient,
    store::{WizardHandle, WizardStore},
};
use wizard_runtime::{
    catalog::{SchemaLoader, save_selection},
    connection::{ConnectionOutcome, ConnectionProbe, SimulatedProbe},
    dry_run::DryRunner,
    migration::MigrationRunner,
    settings::SimulationSettings,
};

pub mod scenarios;
pub mod utils;

const SEED: u64 = 2024;

/// 1 ms ticks, a fixed seed, and local connections that always succeed.
pub fn test_settings() -> SimulationSettings {
    SimulationSettings {
        localhost_success_rate: 1.0,
        ..SimulationSettings::fast(SEED)
    }
}

pub fn session_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()
}

pub fn local(engine: EngineKind, database: &str) -> ConnectionConfig {
    ConnectionConfig {
        host: "localhost".into(),
        database: database.into(),
        username: "admin".into(),
        password: "secret".into(),
        ..ConnectionConfig::empty(engine)
    }
}

pub fn local_databases() -> DatabaseConfig {
    DatabaseConfig {
        source: local(EngineKind::Postgresql, "shop"),
        target: local(EngineKind::Mysql, "shop_v2"),
    }
}

pub fn selection(tables: &[&str]) -> SchemaSelection {
    let mut selection = SchemaSelection::default();
    selection.select_tables(tables.iter().copied());
    selection
}

/// One wizard session wired to a fixed clock, an event bus and a stub
/// backend.
pub struct Harness {
    pub clock: Arc<FixedClock>,
    pub bus: EventBus,
    pub client: Arc<StubClient>,
    pub handle: WizardHandle,
    pub settings: SimulationSettings,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    pub fn with_settings(settings: SimulationSettings) -> Self {
        let clock = Arc::new(FixedClock::new(session_start()));
        let bus = EventBus::new();
        let store = WizardStore::new(clock.clone())
            .with_event_bus(bus.clone())
            .with_journal();

        Harness {
            clock,
            bus,
            client: Arc::new(StubClient::new()),
            handle: WizardHandle::new(store),
            settings,
        }
    }

    /// Tests both endpoints, saves the config and leaves step 1.
    pub async fn configure(&self, config: DatabaseConfig) -> Vec<ConnectionOutcome> {
        let probe = SimulatedProbe::new(self.settings.clone()).with_event_bus(self.bus.clone());
        let cancel = CancellationToken::new();

        let mut outcomes = Vec::new();
        for endpoint in [Endpoint::Source, Endpoint::Target] {
            let outcome = probe
                .probe(endpoint, config.endpoint(endpoint), &cancel)
                .await
                .expect("probe");
            outcomes.push(outcome);
        }

        self.handle
            .dispatch(WizardAction::SetDatabaseConfig(config))
            .await;
        assert!(self.handle.advance().await.is_ready());
        outcomes
    }

    /// Loads the catalog, saves `tables` and leaves step 2.
    pub async fn select(&self, tables: &[&str]) -> SchemaCatalog {
        let catalog = SchemaLoader::new(self.settings.clone(), self.client.clone())
            .load(&self.handle, &CancellationToken::new())
            .await
            .expect("load schema");
        save_selection(&self.handle, selection(tables))
            .await
            .expect("save selection");
        assert!(self.handle.advance().await.is_ready());
        catalog
    }

    pub async fn dry_run(&self, catalog: SchemaCatalog) -> DryRunResult {
        DryRunner::new(self.settings.clone(), catalog, self.client.clone())
            .with_event_bus(self.bus.clone())
            .run(&self.handle, &CancellationToken::new())
            .await
            .expect("dry run")
    }

    pub fn runner(&self) -> MigrationRunner {
        MigrationRunner::new(self.settings.clone(), self.client.clone())
            .with_event_bus(self.bus.clone())
    }

    /// Steps 1 to 4 with a clean selection, ending on the preview.
    pub async fn ready_for_preview(&self, tables: &[&str]) {
        self.configure(local_databases()).await;
        let catalog = self.select(tables).await;
        let result = self.dry_run(catalog).await;
        assert!(!result.has_errors(), "selection must be clean: {result:?}");
        assert!(self.handle.advance().await.is_ready());
        assert!(self.handle.advance().await.is_ready());
        info!(?tables, rows = result.estimated_rows, "Harness ready for preview");
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

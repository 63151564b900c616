//! Simulated migration run driving the console step.

use chrono::Utc;
use model::{
    events::{MigrationFinished, MigrationProgress},
    log::LogLevel,
};
use rand::Rng;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wizard_core::{
    action::WizardAction,
    event_bus::EventBus,
    persistence::{MIGRATIONS, PersistenceClient},
    preview::{migration_id, start_actions},
    readiness::{StepReadiness, readiness_for},
    state::WizardState,
    step::WizardStep,
    store::WizardHandle,
};

use crate::{error::SimulationError, settings::SimulationSettings};

pub const COMPLETED_MESSAGE: &str = "Migration completed successfully!";
pub const STOPPED_MESSAGE: &str = "Migration stopped by user";

/// Row total assumed when the dry run produced no estimate.
pub const DEFAULT_TOTAL_ROWS: u64 = 125_000;

/// Live numbers shown by the console while a run is in flight.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationStats {
    pub progress: f64,
    pub current_table: Option<String>,
    pub tables_completed: usize,
    pub rows_transferred: u64,
    /// Minutes, at two per remaining percent.
    pub eta: u64,
}

impl MigrationStats {
    pub fn at(progress: f64, tables: &[String], total_rows: u64) -> Self {
        let progress = progress.clamp(0.0, 100.0);
        let index = (progress / 100.0 * tables.len() as f64).floor() as usize;

        MigrationStats {
            progress,
            current_table: tables.get(index).cloned(),
            tables_completed: index.min(tables.len()),
            rows_transferred: (progress / 100.0 * total_rows as f64).floor() as u64,
            eta: ((100.0 - progress) * 2.0).floor() as u64,
        }
    }
}

/// One of the console's progress messages; `choice` picks the template.
pub fn tick_message(choice: usize, progress: f64, table: Option<&str>) -> String {
    let table = table.unwrap_or("unknown");
    match choice % 4 {
        0 => format!("Migrating table: {table}"),
        1 => format!(
            "Copying data batch: {} rows transferred",
            (progress * 100.0).floor() as u64
        ),
        2 => format!("Creating indexes for table: {table}"),
        _ => format!("Applying constraints to table: {table}"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MigrationOutcome {
    Completed,
    Stopped,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MigrationReport {
    pub migration_id: String,
    pub outcome: MigrationOutcome,
    pub stats: MigrationStats,
}

/// Roughly half the ticks write a console line.
fn logs_on_tick(progress: f64) -> bool {
    progress % 10.0 < 5.0
}

/// What one tick writes: its console line, if any, then the completion
/// entries once progress reaches 100.
fn tick_actions(progress: f64, message: Option<String>) -> Vec<WizardAction> {
    let mut actions: Vec<_> = message
        .map(|m| WizardAction::log(LogLevel::Info, m))
        .into_iter()
        .collect();
    if progress >= 100.0 {
        actions.push(WizardAction::StopMigration);
        actions.push(WizardAction::log(LogLevel::Success, COMPLETED_MESSAGE));
    }
    actions
}

/// True while `migration_id` is the run the wizard considers active.
fn owns(state: &WizardState, migration_id: &str) -> bool {
    state.is_running && state.migration_id.as_deref() == Some(migration_id)
}

/// Stops whatever migration is running, as the console's stop button does.
///
/// Returns false when nothing was running.
pub async fn stop_migration(handle: &WizardHandle) -> bool {
    handle
        .dispatch_if(
            |s| s.is_running,
            [
                WizardAction::StopMigration,
                WizardAction::log(LogLevel::Warn, STOPPED_MESSAGE),
            ],
        )
        .await
}

pub struct MigrationRunner {
    settings: SimulationSettings,
    client: Arc<dyn PersistenceClient>,
    bus: Option<EventBus>,
}

impl MigrationRunner {
    pub fn new(settings: SimulationSettings, client: Arc<dyn PersistenceClient>) -> Self {
        MigrationRunner {
            settings,
            client,
            bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Confirms the preview: starts a migration and moves to the console.
    ///
    /// The running and readiness checks happen under the same lock as the
    /// start, so concurrent confirms start at most one run.
    pub async fn start(&self, handle: &WizardHandle) -> Result<String, SimulationError> {
        let state = handle
            .try_dispatch(|state, now| {
                if state.is_running {
                    return Err(SimulationError::AlreadyRunning);
                }
                if let StepReadiness::Blocked(reasons) = readiness_for(state, WizardStep::Preview) {
                    return Err(SimulationError::Blocked(reasons));
                }
                Ok(start_actions(&migration_id(now)))
            })
            .await?;
        let id = state
            .migration_id
            .clone()
            .ok_or(SimulationError::NotConfigured("running migration"))?;

        self.client
            .insert(
                MIGRATIONS,
                json!({
                    "id": id,
                    "status": "running",
                    "tables": state.selected_tables(),
                }),
            )
            .await?;

        info!(migration_id = %id, tables = state.selected_tables().len(), "Migration started");
        Ok(id)
    }

    /// Advances the running migration until it completes, is cancelled,
    /// times out, or is stopped by someone else.
    ///
    /// Every state change is guarded by the run's id, so a tick racing a
    /// stop never logs into a stopped or newer run.
    pub async fn run(
        &self,
        handle: &WizardHandle,
        cancel: &CancellationToken,
    ) -> Result<MigrationReport, SimulationError> {
        let (migration_id, tables, total_rows) = handle
            .read(|s| {
                if !s.is_running {
                    return None;
                }
                let id = s.migration_id.clone()?;
                let rows = s
                    .dry_run_result
                    .as_ref()
                    .map(|r| r.estimated_rows)
                    .filter(|rows| *rows > 0)
                    .unwrap_or(DEFAULT_TOTAL_ROWS);
                Some((id, s.selected_tables().to_vec(), rows))
            })
            .await
            .ok_or(SimulationError::NotConfigured("running migration"))?;

        let mut rng = self.settings.rng(3);
        let mut ticker = tokio::time::interval(self.settings.migration_tick());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        let timeout = self.settings.operation_timeout();
        let deadline = tokio::time::sleep(timeout);
        tokio::pin!(deadline);

        let mut progress = 0.0_f64;
        let mut stats = MigrationStats::default();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(%migration_id, "Migration cancelled");
                    self.halt(handle, &migration_id, LogLevel::Warn, STOPPED_MESSAGE.to_string())
                        .await;
                    return Ok(self.finish(migration_id, MigrationOutcome::Stopped, stats).await);
                }
                _ = &mut deadline => {
                    let message = format!("Migration timed out after {}s", timeout.as_secs());
                    warn!(%migration_id, "{message}");
                    self.halt(handle, &migration_id, LogLevel::Error, message).await;
                    self.finish(migration_id, MigrationOutcome::Stopped, stats).await;
                    return Err(SimulationError::Timeout(timeout));
                }
                _ = ticker.tick() => {}
            }

            progress += rng.r#gen::<f64>() * self.settings.migration_max_step;
            stats = MigrationStats::at(progress, &tables, total_rows);
            debug!(%migration_id, progress = stats.progress, table = ?stats.current_table, "Migration tick");

            let message = logs_on_tick(progress).then(|| {
                let choice = rng.gen_range(0..4);
                tick_message(choice, progress, stats.current_table.as_deref())
            });
            let actions = tick_actions(progress, message);

            let still_running = if actions.is_empty() {
                true
            } else {
                handle
                    .dispatch_if(|s| owns(s, &migration_id), actions)
                    .await
            };
            if !still_running {
                info!(%migration_id, "Migration no longer active, ending run");
                return Ok(self.finish(migration_id, MigrationOutcome::Stopped, stats).await);
            }

            if progress >= 100.0 {
                self.client
                    .update(
                        MIGRATIONS,
                        json!({ "status": "completed", "rowsTransferred": stats.rows_transferred }),
                        json!({ "id": migration_id }),
                    )
                    .await?;
                info!(%migration_id, rows = stats.rows_transferred, "Migration completed");
                return Ok(self.finish(migration_id, MigrationOutcome::Completed, stats).await);
            }

            let event = MigrationProgress {
                migration_id: migration_id.clone(),
                percentage: stats.progress,
                current_table: stats.current_table.clone(),
                tables_completed: stats.tables_completed,
                rows_transferred: stats.rows_transferred,
                eta: stats.eta,
                timestamp: Utc::now(),
            };
            let still_running = match &self.bus {
                Some(bus) => {
                    handle
                        .publish_if(bus, |s| owns(s, &migration_id), event)
                        .await
                }
                None => handle.read(|s| owns(s, &migration_id)).await,
            };
            if !still_running {
                info!(%migration_id, "Migration no longer active, ending run");
                return Ok(self.finish(migration_id, MigrationOutcome::Stopped, stats).await);
            }
        }
    }

    async fn halt(&self, handle: &WizardHandle, migration_id: &str, level: LogLevel, message: String) {
        handle
            .dispatch_if(
                |s| owns(s, migration_id),
                [
                    WizardAction::StopMigration,
                    WizardAction::log(level, message),
                ],
            )
            .await;
    }

    async fn finish(
        &self,
        migration_id: String,
        outcome: MigrationOutcome,
        stats: MigrationStats,
    ) -> MigrationReport {
        if let Some(bus) = &self.bus {
            bus.publish(MigrationFinished {
                migration_id: migration_id.clone(),
                completed: outcome == MigrationOutcome::Completed,
                rows_transferred: stats.rows_transferred,
                timestamp: Utc::now(),
            })
            .await;
        }

        MigrationReport {
            migration_id,
            outcome,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{
        connection::{ConnectionConfig, DatabaseConfig, EngineKind},
        report::{DryRunResult, Issue},
        selection::SchemaSelection,
    };
    use std::time::Duration;
    use wizard_core::{
        persistence::stub::{Operation, StubClient},
        reducer::MIGRATION_STARTED,
        store::WizardStore,
    };

    async fn ready_handle() -> WizardHandle {
        let mut selection = SchemaSelection::default();
        selection.select_tables(["users", "orders", "products"]);

        let handle = WizardHandle::new(WizardStore::default());
        handle
            .dispatch_all([
                WizardAction::SetDatabaseConfig(DatabaseConfig {
                    source: ConnectionConfig::empty(EngineKind::Sqlite),
                    target: ConnectionConfig::empty(EngineKind::Sqlite),
                }),
                WizardAction::SetSchemaSelection(selection),
                WizardAction::SetDryRunResult(DryRunResult {
                    issues: vec![Issue::info("users", "ok")],
                    estimated_time: 2,
                    estimated_rows: 20_000,
                }),
                WizardAction::SetStep(5),
            ])
            .await;
        handle
    }

    #[test]
    fn stats_track_tables_and_rows() {
        let tables = vec!["a".to_string(), "b".to_string(), "c".to_string(), "d".to_string()];

        let stats = MigrationStats::at(55.0, &tables, 10_000);
        assert_eq!(stats.current_table.as_deref(), Some("c"));
        assert_eq!(stats.tables_completed, 2);
        assert_eq!(stats.rows_transferred, 5_500);
        assert_eq!(stats.eta, 90);

        let done = MigrationStats::at(130.0, &tables, 10_000);
        assert_eq!(done.progress, 100.0);
        assert_eq!(done.current_table, None);
        assert_eq!(done.tables_completed, 4);
        assert_eq!(done.eta, 0);
    }

    #[test]
    fn messages_fall_back_to_unknown_table() {
        assert_eq!(tick_message(0, 12.0, Some("users")), "Migrating table: users");
        assert_eq!(
            tick_message(1, 12.5, None),
            "Copying data batch: 1250 rows transferred"
        );
        assert_eq!(
            tick_message(3, 99.0, None),
            "Applying constraints to table: unknown"
        );
    }

    #[test]
    fn completion_tick_keeps_its_console_line() {
        let actions = tick_actions(102.5, Some("Migrating table: unknown".into()));
        assert_eq!(
            actions,
            vec![
                WizardAction::log(LogLevel::Info, "Migrating table: unknown"),
                WizardAction::StopMigration,
                WizardAction::log(LogLevel::Success, COMPLETED_MESSAGE),
            ]
        );

        assert!(tick_actions(47.0, None).is_empty());
        assert!(logs_on_tick(102.5));
        assert!(!logs_on_tick(47.0));
    }

    #[tokio::test]
    async fn start_requires_preview_readiness() {
        let runner = MigrationRunner::new(SimulationSettings::fast(7), Arc::new(StubClient::new()));
        let handle = WizardHandle::new(WizardStore::default());

        let err = runner.start(&handle).await.unwrap_err();
        assert!(matches!(err, SimulationError::Blocked(ref reasons) if reasons.len() == 3));
        assert!(!handle.read(|s| s.is_running).await);
    }

    #[tokio::test]
    async fn start_refuses_second_run() {
        let runner = MigrationRunner::new(SimulationSettings::fast(7), Arc::new(StubClient::new()));
        let handle = ready_handle().await;

        runner.start(&handle).await.unwrap();
        let err = runner.start(&handle).await.unwrap_err();
        assert!(matches!(err, SimulationError::AlreadyRunning));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_starts_launch_one_run() {
        let client = Arc::new(StubClient::new());
        let handle = ready_handle().await;

        let attempts: Vec<_> = (0..8)
            .map(|_| {
                let runner = MigrationRunner::new(SimulationSettings::fast(7), client.clone());
                let handle = handle.clone();
                tokio::spawn(async move { runner.start(&handle).await })
            })
            .collect();

        let mut started = 0;
        for attempt in attempts {
            match attempt.await.unwrap() {
                Ok(_) => started += 1,
                Err(err) => assert!(matches!(err, SimulationError::AlreadyRunning)),
            }
        }
        assert_eq!(started, 1);

        let state = handle.snapshot().await;
        let starts = state
            .logs
            .iter()
            .filter(|l| l.message == MIGRATION_STARTED)
            .count();
        assert_eq!(starts, 1);
        assert_eq!(client.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn run_to_completion() {
        let client = Arc::new(StubClient::new());
        let bus = EventBus::new();
        let (_sub, mut finished) = bus.listen::<MigrationFinished>(4).await;
        let runner =
            MigrationRunner::new(SimulationSettings::fast(7), client.clone()).with_event_bus(bus);
        let handle = ready_handle().await;

        let id = runner.start(&handle).await.unwrap();
        let report = runner.run(&handle, &CancellationToken::new()).await.unwrap();

        assert_eq!(report.migration_id, id);
        assert_eq!(report.outcome, MigrationOutcome::Completed);
        assert_eq!(report.stats.progress, 100.0);
        assert_eq!(report.stats.rows_transferred, 20_000);

        let state = handle.snapshot().await;
        assert!(!state.is_running);
        assert_eq!(state.current_step, 6);
        assert_eq!(state.logs[0].message, MIGRATION_STARTED);
        let last = state.logs.last().unwrap();
        assert_eq!(last.level, LogLevel::Success);
        assert_eq!(last.message, COMPLETED_MESSAGE);

        let ops: Vec<_> = client.calls().await.into_iter().map(|c| c.operation).collect();
        assert_eq!(ops, vec![Operation::Insert, Operation::Update]);

        let event = finished.recv().await.unwrap();
        assert!(event.completed);
        assert_eq!(event.migration_id, id);
    }

    #[tokio::test]
    async fn cancel_logs_stop_once() {
        let runner = MigrationRunner::new(SimulationSettings::fast(7), Arc::new(StubClient::new()));
        let handle = ready_handle().await;
        runner.start(&handle).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = runner.run(&handle, &cancel).await.unwrap();

        assert_eq!(report.outcome, MigrationOutcome::Stopped);
        let state = handle.snapshot().await;
        assert!(!state.is_running);
        let stops = state
            .logs
            .iter()
            .filter(|l| l.message == STOPPED_MESSAGE)
            .count();
        assert_eq!(stops, 1);
        assert_eq!(state.logs.last().unwrap().level, LogLevel::Warn);
    }

    #[tokio::test]
    async fn external_stop_ends_run_without_late_logs() {
        let runner = MigrationRunner::new(
            SimulationSettings {
                migration_tick_ms: 20,
                ..SimulationSettings::fast(7)
            },
            Arc::new(StubClient::new()),
        );
        let handle = ready_handle().await;
        runner.start(&handle).await.unwrap();

        let stopper = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            assert!(stop_migration(&handle).await);
        };
        let never = CancellationToken::new();
        let (report, _) = tokio::join!(runner.run(&handle, &never), stopper);
        let report = report.unwrap();

        assert_eq!(report.outcome, MigrationOutcome::Stopped);
        let state = handle.snapshot().await;
        assert!(!state.is_running);
        assert_eq!(state.logs.last().unwrap().message, STOPPED_MESSAGE);
        assert!(state.logs.iter().all(|l| l.level != LogLevel::Success));
    }

    #[tokio::test]
    async fn run_without_migration_is_rejected() {
        let runner = MigrationRunner::new(SimulationSettings::fast(7), Arc::new(StubClient::new()));
        let handle = ready_handle().await;

        let result = runner.run(&handle, &CancellationToken::new()).await;
        assert!(matches!(
            result,
            Err(SimulationError::NotConfigured("running migration"))
        ));
    }

    #[tokio::test]
    async fn timeout_stops_with_error_log() {
        let runner = MigrationRunner::new(
            SimulationSettings {
                migration_tick_ms: 60_000,
                operation_timeout_secs: 0,
                ..SimulationSettings::fast(7)
            },
            Arc::new(StubClient::new()),
        );
        let handle = ready_handle().await;
        runner.start(&handle).await.unwrap();

        let result = runner.run(&handle, &CancellationToken::new()).await;
        assert!(matches!(result, Err(SimulationError::Timeout(_))));
        let state = handle.snapshot().await;
        assert!(!state.is_running);
        assert_eq!(state.logs.last().unwrap().level, LogLevel::Error);
    }
}

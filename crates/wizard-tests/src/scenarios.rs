#[cfg(test)]
mod tests {
    use crate::{
        Harness, local, local_databases, selection, session_start, test_settings,
        utils::{count_level, drain, is_tick_message, messages},
    };
    use model::{
        connection::{DatabaseConfig, EngineKind, Endpoint},
        events::{LogAppended, MigrationFinished, MigrationProgress, StateChanged},
        log::LogLevel,
        report::IssueStats,
        rule::{ManualRule, ManualRulePatch},
    };
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;
    use wizard_core::{
        action::{WizardAction, parse_journal},
        export::{log_file_name, write_log_export},
        persistence::{DRY_RUN_REPORTS, MIGRATIONS, SCHEMAS, stub::Operation},
        preview::PreviewSummary,
        readiness::{BlockReason, StepReadiness},
        reducer::{MIGRATION_STARTED, replay_journal},
        state::WizardState,
    };
    use wizard_runtime::{
        connection::{ConnectionOutcome, ConnectionProbe, SimulatedProbe},
        error::SimulationError,
        migration::{COMPLETED_MESSAGE, MigrationOutcome, STOPPED_MESSAGE, stop_migration},
        settings::SimulationSettings,
    };

    fn slow_ticks() -> SimulationSettings {
        SimulationSettings {
            migration_tick_ms: 20,
            ..test_settings()
        }
    }

    // Scenario: A clean selection goes through every step and the migration runs to the end.
    // Expected Outcome:
    // - Each step unlocks the next one and the console ends on a success entry.
    // - Rows transferred match the dry-run estimate.
    // - The journal replays to the same state and every dispatch was announced on the bus.
    #[traced_test]
    #[tokio::test]
    async fn tc01() {
        let h = Harness::new();
        let (_changes_sub, mut changes) = h.bus.listen::<StateChanged>(1024).await;
        let (_finished_sub, mut finished) = h.bus.listen::<MigrationFinished>(4).await;

        let outcomes = h.configure(local_databases()).await;
        assert!(outcomes.iter().all(ConnectionOutcome::is_success));

        let catalog = h.select(&["categories", "suppliers", "inventory"]).await;
        let result = h.dry_run(catalog).await;
        assert_eq!(
            result.stats(),
            IssueStats {
                error: 0,
                warning: 0,
                info: 3
            }
        );
        assert_eq!(result.estimated_rows, 12_933);
        assert_eq!(result.estimated_time, 2);

        assert!(h.handle.advance().await.is_ready());
        h.handle
            .dispatch_all([
                WizardAction::AddManualRule(ManualRule::new("rule-1", "categories", "")),
                WizardAction::update_rule("rule-1", ManualRulePatch::target_table("product_categories")),
            ])
            .await;
        assert!(h.handle.advance().await.is_ready());

        let preview = PreviewSummary::from_state(&h.handle.snapshot().await);
        assert_eq!(preview.tables, 3);
        assert_eq!(preview.rules.len(), 1);
        assert_eq!(preview.rules[0].target_table, "product_categories");

        let runner = h.runner();
        let id = runner.start(&h.handle).await.unwrap();
        assert_eq!(id, format!("migration-{}", session_start().timestamp_millis()));

        let report = runner.run(&h.handle, &CancellationToken::new()).await.unwrap();
        assert_eq!(report.outcome, MigrationOutcome::Completed);
        assert_eq!(report.stats.rows_transferred, 12_933);
        assert_eq!(report.stats.tables_completed, 3);

        let state = h.handle.snapshot().await;
        assert_eq!(state.current_step, 6);
        assert!(!state.is_running);
        let logged = messages(&state);
        assert_eq!(logged.first(), Some(&MIGRATION_STARTED));
        assert_eq!(logged.last(), Some(&COMPLETED_MESSAGE));
        assert!(logged[1..logged.len() - 1].iter().all(|m| is_tick_message(m)));

        let ops: Vec<_> = h
            .client
            .calls()
            .await
            .into_iter()
            .map(|c| (c.operation, c.table))
            .collect();
        assert_eq!(
            ops,
            vec![
                (Operation::Select, SCHEMAS.to_string()),
                (Operation::Insert, DRY_RUN_REPORTS.to_string()),
                (Operation::Insert, MIGRATIONS.to_string()),
                (Operation::Update, MIGRATIONS.to_string()),
            ]
        );

        let journal = h.handle.journal().await.unwrap();
        assert_eq!(drain(&mut changes).len(), journal.len());
        assert_eq!(replay_journal(journal), state);

        let done = drain(&mut finished);
        assert_eq!(done.len(), 1);
        assert!(done[0].completed);
    }

    // Scenario: The dry run reports errors for the selected tables.
    // Expected Outcome:
    // - The wizard refuses to leave the dry-run step and the migration cannot start.
    // - Going back and choosing clean tables unlocks the step again.
    #[traced_test]
    #[tokio::test]
    async fn tc02() {
        let h = Harness::new();
        h.configure(local_databases()).await;
        let catalog = h.select(&["users", "orders"]).await;

        let result = h.dry_run(catalog.clone()).await;
        assert_eq!(result.stats().error, 2);
        assert_eq!(
            h.handle.advance().await,
            StepReadiness::Blocked(vec![BlockReason::DryRunErrors { count: 2 }])
        );
        assert!(matches!(
            h.runner().start(&h.handle).await,
            Err(SimulationError::Blocked(_))
        ));

        assert!(h.handle.retreat().await);
        assert_eq!(h.handle.read(|s| s.current_step).await, 2);
        h.handle
            .dispatch(WizardAction::SetSchemaSelection(selection(&["products"])))
            .await;
        assert!(h.handle.advance().await.is_ready());

        let result = h.dry_run(catalog).await;
        assert!(!result.has_errors());
        assert_eq!(result.stats().warning, 1);
        assert!(h.handle.advance().await.is_ready());

        let reports = h
            .client
            .calls()
            .await
            .into_iter()
            .filter(|c| c.table == DRY_RUN_REPORTS)
            .count();
        assert_eq!(reports, 2);
    }

    // Scenario: The stop button is pressed while ticks are still scheduled.
    // Expected Outcome:
    // - The run ends as stopped and the stop entry is the last log line.
    // - No tick log or progress event follows the stop.
    #[traced_test]
    #[tokio::test]
    async fn tc03() {
        let h = Harness::with_settings(slow_ticks());
        h.ready_for_preview(&["categories"]).await;
        let (_logs_sub, mut appended) = h.bus.listen::<LogAppended>(256).await;
        let (_progress_sub, mut progress) = h.bus.listen::<MigrationProgress>(256).await;

        let runner = h.runner();
        runner.start(&h.handle).await.unwrap();

        let stopper = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assert!(stop_migration(&h.handle).await);
            drain(&mut progress).len()
        };
        let never = CancellationToken::new();
        let (report, progress_before_stop) = tokio::join!(runner.run(&h.handle, &never), stopper);

        assert_eq!(report.unwrap().outcome, MigrationOutcome::Stopped);
        assert!(drain(&mut progress).is_empty(), "progress after stop");
        assert!(progress_before_stop <= 3);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let state = h.handle.snapshot().await;
        assert!(!state.is_running);
        assert_eq!(messages(&state).last(), Some(&STOPPED_MESSAGE));
        assert_eq!(count_level(&state.logs, LogLevel::Warn), 1);

        let appended = drain(&mut appended);
        assert_eq!(
            appended.last().map(|e| e.message.as_str()),
            Some(STOPPED_MESSAGE)
        );
    }

    // Scenario: The wizard is reset while a migration is running.
    // Expected Outcome: The run notices and ends without writing into the fresh state.
    #[traced_test]
    #[tokio::test]
    async fn tc04() {
        let h = Harness::with_settings(slow_ticks());
        h.ready_for_preview(&["suppliers"]).await;
        let runner = h.runner();
        runner.start(&h.handle).await.unwrap();

        let reset = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            h.handle.dispatch(WizardAction::ResetWizard).await;
        };
        let never = CancellationToken::new();
        let (report, _) = tokio::join!(runner.run(&h.handle, &never), reset);

        assert_eq!(report.unwrap().outcome, MigrationOutcome::Stopped);
        assert_eq!(h.handle.snapshot().await, WizardState::default());
    }

    // Scenario: A migration is stopped and a new one started before the old task notices.
    // Expected Outcome:
    // - The old task ends on its next tick without touching the new run's console.
    // - The new run completes normally.
    #[traced_test]
    #[tokio::test]
    async fn tc05() {
        let h = Harness::with_settings(slow_ticks());
        h.ready_for_preview(&["categories", "suppliers"]).await;

        let first_id = h.runner().start(&h.handle).await.unwrap();
        let stale = {
            let runner = h.runner();
            let handle = h.handle.clone();
            tokio::spawn(async move { runner.run(&handle, &CancellationToken::new()).await })
        };

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(stop_migration(&h.handle).await);
        h.clock.advance(chrono::Duration::milliseconds(1));
        let second_id = h.runner().start(&h.handle).await.unwrap();
        assert_ne!(first_id, second_id);

        let stale = stale.await.unwrap().unwrap();
        assert_eq!(stale.migration_id, first_id);
        assert_eq!(stale.outcome, MigrationOutcome::Stopped);

        let state = h.handle.snapshot().await;
        assert!(state.is_running);
        assert_eq!(state.migration_id.as_deref(), Some(second_id.as_str()));
        assert_eq!(messages(&state), vec![MIGRATION_STARTED]);

        let fast = Harness::new().runner();
        let report = fast.run(&h.handle, &CancellationToken::new()).await.unwrap();
        assert_eq!(report.outcome, MigrationOutcome::Completed);
        assert_eq!(report.migration_id, second_id);
        assert!(!messages(&h.handle.snapshot().await).contains(&STOPPED_MESSAGE));
    }

    // Scenario: The run is cancelled through its token and the console log is exported.
    // Expected Outcome: The export names the migration and ends with the stop entry.
    #[traced_test]
    #[tokio::test]
    async fn tc06() {
        let h = Harness::with_settings(slow_ticks());
        h.ready_for_preview(&["categories"]).await;
        let runner = h.runner();
        let id = runner.start(&h.handle).await.unwrap();

        let cancel = CancellationToken::new();
        let canceller = async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            cancel.cancel();
        };
        let (report, _) = tokio::join!(runner.run(&h.handle, &cancel), canceller);
        assert_eq!(report.unwrap().outcome, MigrationOutcome::Stopped);

        let dir = tempfile::tempdir().unwrap();
        let state = h.handle.snapshot().await;
        let path = write_log_export(dir.path(), &state).await.unwrap();
        assert_eq!(path.file_name().unwrap().to_str(), Some(log_file_name(Some(id.as_str())).as_str()));

        let content = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), state.logs.len());
        assert_eq!(
            lines[0],
            "[2024-01-15T10:30:00.000Z] INFO: Migration started"
        );
        assert_eq!(
            lines.last().copied(),
            Some("[2024-01-15T10:30:00.000Z] WARN: Migration stopped by user")
        );
        assert!(!content.ends_with('\n'));
    }

    // Scenario: The action journal is written out as JSON and read back later, after the clock moved.
    // Expected Outcome: Replaying the parsed journal rebuilds the state with the original timestamps.
    #[traced_test]
    #[tokio::test]
    async fn tc07() {
        let h = Harness::new();
        h.ready_for_preview(&["products"]).await;
        h.handle
            .dispatch(WizardAction::StartMigration("migration-1".into()))
            .await;
        h.clock.advance(chrono::Duration::seconds(90));
        h.handle
            .dispatch(WizardAction::log(LogLevel::Info, "note"))
            .await;

        let journal = h.handle.journal().await.unwrap();
        let json = serde_json::to_string_pretty(&journal).unwrap();
        assert!(json.contains("\"type\": \"SET_DATABASE_CONFIG\""));

        let parsed = parse_journal(&json).unwrap();
        assert_eq!(parsed, journal);

        let replayed = replay_journal(parsed);
        assert_eq!(replayed, h.handle.snapshot().await);
        assert_eq!(
            replayed.logs.last().map(|l| l.timestamp),
            Some(session_start() + chrono::Duration::seconds(90))
        );
    }

    // Scenario: The target descriptor lacks a database name.
    // Expected Outcome:
    // - The probe fails without waiting and names the missing field.
    // - Step 1 stays blocked until the field is filled in.
    #[traced_test]
    #[tokio::test]
    async fn tc08() {
        let h = Harness::new();
        let mut config = local_databases();
        config.target.database.clear();

        let probe = SimulatedProbe::new(test_settings());
        let outcome = probe
            .probe(Endpoint::Target, &config.target, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ConnectionOutcome::Failed {
                reason: "missing database".into()
            }
        );

        h.handle
            .dispatch(WizardAction::SetDatabaseConfig(config))
            .await;
        assert_eq!(
            h.handle.advance().await,
            StepReadiness::Blocked(vec![BlockReason::IncompleteConnection {
                endpoint: Endpoint::Target,
                missing: vec!["database"],
            }])
        );

        h.handle
            .dispatch(WizardAction::SetDatabaseConfig(DatabaseConfig {
                source: local(EngineKind::Postgresql, "shop"),
                target: local(EngineKind::Sqlite, ""),
            }))
            .await;
        assert!(h.handle.advance().await.is_ready());
    }
}

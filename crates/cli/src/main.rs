use crate::{
    commands::Commands,
    config::{load_session, load_settings},
    env::EnvManager,
    error::CliError,
    session::SessionDriver,
    shutdown::ShutdownCoordinator,
};
use clap::Parser;
use model::{
    catalog::SizeCategory,
    connection::{ConnectionConfig, Endpoint},
};
use std::{path::Path, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use wizard_core::{
    action::parse_journal,
    clock::SystemClock,
    export::write_log_export,
    reducer::replay_journal,
    step::{WizardStep, progress_percent},
};
use wizard_runtime::{
    catalog::demo_catalog,
    connection::{ConnectionOutcome, ConnectionProbe, SimulatedProbe},
    settings::SimulationSettings,
};

mod commands;
mod config;
mod env;
mod error;
mod output;
mod session;
mod shutdown;

#[derive(Parser)]
#[command(name = "wizard", version = "0.1.0", about = "Database migration wizard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let shutdown = ShutdownCoordinator::install(CancellationToken::new());
    let cancel = shutdown.token();

    let result = execute(cli.command, &cancel).await;
    if let Err(err) = &result {
        error!("{err}");
    }
    let code = shutdown.exit_code(result.is_err());

    // Releases the signal listener.
    cancel.cancel();
    std::process::exit(code.as_i32());
}

async fn execute(command: Commands, cancel: &CancellationToken) -> Result<(), CliError> {
    match command {
        Commands::Steps => {
            for step in WizardStep::ALL {
                println!("{step} ({:.0}%)", progress_percent(step.index()));
            }
        }
        Commands::Replay { actions, output } => {
            let source = tokio::fs::read_to_string(&actions).await?;
            let entries = parse_journal(&source)?;
            info!(actions = entries.len(), "Replaying journal");
            let state = replay_journal(entries);
            output::emit(&state, output.as_deref()).await?;
        }
        Commands::TestConn {
            engine,
            host,
            port,
            database,
            username,
            ssl,
            settings,
        } => {
            let settings = resolve_settings(settings.as_deref(), None).await?;
            let config = ConnectionConfig {
                host,
                port: port.unwrap_or(engine.default_port()),
                database,
                username,
                ssl: Some(ssl),
                ..ConnectionConfig::empty(engine)
            };

            let outcome = SimulatedProbe::new(settings)
                .probe(Endpoint::Source, &config, cancel)
                .await?;
            match outcome {
                ConnectionOutcome::Success => {
                    println!("Connected to {} ({engine})", config.display_address());
                }
                ConnectionOutcome::Failed { reason } => {
                    return Err(CliError::ConnectionFailed(reason));
                }
            }
        }
        Commands::Catalog { search, size } => {
            let mut catalog = demo_catalog();
            if let Some(term) = search {
                catalog = catalog.filter(&term);
            }
            if let Some(size) = size {
                let category = SizeCategory::from(size);
                catalog.tables.retain(|t| category.contains(t.rows));
            }
            output::emit(&catalog, None).await?;
        }
        Commands::DryRun {
            session,
            settings,
            output,
        } => {
            let settings = resolve_settings(settings.as_deref(), None).await?;
            let session = load_session(&session, &SystemClock).await?;

            let driver = SessionDriver::new(settings, Arc::new(SystemClock));
            let summary = driver.run(&session, false, cancel).await?;
            output::emit(&summary, output.as_deref()).await?;
        }
        Commands::Run {
            session,
            settings,
            env_file,
            logs_dir,
            output,
        } => {
            let settings = resolve_settings(settings.as_deref(), env_file.as_deref()).await?;
            let session = load_session(&session, &SystemClock).await?;

            let driver = SessionDriver::new(settings, Arc::new(SystemClock));
            let mut summary = driver.run(&session, true, cancel).await?;

            if let Some(dir) = logs_dir {
                tokio::fs::create_dir_all(&dir).await?;
                let state = driver.handle().snapshot().await;
                let path = write_log_export(&dir, &state).await?;
                info!(path = %path.display(), "Exported migration log");
                summary.log_file = Some(path);
            }

            output::emit(&summary, output.as_deref()).await?;
        }
    }

    Ok(())
}

async fn resolve_settings(
    path: Option<&Path>,
    env_file: Option<&Path>,
) -> Result<SimulationSettings, CliError> {
    let mut env = EnvManager::from_env();
    if let Some(env_file) = env_file {
        env.load_from_file(env_file).await?;
    }
    load_settings(path, &env).await
}

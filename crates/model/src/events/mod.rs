use chrono::{DateTime, Utc};
use std::fmt::Debug;

use crate::{connection::Endpoint, log::LogLevel};

/// A trait for events that can be published on the EventBus.
pub trait Event: Send + Sync + Debug + 'static {
    /// Returns a unique identifier for this event type.
    fn event_type(&self) -> &'static str;
}

/// Emitted after every action the wizard store applies.
#[derive(Debug, Clone)]
pub struct StateChanged {
    pub action: &'static str,
    pub current_step: i64,
    pub is_running: bool,
    pub log_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl Event for StateChanged {
    fn event_type(&self) -> &'static str {
        "wizard.state_changed"
    }
}

/// Emitted when a log line is appended to the migration console.
#[derive(Debug, Clone)]
pub struct LogAppended {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Event for LogAppended {
    fn event_type(&self) -> &'static str {
        "wizard.log_appended"
    }
}

/// Emitted when a simulated connection test finishes.
#[derive(Debug, Clone)]
pub struct ConnectionTested {
    pub endpoint: Endpoint,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
}

impl Event for ConnectionTested {
    fn event_type(&self) -> &'static str {
        "connection.tested"
    }
}

/// Emitted on every dry-run tick.
#[derive(Debug, Clone)]
pub struct DryRunProgress {
    pub percentage: f64,
    pub phase: Option<&'static str>,
    pub timestamp: DateTime<Utc>,
}

impl Event for DryRunProgress {
    fn event_type(&self) -> &'static str {
        "dry_run.progress"
    }
}

/// Emitted periodically during a migration run with progress updates.
#[derive(Debug, Clone)]
pub struct MigrationProgress {
    pub migration_id: String,
    pub percentage: f64,
    pub current_table: Option<String>,
    pub tables_completed: usize,
    pub rows_transferred: u64,
    /// Remaining time estimate in minutes.
    pub eta: u64,
    pub timestamp: DateTime<Utc>,
}

impl Event for MigrationProgress {
    fn event_type(&self) -> &'static str {
        "migration.progress"
    }
}

/// Emitted when a migration run ends, either on completion or on stop.
#[derive(Debug, Clone)]
pub struct MigrationFinished {
    pub migration_id: String,
    pub completed: bool,
    pub rows_transferred: u64,
    pub timestamp: DateTime<Utc>,
}

impl Event for MigrationFinished {
    fn event_type(&self) -> &'static str {
        "migration.finished"
    }
}

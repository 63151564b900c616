#![allow(dead_code)]

use model::log::{LogEntry, LogLevel};
use std::sync::Arc;
use tokio::sync::mpsc;
use wizard_core::state::WizardState;

pub fn messages(state: &WizardState) -> Vec<&str> {
    state.logs.iter().map(|l| l.message.as_str()).collect()
}

pub fn count_level(logs: &[LogEntry], level: LogLevel) -> usize {
    logs.iter().filter(|l| l.level == level).count()
}

/// Everything already queued on `rx`, without waiting for more.
pub fn drain<E>(rx: &mut mpsc::Receiver<Arc<E>>) -> Vec<Arc<E>> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Info messages the console emits while a table is being copied.
pub fn is_tick_message(message: &str) -> bool {
    [
        "Migrating table: ",
        "Copying data batch: ",
        "Creating indexes for table: ",
        "Applying constraints to table: ",
    ]
    .iter()
    .any(|prefix| message.starts_with(prefix))
}

use chrono::{DateTime, Utc};
use model::events::{Event, LogAppended, StateChanged};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    action::{JournalEntry, WizardAction},
    clock::{Clock, SystemClock},
    event_bus::EventBus,
    readiness::{StepReadiness, step_readiness},
    reducer::reduce,
    state::WizardState,
    step::FIRST_STEP,
};

/// Owner of the wizard state. Views receive it (or a [`WizardHandle`])
/// explicitly; there is no global instance.
pub struct WizardStore {
    state: WizardState,
    clock: Arc<dyn Clock>,
    bus: Option<EventBus>,
    journal: Option<Vec<JournalEntry>>,
}

impl Default for WizardStore {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl WizardStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        WizardStore {
            state: WizardState::default(),
            clock,
            bus: None,
            journal: None,
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Records every dispatched action so the session can be replayed.
    pub fn with_journal(mut self) -> Self {
        self.journal = Some(Vec::new());
        self
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn journal(&self) -> Option<&[JournalEntry]> {
        self.journal.as_deref()
    }

    pub fn readiness(&self) -> StepReadiness {
        step_readiness(&self.state)
    }

    pub async fn dispatch(&mut self, action: WizardAction) -> &WizardState {
        let kind = action.kind();
        let now = self.clock.now();
        debug!(action = kind, step = self.state.current_step, "Dispatching action");

        if let Some(journal) = self.journal.as_mut() {
            journal.push(JournalEntry {
                at: now,
                action: action.clone(),
            });
        }

        let logs_before = self.state.logs.len();
        let restarted = matches!(action, WizardAction::StartMigration(_));
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, action, now);

        if let Some(bus) = &self.bus {
            let fresh = if restarted {
                &self.state.logs[..]
            } else {
                self.state.logs.get(logs_before..).unwrap_or_default()
            };
            for entry in fresh {
                bus.publish(LogAppended {
                    level: entry.level,
                    message: entry.message.clone(),
                    timestamp: entry.timestamp,
                })
                .await;
            }

            bus.publish(StateChanged {
                action: kind,
                current_step: self.state.current_step,
                is_running: self.state.is_running,
                log_count: self.state.logs.len(),
                timestamp: now,
            })
            .await;
        }

        &self.state
    }

    /// Moves to the next step when the current one is ready.
    pub async fn advance(&mut self) -> StepReadiness {
        let readiness = self.readiness();
        if readiness.is_ready() {
            let next = self.state.current_step + 1;
            self.dispatch(WizardAction::SetStep(next)).await;
        }
        readiness
    }

    /// Moves back one step; returns false on the first step.
    pub async fn retreat(&mut self) -> bool {
        if self.state.current_step <= FIRST_STEP {
            return false;
        }
        let previous = self.state.current_step - 1;
        self.dispatch(WizardAction::SetStep(previous)).await;
        true
    }
}

/// Cloneable handle for sharing one store between the driver and
/// background tasks.
#[derive(Clone)]
pub struct WizardHandle {
    inner: Arc<RwLock<WizardStore>>,
}

impl WizardHandle {
    pub fn new(store: WizardStore) -> Self {
        WizardHandle {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub async fn dispatch(&self, action: WizardAction) {
        self.inner.write().await.dispatch(action).await;
    }

    /// Applies several actions without letting anything interleave.
    pub async fn dispatch_all<I>(&self, actions: I)
    where
        I: IntoIterator<Item = WizardAction>,
    {
        let mut store = self.inner.write().await;
        for action in actions {
            store.dispatch(action).await;
        }
    }

    /// Dispatches `actions` only if `pred` holds for the current state,
    /// checked under the same lock.
    pub async fn dispatch_if<F, I>(&self, pred: F, actions: I) -> bool
    where
        F: FnOnce(&WizardState) -> bool,
        I: IntoIterator<Item = WizardAction>,
    {
        let mut store = self.inner.write().await;
        if !pred(store.state()) {
            return false;
        }
        for action in actions {
            store.dispatch(action).await;
        }
        true
    }

    /// Lets `plan` inspect the state and pick the actions to apply, all
    /// under one write lock. Returns the state after dispatching, or the
    /// error `plan` refused with.
    pub async fn try_dispatch<F, I, E>(&self, plan: F) -> Result<WizardState, E>
    where
        F: FnOnce(&WizardState, DateTime<Utc>) -> Result<I, E>,
        I: IntoIterator<Item = WizardAction>,
    {
        let mut store = self.inner.write().await;
        let now = store.now();
        for action in plan(store.state(), now)? {
            store.dispatch(action).await;
        }
        Ok(store.state().clone())
    }

    /// Publishes `event` on `bus` only if `pred` holds. The read lock is held
    /// until the event is queued, so no dispatch lands in between.
    pub async fn publish_if<F, E>(&self, bus: &EventBus, pred: F, event: E) -> bool
    where
        F: FnOnce(&WizardState) -> bool,
        E: Event + Clone,
    {
        let store = self.inner.read().await;
        if !pred(store.state()) {
            return false;
        }
        bus.publish(event).await;
        true
    }

    pub async fn snapshot(&self) -> WizardState {
        self.inner.read().await.state().clone()
    }

    pub async fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&WizardState) -> R,
    {
        f(self.inner.read().await.state())
    }

    pub async fn now(&self) -> DateTime<Utc> {
        self.inner.read().await.now()
    }

    pub async fn advance(&self) -> StepReadiness {
        self.inner.write().await.advance().await
    }

    pub async fn retreat(&self) -> bool {
        self.inner.write().await.retreat().await
    }

    pub async fn journal(&self) -> Option<Vec<JournalEntry>> {
        self.inner.read().await.journal().map(<[_]>::to_vec)
    }
}

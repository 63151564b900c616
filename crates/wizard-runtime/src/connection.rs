use async_trait::async_trait;
use chrono::Utc;
use model::{
    connection::{ConnectionConfig, Endpoint},
    events::ConnectionTested,
};
use rand::{Rng, rngs::StdRng};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wizard_core::event_bus::EventBus;

use crate::{error::SimulationError, settings::SimulationSettings};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ConnectionOutcome {
    Success,
    Failed { reason: String },
}

impl ConnectionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ConnectionOutcome::Success)
    }
}

/// Checks whether a connection descriptor can be reached.
#[async_trait]
pub trait ConnectionProbe: Send + Sync {
    async fn probe(
        &self,
        endpoint: Endpoint,
        config: &ConnectionConfig,
        cancel: &CancellationToken,
    ) -> Result<ConnectionOutcome, SimulationError>;
}

/// Stands in for a driver ping: waits, then succeeds with a probability that
/// is higher for local hosts.
pub struct SimulatedProbe {
    settings: SimulationSettings,
    rng: Mutex<StdRng>,
    bus: Option<EventBus>,
}

impl SimulatedProbe {
    pub fn new(settings: SimulationSettings) -> Self {
        let rng = Mutex::new(settings.rng(1));
        SimulatedProbe {
            settings,
            rng,
            bus: None,
        }
    }

    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    fn success_rate(&self, config: &ConnectionConfig) -> f64 {
        if config.engine.is_file_based() || config.looks_local() {
            self.settings.localhost_success_rate
        } else {
            self.settings.remote_success_rate
        }
    }
}

#[async_trait]
impl ConnectionProbe for SimulatedProbe {
    async fn probe(
        &self,
        endpoint: Endpoint,
        config: &ConnectionConfig,
        cancel: &CancellationToken,
    ) -> Result<ConnectionOutcome, SimulationError> {
        let missing = config.missing_fields();
        if !missing.is_empty() {
            let reason = format!("missing {}", missing.join(", "));
            warn!(%endpoint, %reason, "Connection test skipped");
            return Ok(ConnectionOutcome::Failed { reason });
        }

        info!(%endpoint, address = %config.display_address(), "Testing connection");

        tokio::select! {
            _ = cancel.cancelled() => return Err(SimulationError::Cancelled),
            _ = tokio::time::sleep(self.settings.connection_delay()) => {}
        }

        let draw: f64 = self.rng.lock().await.r#gen();
        let outcome = if draw < self.success_rate(config) {
            info!(%endpoint, "Successfully connected to {endpoint} database");
            ConnectionOutcome::Success
        } else {
            warn!(%endpoint, "Failed to connect to {endpoint} database");
            ConnectionOutcome::Failed {
                reason: format!(
                    "Failed to connect to {endpoint} database. Please check your credentials."
                ),
            }
        };

        if let Some(bus) = &self.bus {
            bus.publish(ConnectionTested {
                endpoint,
                success: outcome.is_success(),
                timestamp: Utc::now(),
            })
            .await;
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::connection::EngineKind;

    fn remote() -> ConnectionConfig {
        ConnectionConfig {
            host: "db.example.com".into(),
            database: "shop".into(),
            username: "admin".into(),
            ..ConnectionConfig::empty(EngineKind::Postgresql)
        }
    }

    fn settings(local: f64, remote: f64) -> SimulationSettings {
        SimulationSettings {
            localhost_success_rate: local,
            remote_success_rate: remote,
            ..SimulationSettings::fast(11)
        }
    }

    #[tokio::test]
    async fn incomplete_descriptor_fails_without_waiting() {
        let probe = SimulatedProbe::new(settings(1.0, 1.0));
        let outcome = probe
            .probe(
                Endpoint::Source,
                &ConnectionConfig::empty(EngineKind::Mysql),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ConnectionOutcome::Failed {
                reason: "missing host, database, username".into()
            }
        );
    }

    #[tokio::test]
    async fn local_hosts_use_local_rate() {
        let probe = SimulatedProbe::new(settings(1.0, 0.0));
        let cancel = CancellationToken::new();

        let mut local = remote();
        local.host = "localhost".into();
        assert!(probe.probe(Endpoint::Source, &local, &cancel).await.unwrap().is_success());
        assert!(!probe.probe(Endpoint::Target, &remote(), &cancel).await.unwrap().is_success());
    }

    #[tokio::test]
    async fn cancelled_probe_returns_error() {
        let probe = SimulatedProbe::new(SimulationSettings {
            connection_delay_ms: 10_000,
            ..settings(1.0, 1.0)
        });
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = probe.probe(Endpoint::Target, &remote(), &cancel).await;
        assert!(matches!(result, Err(SimulationError::Cancelled)));
    }

    #[tokio::test]
    async fn publishes_test_result() {
        let bus = EventBus::new();
        let (_sub, mut rx) = bus.listen::<ConnectionTested>(2).await;
        let probe = SimulatedProbe::new(settings(1.0, 1.0)).with_event_bus(bus);

        probe
            .probe(Endpoint::Target, &remote(), &CancellationToken::new())
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.endpoint, Endpoint::Target);
        assert!(event.success);
    }
}

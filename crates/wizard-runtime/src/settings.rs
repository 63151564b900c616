use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::SimulationError;

/// Timing and probability knobs of the simulated backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimulationSettings {
    pub connection_delay_ms: u64,
    pub localhost_success_rate: f64,
    pub remote_success_rate: f64,
    pub schema_load_delay_ms: u64,
    pub dry_run_tick_ms: u64,
    /// Upper bound of the random progress gained per dry-run tick, in percent.
    pub dry_run_max_step: f64,
    pub migration_tick_ms: u64,
    pub migration_max_step: f64,
    pub operation_timeout_secs: u64,
    /// Fixes every random draw when set.
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            connection_delay_ms: 2_000,
            localhost_success_rate: 0.95,
            remote_success_rate: 0.7,
            schema_load_delay_ms: 1_500,
            dry_run_tick_ms: 500,
            dry_run_max_step: 15.0,
            migration_tick_ms: 1_000,
            migration_max_step: 5.0,
            operation_timeout_secs: 600,
            seed: None,
        }
    }
}

impl SimulationSettings {
    /// Settings for tests and demos: millisecond ticks and a fixed seed.
    pub fn fast(seed: u64) -> Self {
        SimulationSettings {
            connection_delay_ms: 1,
            schema_load_delay_ms: 1,
            dry_run_tick_ms: 1,
            dry_run_max_step: 40.0,
            migration_tick_ms: 1,
            migration_max_step: 20.0,
            operation_timeout_secs: 30,
            seed: Some(seed),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), SimulationError> {
        for (name, rate) in [
            ("localhostSuccessRate", self.localhost_success_rate),
            ("remoteSuccessRate", self.remote_success_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(SimulationError::InvalidSettings(format!(
                    "{name} must be within [0, 1], got {rate}"
                )));
            }
        }
        for (name, step) in [
            ("dryRunMaxStep", self.dry_run_max_step),
            ("migrationMaxStep", self.migration_max_step),
        ] {
            if !(step > 0.0) {
                return Err(SimulationError::InvalidSettings(format!(
                    "{name} must be positive, got {step}"
                )));
            }
        }
        if self.dry_run_tick_ms == 0 || self.migration_tick_ms == 0 {
            return Err(SimulationError::InvalidSettings(
                "tick intervals must be at least 1 ms".into(),
            ));
        }
        Ok(())
    }

    /// A generator for one task. `stream` keeps seeded tasks independent.
    pub fn rng(&self, stream: u64) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(stream)),
            None => StdRng::from_entropy(),
        }
    }

    pub fn connection_delay(&self) -> Duration {
        Duration::from_millis(self.connection_delay_ms)
    }

    pub fn schema_load_delay(&self) -> Duration {
        Duration::from_millis(self.schema_load_delay_ms)
    }

    pub fn dry_run_tick(&self) -> Duration {
        Duration::from_millis(self.dry_run_tick_ms)
    }

    pub fn migration_tick(&self) -> Duration {
        Duration::from_millis(self.migration_tick_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }
}

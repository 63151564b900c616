use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use tracing::debug;
use wizard_runtime::settings::SimulationSettings;

use crate::error::CliError;

/// Prefix of every variable that tunes the simulation.
pub const PREFIX: &str = "WIZARD_";

/// `WIZARD_*` variables from the process environment and `.env` files.
#[derive(Debug, Clone, Default)]
pub struct EnvManager {
    vars: HashMap<String, String>,
}

impl EnvManager {
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars = vars
            .into_iter()
            .filter(|(key, _)| key.starts_with(PREFIX))
            .collect();
        Self { vars }
    }

    /// Adds variables from a .env file. Values already set by the process
    /// environment win.
    pub async fn load_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CliError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            CliError::Config(format!("Failed to read env file {}: {}", path.display(), e))
        })?;

        for (key, value) in parse_env_content(&content)? {
            if key.starts_with(PREFIX) {
                self.vars.entry(key).or_insert(value);
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Overrides every field of `settings` that has a matching variable.
    pub fn apply(&self, settings: &mut SimulationSettings) -> Result<(), CliError> {
        self.set("WIZARD_CONNECTION_DELAY_MS", &mut settings.connection_delay_ms)?;
        self.set("WIZARD_LOCALHOST_SUCCESS_RATE", &mut settings.localhost_success_rate)?;
        self.set("WIZARD_REMOTE_SUCCESS_RATE", &mut settings.remote_success_rate)?;
        self.set("WIZARD_SCHEMA_LOAD_DELAY_MS", &mut settings.schema_load_delay_ms)?;
        self.set("WIZARD_DRY_RUN_TICK_MS", &mut settings.dry_run_tick_ms)?;
        self.set("WIZARD_DRY_RUN_MAX_STEP", &mut settings.dry_run_max_step)?;
        self.set("WIZARD_MIGRATION_TICK_MS", &mut settings.migration_tick_ms)?;
        self.set("WIZARD_MIGRATION_MAX_STEP", &mut settings.migration_max_step)?;
        self.set("WIZARD_OPERATION_TIMEOUT_SECS", &mut settings.operation_timeout_secs)?;

        if let Some(seed) = self.parse::<u64>("WIZARD_SEED")? {
            settings.seed = Some(seed);
        }
        Ok(())
    }

    fn set<T: FromStr>(&self, key: &str, field: &mut T) -> Result<(), CliError> {
        if let Some(value) = self.parse(key)? {
            debug!(key, "Applying environment override");
            *field = value;
        }
        Ok(())
    }

    fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>, CliError> {
        let Some(raw) = self.get(key) else {
            return Ok(None);
        };
        raw.parse()
            .map(Some)
            .map_err(|_| CliError::Config(format!("Invalid value for {key}: {raw:?}")))
    }
}

fn parse_env_content(content: &str) -> Result<Vec<(String, String)>, CliError> {
    let mut vars = Vec::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid env file: malformed line {} (expected KEY=VALUE)",
                line_num + 1
            )));
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::Config(format!(
                "Invalid env file: empty key at line {}",
                line_num + 1
            )));
        }

        vars.push((key.to_string(), unquote(value.trim()).to_string()));
    }

    Ok(vars)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Database engines a connection descriptor can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Postgresql,
    Mysql,
    Sqlite,
    Oracle,
    Mssql,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown database engine: {0}")]
pub struct UnknownEngine(pub String);

impl EngineKind {
    pub const ALL: [EngineKind; 5] = [
        EngineKind::Postgresql,
        EngineKind::Mysql,
        EngineKind::Sqlite,
        EngineKind::Oracle,
        EngineKind::Mssql,
    ];

    pub fn default_port(&self) -> u16 {
        match self {
            EngineKind::Postgresql => 5432,
            EngineKind::Mysql => 3306,
            EngineKind::Sqlite => 0,
            EngineKind::Oracle => 1521,
            EngineKind::Mssql => 1433,
        }
    }

    /// File-based engines need neither a server address nor credentials.
    pub fn is_file_based(&self) -> bool {
        matches!(self, EngineKind::Sqlite)
    }

    pub fn label(&self) -> &'static str {
        match self {
            EngineKind::Postgresql => "PostgreSQL",
            EngineKind::Mysql => "MySQL",
            EngineKind::Sqlite => "SQLite",
            EngineKind::Oracle => "Oracle",
            EngineKind::Mssql => "Microsoft SQL Server",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for EngineKind {
    type Err = UnknownEngine;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Ok(EngineKind::Postgresql),
            "mysql" | "mariadb" => Ok(EngineKind::Mysql),
            "sqlite" => Ok(EngineKind::Sqlite),
            "oracle" => Ok(EngineKind::Oracle),
            "mssql" | "sqlserver" => Ok(EngineKind::Mssql),
            other => Err(UnknownEngine(other.to_string())),
        }
    }
}

/// One side of a migration: where to connect and how to authenticate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    #[serde(rename = "type")]
    pub engine: EngineKind,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub database: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssl: Option<bool>,
}

/// Which endpoint of the migration a descriptor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    Source,
    Target,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Source => f.write_str("source"),
            Endpoint::Target => f.write_str("target"),
        }
    }
}

impl ConnectionConfig {
    /// An empty descriptor for `engine` with its default port filled in.
    pub fn empty(engine: EngineKind) -> Self {
        ConnectionConfig {
            engine,
            host: String::new(),
            port: engine.default_port(),
            database: String::new(),
            username: String::new(),
            password: String::new(),
            ssl: Some(false),
        }
    }

    /// Switches the engine and resets the port to the new engine's default.
    pub fn with_engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self.port = engine.default_port();
        self
    }

    /// Required fields that are still empty. SQLite requires none of them.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        if self.engine.is_file_based() {
            return Vec::new();
        }

        let mut missing = Vec::new();
        if self.host.trim().is_empty() {
            missing.push("host");
        }
        if self.port == 0 {
            missing.push("port");
        }
        if self.database.trim().is_empty() {
            missing.push("database");
        }
        if self.username.trim().is_empty() {
            missing.push("username");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    pub fn looks_local(&self) -> bool {
        matches!(
            self.host.trim().to_lowercase().as_str(),
            "" | "localhost" | "127.0.0.1" | "::1"
        )
    }

    pub fn ssl_enabled(&self) -> bool {
        self.ssl.unwrap_or(false)
    }

    /// Short human-readable address, never including the password.
    pub fn display_address(&self) -> String {
        if self.engine.is_file_based() {
            return format!("{} ({})", self.engine, self.database);
        }
        format!(
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}

/// Source and target descriptors saved together from the first step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub source: ConnectionConfig,
    pub target: ConnectionConfig,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        DatabaseConfig {
            source: ConnectionConfig::empty(EngineKind::Postgresql),
            target: ConnectionConfig::empty(EngineKind::Mysql),
        }
    }
}

impl DatabaseConfig {
    pub fn endpoint(&self, endpoint: Endpoint) -> &ConnectionConfig {
        match endpoint {
            Endpoint::Source => &self.source,
            Endpoint::Target => &self.target,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.source.is_complete() && self.target.is_complete()
    }
}

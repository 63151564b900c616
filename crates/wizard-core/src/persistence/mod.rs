//! Table-oriented persistence seam.
//!
//! Only [`stub::StubClient`] exists today; it records the calls a real
//! backend would receive.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::PersistenceError;

pub mod stub;

pub const CONNECTIONS: &str = "connections";
pub const SCHEMAS: &str = "schemas";
pub const DRY_RUN_REPORTS: &str = "dry_run_reports";
pub const RULE_TEMPLATES: &str = "rule_templates";
pub const MIGRATIONS: &str = "migrations";
pub const LOGS: &str = "logs";

#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// `columns` of `None` means every column.
    async fn select(&self, table: &str, columns: Option<&str>) -> Result<Vec<Value>, PersistenceError>;

    async fn insert(&self, table: &str, row: Value) -> Result<Value, PersistenceError>;

    async fn update(
        &self,
        table: &str,
        data: Value,
        conditions: Value,
    ) -> Result<Value, PersistenceError>;

    async fn delete(&self, table: &str, conditions: Value) -> Result<Value, PersistenceError>;
}

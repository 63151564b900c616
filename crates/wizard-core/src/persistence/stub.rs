use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::info;

use super::{
    CONNECTIONS, DRY_RUN_REPORTS, LOGS, MIGRATIONS, PersistenceClient, RULE_TEMPLATES, SCHEMAS,
};
use crate::error::PersistenceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

/// A call the stub received, kept for inspection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordedCall {
    pub operation: Operation,
    pub table: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<Value>,
}

/// No-op backend: logs and records every call, serves fixed seed rows for
/// `select`, echoes written data, and never fails.
pub struct StubClient {
    seed: HashMap<&'static str, Vec<Value>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl Default for StubClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StubClient {
    pub fn new() -> Self {
        let users_columns = json!([
            { "name": "id", "type": "INTEGER", "nullable": false },
            { "name": "email", "type": "VARCHAR(255)", "nullable": false },
            { "name": "created_at", "type": "TIMESTAMP", "nullable": false }
        ]);

        let mut seed = HashMap::new();
        for table in [CONNECTIONS, DRY_RUN_REPORTS, RULE_TEMPLATES, MIGRATIONS, LOGS] {
            seed.insert(table, Vec::new());
        }
        seed.insert(
            SCHEMAS,
            vec![json!({
                "id": 1,
                "connection_id": 1,
                "table_name": "users",
                "columns": users_columns.to_string(),
            })],
        );

        StubClient {
            seed,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    async fn record(
        &self,
        operation: Operation,
        table: &str,
        data: Option<Value>,
        conditions: Option<Value>,
    ) {
        self.calls.lock().await.push(RecordedCall {
            operation,
            table: table.to_string(),
            data,
            conditions,
        });
    }
}

#[async_trait]
impl PersistenceClient for StubClient {
    async fn select(&self, table: &str, columns: Option<&str>) -> Result<Vec<Value>, PersistenceError> {
        info!("Mock: SELECT {} FROM {table}", columns.unwrap_or("*"));
        self.record(Operation::Select, table, None, None).await;
        Ok(self.seed.get(table).cloned().unwrap_or_default())
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, PersistenceError> {
        info!("Mock: INSERT INTO {table} {row}");
        self.record(Operation::Insert, table, Some(row.clone()), None)
            .await;
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        data: Value,
        conditions: Value,
    ) -> Result<Value, PersistenceError> {
        info!("Mock: UPDATE {table} SET {data} WHERE {conditions}");
        self.record(Operation::Update, table, Some(data.clone()), Some(conditions))
            .await;
        Ok(data)
    }

    async fn delete(&self, table: &str, conditions: Value) -> Result<Value, PersistenceError> {
        info!("Mock: DELETE FROM {table} WHERE {conditions}");
        self.record(Operation::Delete, table, None, Some(conditions))
            .await;
        Ok(Value::Null)
    }
}

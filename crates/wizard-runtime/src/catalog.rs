//! Simulated schema introspection.

use model::{
    catalog::{FunctionInfo, SchemaCatalog, TableInfo, ViewInfo},
    selection::SchemaSelection,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use wizard_core::{
    action::WizardAction,
    persistence::{PersistenceClient, SCHEMAS},
    store::WizardHandle,
};

use crate::{error::SimulationError, settings::SimulationSettings};

fn table(name: &str, rows: u64, size_mb: f64, last_modified: &str) -> TableInfo {
    TableInfo {
        name: name.into(),
        rows,
        size_mb,
        last_modified: last_modified.into(),
    }
}

fn view(name: &str, dependencies: [&str; 2], last_modified: &str) -> ViewInfo {
    ViewInfo {
        name: name.into(),
        dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        last_modified: last_modified.into(),
    }
}

fn function(name: &str, returns: &str, params: u32, last_modified: &str) -> FunctionInfo {
    FunctionInfo {
        name: name.into(),
        returns: returns.into(),
        params,
        last_modified: last_modified.into(),
    }
}

/// The fixed catalog every simulated source database exposes.
pub fn demo_catalog() -> SchemaCatalog {
    SchemaCatalog {
        tables: vec![
            table("users", 15_420, 2.3, "2024-01-15"),
            table("orders", 45_231, 12.1, "2024-01-20"),
            table("products", 3_421, 1.8, "2024-01-18"),
            table("categories", 156, 0.045, "2024-01-10"),
            table("payments", 23_412, 5.7, "2024-01-22"),
            table("reviews", 8_934, 3.2, "2024-01-19"),
            table("inventory", 12_543, 4.1, "2024-01-21"),
            table("customers", 18_765, 6.8, "2024-01-17"),
            table("suppliers", 234, 0.12, "2024-01-12"),
            table("audit_logs", 456_789, 234.0, "2024-01-23"),
        ],
        views: vec![
            view("user_orders_summary", ["users", "orders"], "2024-01-16"),
            view("product_analytics", ["products", "reviews"], "2024-01-18"),
            view("monthly_sales", ["orders", "payments"], "2024-01-20"),
            view("customer_insights", ["customers", "orders"], "2024-01-19"),
        ],
        functions: vec![
            function("calculate_tax", "DECIMAL", 2, "2024-01-10"),
            function("generate_order_id", "VARCHAR", 0, "2024-01-08"),
            function("update_inventory", "VOID", 3, "2024-01-15"),
            function("validate_email", "BOOLEAN", 1, "2024-01-12"),
        ],
    }
}

pub struct SchemaLoader {
    settings: SimulationSettings,
    client: Arc<dyn PersistenceClient>,
}

impl SchemaLoader {
    pub fn new(settings: SimulationSettings, client: Arc<dyn PersistenceClient>) -> Self {
        SchemaLoader { settings, client }
    }

    /// Loads the source catalog. Requires a saved database configuration.
    pub async fn load(
        &self,
        handle: &WizardHandle,
        cancel: &CancellationToken,
    ) -> Result<SchemaCatalog, SimulationError> {
        let source = handle
            .read(|s| s.database_config.as_ref().map(|c| c.source.clone()))
            .await
            .ok_or(SimulationError::NotConfigured("database configuration"))?;

        info!(source = %source.display_address(), "Loading schema");
        self.client.select(SCHEMAS, None).await?;

        tokio::select! {
            _ = cancel.cancelled() => return Err(SimulationError::Cancelled),
            _ = tokio::time::sleep(self.settings.schema_load_delay()) => {}
        }

        let catalog = demo_catalog();
        info!(
            tables = catalog.tables.len(),
            views = catalog.views.len(),
            functions = catalog.functions.len(),
            "Schema loaded"
        );
        Ok(catalog)
    }
}

/// Saves a selection into the wizard, refusing one without tables.
pub async fn save_selection(
    handle: &WizardHandle,
    selection: SchemaSelection,
) -> Result<(), SimulationError> {
    if !selection.has_tables() {
        return Err(SimulationError::NotConfigured("table selection"));
    }

    info!(
        tables = selection.selected_tables.len(),
        views = selection.selected_views.len(),
        functions = selection.selected_functions.len(),
        "Saving schema selection"
    );
    handle
        .dispatch(WizardAction::SetSchemaSelection(selection))
        .await;
    Ok(())
}

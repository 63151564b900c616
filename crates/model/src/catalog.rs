//! Schema objects a source database exposes for selection.

use crate::selection::SchemaSelection;
use serde::{Deserialize, Serialize};

/// Rows per minute assumed when estimating transfer time.
pub const ROWS_PER_MINUTE: u64 = 10_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub name: String,
    pub rows: u64,
    pub size_mb: f64,
    pub last_modified: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewInfo {
    pub name: String,
    pub dependencies: Vec<String>,
    pub last_modified: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionInfo {
    pub name: String,
    pub returns: String,
    pub params: u32,
    pub last_modified: String,
}

/// Size buckets used for quick table selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeCategory {
    Small,
    Medium,
    Large,
}

impl SizeCategory {
    pub fn contains(&self, rows: u64) -> bool {
        match self {
            SizeCategory::Small => rows < 1_000,
            SizeCategory::Medium => (1_000..50_000).contains(&rows),
            SizeCategory::Large => rows >= 50_000,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    pub tables: Vec<TableInfo>,
    pub views: Vec<ViewInfo>,
    pub functions: Vec<FunctionInfo>,
}

/// Aggregates over the tables of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEstimate {
    pub objects: usize,
    pub rows: u64,
    pub size_mb: f64,
    pub minutes: u64,
}

impl SchemaCatalog {
    /// Narrows every list to names containing `term`, ignoring case.
    pub fn filter(&self, term: &str) -> SchemaCatalog {
        let term = term.to_lowercase();
        let hit = |name: &str| name.to_lowercase().contains(&term);

        SchemaCatalog {
            tables: self.tables.iter().filter(|t| hit(&t.name)).cloned().collect(),
            views: self.views.iter().filter(|v| hit(&v.name)).cloned().collect(),
            functions: self
                .functions
                .iter()
                .filter(|f| hit(&f.name))
                .cloned()
                .collect(),
        }
    }

    pub fn tables_in(&self, category: SizeCategory) -> Vec<String> {
        self.tables
            .iter()
            .filter(|t| category.contains(t.rows))
            .map(|t| t.name.clone())
            .collect()
    }

    /// Totals for the selected tables that exist in this catalog. Unknown
    /// names contribute nothing.
    pub fn estimate(&self, selection: &SchemaSelection) -> SelectionEstimate {
        let selected = self
            .tables
            .iter()
            .filter(|t| selection.is_table_selected(&t.name));

        let (rows, size_mb) = selected.fold((0u64, 0f64), |(rows, size), t| {
            (rows + t.rows, size + t.size_mb)
        });

        SelectionEstimate {
            objects: selection.total_objects(),
            rows,
            size_mb,
            minutes: rows.div_ceil(ROWS_PER_MINUTE),
        }
    }
}

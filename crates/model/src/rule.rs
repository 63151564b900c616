use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformOp {
    Rename,
    Convert,
    Default,
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTransformation {
    pub column: String,
    pub operation: TransformOp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// User-defined mapping from a source table onto a target table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualRule {
    /// Empty until assigned; see [`fill_missing_ids`].
    #[serde(default)]
    pub id: String,
    pub source_table: String,
    pub target_table: String,
    #[serde(default)]
    pub column_mappings: BTreeMap<String, String>,
    #[serde(default)]
    pub transformations: Vec<ColumnTransformation>,
}

/// Partial update for a [`ManualRule`]. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualRulePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_mappings: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformations: Option<Vec<ColumnTransformation>>,
}

impl ManualRule {
    pub fn new(id: impl Into<String>, source_table: &str, target_table: &str) -> Self {
        ManualRule {
            id: id.into(),
            source_table: source_table.to_string(),
            target_table: target_table.to_string(),
            column_mappings: BTreeMap::new(),
            transformations: Vec::new(),
        }
    }

    /// Id in the `rule-<unix millis>` form used for freshly created rules.
    pub fn generate_id(now: chrono::DateTime<chrono::Utc>) -> String {
        format!("rule-{}", now.timestamp_millis())
    }

    pub fn is_valid(&self) -> bool {
        !self.source_table.trim().is_empty() && !self.target_table.trim().is_empty()
    }

    pub fn merge(&mut self, patch: ManualRulePatch) {
        if let Some(id) = patch.id {
            self.id = id;
        }
        if let Some(source_table) = patch.source_table {
            self.source_table = source_table;
        }
        if let Some(target_table) = patch.target_table {
            self.target_table = target_table;
        }
        if let Some(column_mappings) = patch.column_mappings {
            self.column_mappings = column_mappings;
        }
        if let Some(transformations) = patch.transformations {
            self.transformations = transformations;
        }
    }
}

/// Gives every rule without an id a fresh `rule-<unix millis>` id, counting
/// up from `now` past any id already taken.
pub fn fill_missing_ids(rules: &mut [ManualRule], now: chrono::DateTime<chrono::Utc>) -> usize {
    let mut taken: Vec<String> = rules
        .iter()
        .filter(|r| !r.id.is_empty())
        .map(|r| r.id.clone())
        .collect();
    let mut at = now;
    let mut filled = 0;

    for rule in rules.iter_mut().filter(|r| r.id.is_empty()) {
        let mut id = ManualRule::generate_id(at);
        while taken.contains(&id) {
            at += chrono::Duration::milliseconds(1);
            id = ManualRule::generate_id(at);
        }
        at += chrono::Duration::milliseconds(1);
        taken.push(id.clone());
        rule.id = id;
        filled += 1;
    }
    filled
}

impl From<ManualRule> for ManualRulePatch {
    fn from(rule: ManualRule) -> Self {
        ManualRulePatch {
            id: Some(rule.id),
            source_table: Some(rule.source_table),
            target_table: Some(rule.target_table),
            column_mappings: Some(rule.column_mappings),
            transformations: Some(rule.transformations),
        }
    }
}

impl ManualRulePatch {
    pub fn target_table(table: &str) -> Self {
        ManualRulePatch {
            target_table: Some(table.to_string()),
            ..Default::default()
        }
    }
}

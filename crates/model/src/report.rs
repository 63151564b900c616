use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
            Severity::Info => f.write_str("info"),
        }
    }
}

/// A single finding of the dry run, tied to one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub table: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Issue {
    pub fn new(severity: Severity, table: &str, message: &str, suggestion: Option<&str>) -> Self {
        Issue {
            severity,
            table: table.to_string(),
            message: message.to_string(),
            suggestion: suggestion.map(str::to_string),
        }
    }

    pub fn error(table: &str, message: &str, suggestion: &str) -> Self {
        Self::new(Severity::Error, table, message, Some(suggestion))
    }

    pub fn warning(table: &str, message: &str, suggestion: &str) -> Self {
        Self::new(Severity::Warning, table, message, Some(suggestion))
    }

    pub fn info(table: &str, message: &str) -> Self {
        Self::new(Severity::Info, table, message, None)
    }
}

/// Outcome of the dry-run validation step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DryRunResult {
    pub issues: Vec<Issue>,
    /// Minutes.
    pub estimated_time: u64,
    pub estimated_rows: u64,
}

/// Issue counts per severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueStats {
    pub error: usize,
    pub warning: usize,
    pub info: usize,
}

impl DryRunResult {
    pub fn count(&self, severity: Severity) -> usize {
        self.with_severity(severity).count()
    }

    pub fn stats(&self) -> IssueStats {
        IssueStats {
            error: self.count(Severity::Error),
            warning: self.count(Severity::Warning),
            info: self.count(Severity::Info),
        }
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn issues_by_table(&self) -> BTreeMap<&str, Vec<&Issue>> {
        let mut grouped: BTreeMap<&str, Vec<&Issue>> = BTreeMap::new();
        for issue in &self.issues {
            grouped.entry(issue.table.as_str()).or_default().push(issue);
        }
        grouped
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }
}

/// Formats a minute count as `"2h 45m"`, or `"45m"` under an hour.
pub fn format_minutes(minutes: u64) -> String {
    let hours = minutes / 60;
    let rest = minutes % 60;
    if hours > 0 {
        format!("{hours}h {rest}m")
    } else {
        format!("{rest}m")
    }
}

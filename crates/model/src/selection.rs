use serde::{Deserialize, Serialize};

/// Schema objects picked for migration plus the copy options.
///
/// The lists are semantically sets. The reducer stores whatever it is
/// given; the `toggle_*` and `select_*` helpers keep them free of duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaSelection {
    #[serde(default)]
    pub selected_tables: Vec<String>,
    #[serde(default)]
    pub selected_views: Vec<String>,
    #[serde(default)]
    pub selected_functions: Vec<String>,
    #[serde(default = "enabled")]
    pub include_data: bool,
    #[serde(default = "enabled")]
    pub include_indexes: bool,
    #[serde(default = "enabled")]
    pub include_constraints: bool,
}

fn enabled() -> bool {
    true
}

impl Default for SchemaSelection {
    fn default() -> Self {
        SchemaSelection {
            selected_tables: Vec::new(),
            selected_views: Vec::new(),
            selected_functions: Vec::new(),
            include_data: true,
            include_indexes: true,
            include_constraints: true,
        }
    }
}

fn toggle(list: &mut Vec<String>, name: &str) {
    if let Some(pos) = list.iter().position(|n| n == name) {
        list.remove(pos);
    } else {
        list.push(name.to_string());
    }
}

impl SchemaSelection {
    pub fn toggle_table(&mut self, name: &str) {
        toggle(&mut self.selected_tables, name);
    }

    pub fn toggle_view(&mut self, name: &str) {
        toggle(&mut self.selected_views, name);
    }

    pub fn toggle_function(&mut self, name: &str) {
        toggle(&mut self.selected_functions, name);
    }

    /// Replaces the table selection, dropping repeated names.
    pub fn select_tables<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_tables.clear();
        for name in names {
            let name = name.into();
            if !self.selected_tables.contains(&name) {
                self.selected_tables.push(name);
            }
        }
    }

    /// Selects every name in `visible`, or clears the tables if all of them
    /// are already selected.
    pub fn toggle_all_tables(&mut self, visible: &[String]) {
        if self.selected_tables.len() == visible.len() {
            self.selected_tables.clear();
        } else {
            self.select_tables(visible.iter().cloned());
        }
    }

    pub fn is_table_selected(&self, name: &str) -> bool {
        self.selected_tables.iter().any(|t| t == name)
    }

    pub fn has_tables(&self) -> bool {
        !self.selected_tables.is_empty()
    }

    pub fn total_objects(&self) -> usize {
        self.selected_tables.len() + self.selected_views.len() + self.selected_functions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggling_twice_removes_the_table() {
        let mut sel = SchemaSelection::default();
        sel.toggle_table("users");
        sel.toggle_table("orders");
        sel.toggle_table("users");
        assert_eq!(sel.selected_tables, vec!["orders".to_string()]);
    }

    #[test]
    fn views_and_functions_toggle_on_their_own_lists() {
        let mut sel = SchemaSelection::default();
        sel.toggle_view("active_users");
        sel.toggle_function("calc_total");
        sel.toggle_function("get_stats");
        sel.toggle_function("calc_total");

        assert!(sel.selected_tables.is_empty());
        assert_eq!(sel.selected_views, vec!["active_users"]);
        assert_eq!(sel.selected_functions, vec!["get_stats"]);
        assert_eq!(sel.total_objects(), 2);
    }

    #[test]
    fn select_tables_deduplicates() {
        let mut sel = SchemaSelection::default();
        sel.select_tables(["users", "orders", "users"]);
        assert_eq!(sel.selected_tables, vec!["users", "orders"]);
    }

    #[test]
    fn toggle_all_flips_between_all_and_none() {
        let visible = vec!["users".to_string(), "orders".to_string()];
        let mut sel = SchemaSelection::default();

        sel.toggle_all_tables(&visible);
        assert_eq!(sel.selected_tables, visible);

        sel.toggle_all_tables(&visible);
        assert!(sel.selected_tables.is_empty());
    }

    #[test]
    fn missing_flags_default_to_enabled() {
        let sel: SchemaSelection = serde_json::from_str(r#"{"selectedTables":["users"]}"#).unwrap();
        assert!(sel.include_data && sel.include_indexes && sel.include_constraints);
        assert_eq!(sel.total_objects(), 1);
    }
}

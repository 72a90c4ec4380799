//! Query Builder SELECT operations

use super::builder::QueryBuilder;
use crate::conditions::Fields;

impl QueryBuilder {
    /// Set the selected fields from a comma-separated list, replacing any
    /// earlier selection
    pub fn select(self, fields: &str) -> Self {
        self.select_fields(&Fields::parse(fields))
    }

    /// Set the selected fields, replacing any earlier selection
    pub fn select_fields(mut self, fields: &Fields) -> Self {
        self.select_fields = match fields {
            Fields::All => Vec::new(),
            Fields::Columns(columns) => columns.clone(),
        };
        self
    }

    /// Set the FROM table
    pub fn from(mut self, table: &str) -> Self {
        self.from_table = table.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_replaces_previous_selection() {
        let query = QueryBuilder::table("users").select("id, name").select("email");
        assert_eq!(query.selected_fields(), ["email".to_string()]);
        assert!(!query.selects_all());

        let query = query.select("*");
        assert!(query.selects_all());
    }
}

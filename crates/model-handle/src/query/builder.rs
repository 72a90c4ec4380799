//! Query Builder - Core builder implementation

use super::types::*;

/// An unexecuted query: table, selection, predicates, ordering, window and
/// the relations to attach. Built per call and handed to one executor call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryBuilder {
    pub(crate) from_table: String,
    pub(crate) select_fields: Vec<String>,
    pub(crate) where_conditions: Vec<WhereCondition>,
    pub(crate) order_by: Vec<(String, OrderDirection)>,
    pub(crate) limit_count: Option<u64>,
    pub(crate) offset_value: Option<u64>,
    pub(crate) with_relations: Vec<String>,
}

impl QueryBuilder {
    /// Create a new query builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a query builder reading from `table`
    pub fn table(table: &str) -> Self {
        Self::new().from(table)
    }

    pub fn table_name(&self) -> &str {
        &self.from_table
    }

    /// Selected columns; empty means all columns
    pub fn selected_fields(&self) -> &[String] {
        &self.select_fields
    }

    pub fn selects_all(&self) -> bool {
        self.select_fields.is_empty() || self.select_fields.iter().any(|f| f == "*")
    }

    pub fn conditions(&self) -> &[WhereCondition] {
        &self.where_conditions
    }

    pub fn has_conditions(&self) -> bool {
        !self.where_conditions.is_empty()
    }

    pub fn ordering(&self) -> &[(String, OrderDirection)] {
        &self.order_by
    }

    pub fn limit_count(&self) -> Option<u64> {
        self.limit_count
    }

    pub fn offset_value(&self) -> Option<u64> {
        self.offset_value
    }

    /// Relations to eager load with the results
    pub fn relations(&self) -> &[String] {
        &self.with_relations
    }

    /// Copy of this query keeping only table and predicates
    pub fn filter_only(&self) -> Self {
        Self {
            from_table: self.from_table.clone(),
            where_conditions: self.where_conditions.clone(),
            ..Self::default()
        }
    }
}

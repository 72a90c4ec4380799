//! Query Builder ORDER BY and eager-load attachment

use super::builder::QueryBuilder;
use super::types::*;
use crate::conditions::Ordering;

impl QueryBuilder {
    /// Add ORDER BY clause (ascending)
    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by.push((column.to_string(), OrderDirection::Asc));
        self
    }

    /// Add ORDER BY clause (descending)
    pub fn order_by_desc(mut self, column: &str) -> Self {
        self.order_by.push((column.to_string(), OrderDirection::Desc));
        self
    }

    /// Append every term of an ordering expression
    pub fn order(mut self, ordering: &Ordering) -> Self {
        self.order_by.extend(ordering.terms().iter().cloned());
        self
    }

    /// Attach relations to eager load, skipping names already attached
    pub fn with<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for relation in relations {
            let relation = relation.as_ref();
            if !self.with_relations.iter().any(|r| r == relation) {
                self.with_relations.push(relation.to_string());
            }
        }
        self
    }
}

//! Query Builder WHERE clause operations

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;
use crate::conditions::Conditions;

impl QueryBuilder {
    /// Add WHERE condition with equality
    pub fn where_eq<T>(self, column: &str, value: T) -> Self
    where
        T: Into<Value>,
    {
        self.where_op(column, QueryOperator::Equal, value)
    }

    /// Add WHERE condition with not equal
    pub fn where_ne<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::NotEqual, value)
    }

    /// Add WHERE condition with greater than
    pub fn where_gt<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::GreaterThan, value)
    }

    /// Add WHERE condition with greater than or equal
    pub fn where_gte<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::GreaterThanOrEqual, value)
    }

    /// Add WHERE condition with less than
    pub fn where_lt<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::LessThan, value)
    }

    /// Add WHERE condition with less than or equal
    pub fn where_lte<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.where_op(column, QueryOperator::LessThanOrEqual, value)
    }

    /// Add WHERE condition with LIKE
    pub fn where_like(self, column: &str, pattern: &str) -> Self {
        self.where_op(column, QueryOperator::Like, pattern)
    }

    /// Add WHERE condition with NOT LIKE
    pub fn where_not_like(self, column: &str, pattern: &str) -> Self {
        self.where_op(column, QueryOperator::NotLike, pattern)
    }

    /// Add WHERE condition with IN
    pub fn where_in<T: Into<Value>>(mut self, column: &str, values: Vec<T>) -> Self {
        self.where_conditions.push(WhereCondition {
            column: column.to_string(),
            operator: QueryOperator::In,
            value: None,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Add WHERE condition with NOT IN
    pub fn where_not_in<T: Into<Value>>(mut self, column: &str, values: Vec<T>) -> Self {
        self.where_conditions.push(WhereCondition {
            column: column.to_string(),
            operator: QueryOperator::NotIn,
            value: None,
            values: values.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Add WHERE condition with IS NULL
    pub fn where_null(self, column: &str) -> Self {
        self.where_op(column, QueryOperator::IsNull, Value::Null)
    }

    /// Add WHERE condition with IS NOT NULL
    pub fn where_not_null(self, column: &str) -> Self {
        self.where_op(column, QueryOperator::IsNotNull, Value::Null)
    }

    /// Add WHERE condition with BETWEEN
    pub fn where_between<T: Into<Value>>(mut self, column: &str, start: T, end: T) -> Self {
        self.where_conditions.push(WhereCondition {
            column: column.to_string(),
            operator: QueryOperator::Between,
            value: None,
            values: vec![start.into(), end.into()],
        });
        self
    }

    /// Add WHERE condition with an explicit operator
    pub fn where_op<T: Into<Value>>(mut self, column: &str, operator: QueryOperator, value: T) -> Self {
        self.where_conditions
            .push(WhereCondition::new(column, operator, value.into()));
        self
    }

    /// Add every predicate of a condition set
    pub fn where_all(mut self, conditions: &Conditions) -> Self {
        self.where_conditions.extend(conditions.iter().cloned());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_where_methods_accumulate_in_order() {
        let query = QueryBuilder::table("users")
            .where_eq("status", "active")
            .where_in("role", vec!["admin", "editor"])
            .where_between("age", 18, 65)
            .where_null("deleted_at");

        let columns: Vec<&str> = query.conditions().iter().map(|c| c.column.as_str()).collect();
        assert_eq!(columns, vec!["status", "role", "age", "deleted_at"]);
        assert_eq!(query.conditions()[1].values, vec![json!("admin"), json!("editor")]);
        assert_eq!(query.conditions()[2].operator, QueryOperator::Between);
    }

    #[test]
    fn test_where_all_extends() {
        let conditions = Conditions::from([("a", 1), ("b", 2)]);
        let query = QueryBuilder::table("t").where_eq("z", 0).where_all(&conditions);
        assert_eq!(query.conditions().len(), 3);
        assert_eq!(query.conditions()[2].column, "b");
    }
}

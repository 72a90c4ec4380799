//! Query Conditions and Clauses
//!
//! Caller-facing inputs of the handle: the condition set, the field
//! selection and the ordering expression. Each one is applied to a
//! [`QueryBuilder`](crate::query::QueryBuilder) when a query is built.

pub mod fields;
pub mod ordering;

pub use fields::Fields;
pub use ordering::Ordering;

use serde_json::Value;

use crate::error::{ModelError, ModelResult};
use crate::query::types::{QueryOperator, WhereCondition};

/// Ordered set of filter predicates, joined with AND
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    conditions: Vec<WhereCondition>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality predicate
    pub fn eq<T: Into<Value>>(self, column: &str, value: T) -> Self {
        self.with(column, QueryOperator::Equal, value)
    }

    /// Add a predicate with an explicit operator
    pub fn with<T: Into<Value>>(mut self, column: &str, operator: QueryOperator, value: T) -> Self {
        self.conditions
            .push(WhereCondition::new(column, operator, value.into()));
        self
    }

    /// Add a predicate whose operator is given as text (`">="`, `"not in"`, ...)
    pub fn with_op<T: Into<Value>>(self, column: &str, operator: &str, value: T) -> ModelResult<Self> {
        let operator = operator.parse::<QueryOperator>()?;
        Ok(self.with(column, operator, value))
    }

    pub fn push(&mut self, condition: WhereCondition) {
        self.conditions.push(condition);
    }

    /// Append every predicate of `other`
    pub fn extend(mut self, other: Conditions) -> Self {
        self.conditions.extend(other.conditions);
        self
    }

    /// Build a condition set from a JSON object.
    ///
    /// A plain value means equality. A two-element array whose first element
    /// is an operator (`{"age": [">", 18]}`) uses that operator, and a
    /// one-element operator array covers the unary forms
    /// (`{"deleted_at": ["null"]}`). Any other array is treated as `IN`.
    pub fn from_json(value: &Value) -> ModelResult<Self> {
        let object = match value {
            Value::Object(object) => object,
            Value::Null => return Ok(Self::new()),
            other => {
                return Err(ModelError::Query(format!(
                    "Condition set must be a JSON object, got {}",
                    other
                )))
            }
        };

        let mut conditions = Self::new();
        for (column, value) in object {
            conditions.push(Self::condition_from_json(column, value));
        }
        Ok(conditions)
    }

    fn condition_from_json(column: &str, value: &Value) -> WhereCondition {
        if let Value::Array(items) = value {
            let operator = items
                .first()
                .and_then(Value::as_str)
                .and_then(|op| op.parse::<QueryOperator>().ok());

            return match (operator, items.len()) {
                (Some(op), 1) if op.is_unary() => WhereCondition::new(column, op, Value::Null),
                (Some(op), 2) => WhereCondition::new(column, op, items[1].clone()),
                _ => WhereCondition::new(column, QueryOperator::In, value.clone()),
            };
        }
        WhereCondition::eq(column, value.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WhereCondition> {
        self.conditions.iter()
    }

    pub fn into_inner(self) -> Vec<WhereCondition> {
        self.conditions
    }
}

impl<K, V> FromIterator<(K, V)> for Conditions
where
    K: AsRef<str>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Conditions::new(), |acc, (column, value)| acc.eq(column.as_ref(), value))
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Conditions
where
    K: AsRef<str>,
    V: Into<Value>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl From<WhereCondition> for Conditions {
    fn from(condition: WhereCondition) -> Self {
        Self {
            conditions: vec![condition],
        }
    }
}

impl<'a> IntoIterator for &'a Conditions {
    type Item = &'a WhereCondition;
    type IntoIter = std::slice::Iter<'a, WhereCondition>;

    fn into_iter(self) -> Self::IntoIter {
        self.conditions.iter()
    }
}

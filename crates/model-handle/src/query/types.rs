//! Query Builder Types - Core types and enums for query building

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ModelError;

/// Query operator types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Between,
}

impl QueryOperator {
    /// Operators that compare against a list of values
    pub fn takes_list(&self) -> bool {
        matches!(
            self,
            QueryOperator::In | QueryOperator::NotIn | QueryOperator::Between
        )
    }

    /// Operators that take no value at all
    pub fn is_unary(&self) -> bool {
        matches!(self, QueryOperator::IsNull | QueryOperator::IsNotNull)
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOperator::Equal => write!(f, "="),
            QueryOperator::NotEqual => write!(f, "!="),
            QueryOperator::GreaterThan => write!(f, ">"),
            QueryOperator::GreaterThanOrEqual => write!(f, ">="),
            QueryOperator::LessThan => write!(f, "<"),
            QueryOperator::LessThanOrEqual => write!(f, "<="),
            QueryOperator::Like => write!(f, "LIKE"),
            QueryOperator::NotLike => write!(f, "NOT LIKE"),
            QueryOperator::In => write!(f, "IN"),
            QueryOperator::NotIn => write!(f, "NOT IN"),
            QueryOperator::IsNull => write!(f, "IS NULL"),
            QueryOperator::IsNotNull => write!(f, "IS NOT NULL"),
            QueryOperator::Between => write!(f, "BETWEEN"),
        }
    }
}

impl FromStr for QueryOperator {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        match normalized.as_str() {
            "=" | "EQ" => Ok(QueryOperator::Equal),
            "!=" | "<>" | "NEQ" => Ok(QueryOperator::NotEqual),
            ">" | "GT" => Ok(QueryOperator::GreaterThan),
            ">=" | "EGT" => Ok(QueryOperator::GreaterThanOrEqual),
            "<" | "LT" => Ok(QueryOperator::LessThan),
            "<=" | "ELT" => Ok(QueryOperator::LessThanOrEqual),
            "LIKE" => Ok(QueryOperator::Like),
            "NOT LIKE" => Ok(QueryOperator::NotLike),
            "IN" => Ok(QueryOperator::In),
            "NOT IN" => Ok(QueryOperator::NotIn),
            "IS NULL" | "NULL" => Ok(QueryOperator::IsNull),
            "IS NOT NULL" | "NOT NULL" => Ok(QueryOperator::IsNotNull),
            "BETWEEN" => Ok(QueryOperator::Between),
            _ => Err(ModelError::Query(format!("Unsupported operator '{}'", s))),
        }
    }
}

/// Where clause condition
#[derive(Debug, Clone, PartialEq)]
pub struct WhereCondition {
    pub column: String,
    pub operator: QueryOperator,
    pub value: Option<Value>,
    pub values: Vec<Value>, // For IN, NOT IN, BETWEEN
}

impl WhereCondition {
    pub fn new(column: &str, operator: QueryOperator, value: Value) -> Self {
        if operator.is_unary() {
            return Self {
                column: column.to_string(),
                operator,
                value: None,
                values: Vec::new(),
            };
        }

        if operator.takes_list() {
            let values = match value {
                Value::Array(items) => items,
                other => vec![other],
            };
            return Self {
                column: column.to_string(),
                operator,
                value: None,
                values,
            };
        }

        Self {
            column: column.to_string(),
            operator,
            value: Some(value),
            values: Vec::new(),
        }
    }

    pub fn eq(column: &str, value: Value) -> Self {
        Self::new(column, QueryOperator::Equal, value)
    }
}

/// Order by direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderDirection::Asc => write!(f, "ASC"),
            OrderDirection::Desc => write!(f, "DESC"),
        }
    }
}

impl FromStr for OrderDirection {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(OrderDirection::Asc),
            "desc" => Ok(OrderDirection::Desc),
            _ => Err(ModelError::Query(format!("Invalid order direction '{}'", s))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operator_parsing() {
        assert_eq!("=".parse::<QueryOperator>().unwrap(), QueryOperator::Equal);
        assert_eq!("<>".parse::<QueryOperator>().unwrap(), QueryOperator::NotEqual);
        assert_eq!("not   like".parse::<QueryOperator>().unwrap(), QueryOperator::NotLike);
        assert_eq!("between".parse::<QueryOperator>().unwrap(), QueryOperator::Between);
        assert!("~=".parse::<QueryOperator>().is_err());
    }

    #[test]
    fn test_condition_shapes() {
        let cond = WhereCondition::new("id", QueryOperator::In, json!([1, 2, 3]));
        assert!(cond.value.is_none());
        assert_eq!(cond.values.len(), 3);

        let cond = WhereCondition::new("deleted_at", QueryOperator::IsNull, json!("ignored"));
        assert!(cond.value.is_none());
        assert!(cond.values.is_empty());

        let cond = WhereCondition::eq("status", json!("active"));
        assert_eq!(cond.value, Some(json!("active")));
    }

    #[test]
    fn test_direction_parsing() {
        assert_eq!("DESC".parse::<OrderDirection>().unwrap(), OrderDirection::Desc);
        assert_eq!(OrderDirection::Asc.to_string(), "ASC");
        assert!("sideways".parse::<OrderDirection>().is_err());
    }
}

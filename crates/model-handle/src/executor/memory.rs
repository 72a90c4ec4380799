//! In-memory executor
//!
//! Tables are vectors of records in a `DashMap`. Predicates, ordering and
//! windows are evaluated in process with PostgreSQL-like semantics: NULL
//! never compares equal, NULLs sort last ascending and first descending,
//! and a numeric string compares equal to the number it spells.

use std::cmp::Ordering;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Number, Value};

use super::QueryExecutor;
use crate::conditions::Fields;
use crate::error::{ModelError, ModelResult};
use crate::query::{OrderDirection, QueryBuilder, QueryOperator, WhereCondition};
use crate::record::{key_string, Record};

#[derive(Debug, Default)]
pub struct MemoryExecutor {
    tables: DashMap<String, Vec<Record>>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table if it does not exist yet
    pub fn create_table(&self, table: &str) {
        self.tables.entry(table.to_string()).or_default();
    }

    pub fn insert(&self, table: &str, row: Value) -> ModelResult<()> {
        let record = Record::try_from(row)?;
        self.tables.entry(table.to_string()).or_default().push(record);
        Ok(())
    }

    /// Create `table` and append `rows` to it
    pub fn seed(&self, table: &str, rows: Vec<Value>) -> ModelResult<()> {
        self.create_table(table);
        for row in rows {
            self.insert(table, row)?;
        }
        Ok(())
    }

    /// Snapshot of every row in `table`
    pub fn rows(&self, table: &str) -> Vec<Record> {
        self.tables
            .get(table)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }

    fn missing_table(table: &str) -> ModelError {
        ModelError::Database(format!("relation \"{}\" does not exist", table))
    }

    fn matching_rows(&self, query: &QueryBuilder) -> ModelResult<Vec<Record>> {
        let rows = self
            .tables
            .get(query.table_name())
            .ok_or_else(|| Self::missing_table(query.table_name()))?;

        let mut matched = Vec::new();
        for row in rows.iter() {
            if row_matches(row, query.conditions())? {
                matched.push(row.clone());
            }
        }
        Ok(matched)
    }
}

#[async_trait]
impl QueryExecutor for MemoryExecutor {
    async fn fetch_all(&self, query: &QueryBuilder) -> ModelResult<Vec<Record>> {
        let mut rows = self.matching_rows(query)?;
        rows.sort_by(|a, b| compare_rows(a, b, query.ordering()));

        let offset = query.offset_value().unwrap_or(0) as usize;
        let limit = query.limit_count().map(|l| l as usize).unwrap_or(usize::MAX);
        let fields = if query.selects_all() {
            Fields::All
        } else {
            Fields::columns(query.selected_fields().iter().cloned())
        };

        let rows: Vec<Record> = rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| row.project(&fields))
            .collect();

        tracing::debug!("Memory executor fetched {} row(s) from {}", rows.len(), query.table_name());
        Ok(rows)
    }

    async fn count(&self, query: &QueryBuilder) -> ModelResult<u64> {
        Ok(self.matching_rows(query)?.len() as u64)
    }

    async fn delete(&self, query: &QueryBuilder) -> ModelResult<u64> {
        let mut rows = self
            .tables
            .get_mut(query.table_name())
            .ok_or_else(|| Self::missing_table(query.table_name()))?;

        let mut keep = Vec::with_capacity(rows.len());
        for row in rows.iter() {
            keep.push(!row_matches(row, query.conditions())?);
        }

        let before = rows.len();
        let mut flags = keep.into_iter();
        rows.retain(|_| flags.next().unwrap_or(true));
        Ok((before - rows.len()) as u64)
    }

    async fn increment(&self, query: &QueryBuilder, column: &str, step: i64) -> ModelResult<u64> {
        let mut rows = self
            .tables
            .get_mut(query.table_name())
            .ok_or_else(|| Self::missing_table(query.table_name()))?;

        // Compute every new value first so a bad row leaves the table untouched
        let mut updates = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            if row_matches(row, query.conditions())? {
                let current = row.get(column).cloned().unwrap_or(Value::Null);
                updates.push((index, add_step(&current, step, column)?));
            }
        }

        for (index, value) in &updates {
            rows[*index].insert(column, value.clone());
        }
        Ok(updates.len() as u64)
    }
}

fn add_step(current: &Value, step: i64, column: &str) -> ModelResult<Value> {
    match current {
        // NULL + n stays NULL, the row still counts as updated
        Value::Null => Ok(Value::Null),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.checked_add(step).map(Value::from).ok_or_else(|| {
                    ModelError::Database(format!("integer out of range incrementing '{}'", column))
                })
            } else {
                let f = n.as_f64().unwrap_or_default() + step as f64;
                Number::from_f64(f).map(Value::Number).ok_or_else(|| {
                    ModelError::Database(format!("numeric overflow incrementing '{}'", column))
                })
            }
        }
        other => Err(ModelError::Database(format!(
            "column '{}' is not numeric (found {})",
            column, other
        ))),
    }
}

fn row_matches(row: &Record, conditions: &[WhereCondition]) -> ModelResult<bool> {
    for condition in conditions {
        if !condition_matches(row, condition)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn condition_matches(row: &Record, condition: &WhereCondition) -> ModelResult<bool> {
    let actual = row.get(&condition.column).unwrap_or(&Value::Null);
    let operand = || {
        condition.value.as_ref().ok_or_else(|| {
            ModelError::Query(format!(
                "Condition on '{}' with {} has no value",
                condition.column, condition.operator
            ))
        })
    };

    let matched = match condition.operator {
        QueryOperator::Equal => match &condition.value {
            None | Some(Value::Null) => actual.is_null(),
            Some(expected) => loose_eq(actual, expected),
        },
        QueryOperator::NotEqual => match &condition.value {
            None | Some(Value::Null) => !actual.is_null(),
            Some(expected) => !actual.is_null() && !loose_eq(actual, expected),
        },
        QueryOperator::GreaterThan => compare_values(actual, operand()?) == Some(Ordering::Greater),
        QueryOperator::GreaterThanOrEqual => matches!(
            compare_values(actual, operand()?),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        QueryOperator::LessThan => compare_values(actual, operand()?) == Some(Ordering::Less),
        QueryOperator::LessThanOrEqual => matches!(
            compare_values(actual, operand()?),
            Some(Ordering::Less | Ordering::Equal)
        ),
        QueryOperator::Like | QueryOperator::NotLike => {
            if actual.is_null() {
                false
            } else {
                let found = like_match(&key_string(actual), &key_string(operand()?));
                found == (condition.operator == QueryOperator::Like)
            }
        }
        QueryOperator::In => condition.values.iter().any(|v| loose_eq(actual, v)),
        QueryOperator::NotIn => {
            !actual.is_null() && !condition.values.iter().any(|v| loose_eq(actual, v))
        }
        QueryOperator::IsNull => actual.is_null(),
        QueryOperator::IsNotNull => !actual.is_null(),
        QueryOperator::Between => {
            let [start, end] = condition.values.as_slice() else {
                return Err(ModelError::Query(format!(
                    "BETWEEN on '{}' needs exactly two values",
                    condition.column
                )));
            };
            matches!(
                compare_values(actual, start),
                Some(Ordering::Greater | Ordering::Equal)
            ) && matches!(
                compare_values(actual, end),
                Some(Ordering::Less | Ordering::Equal)
            )
        }
    };
    Ok(matched)
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    compare_values(a, b) == Some(Ordering::Equal)
}

/// Compare two values; `None` when either is NULL or they are incomparable
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Number(x), Value::String(y)) => {
            let y = y.trim().parse::<f64>().ok()?;
            x.as_f64()?.partial_cmp(&y)
        }
        (Value::String(_), Value::Number(_)) => compare_values(b, a).map(Ordering::reverse),
        _ => (a == b).then_some(Ordering::Equal),
    }
}

fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    match (x.as_i64(), y.as_i64()) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}

fn compare_rows(a: &Record, b: &Record, ordering: &[(String, OrderDirection)]) -> Ordering {
    for (column, direction) in ordering {
        let left = a.get(column).unwrap_or(&Value::Null);
        let right = b.get(column).unwrap_or(&Value::Null);
        let order = match (left.is_null(), right.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compare_values(left, right).unwrap_or(Ordering::Equal),
        };
        let order = match direction {
            OrderDirection::Asc => order,
            OrderDirection::Desc => order.reverse(),
        };
        if order != Ordering::Equal {
            return order;
        }
    }
    Ordering::Equal
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum LikeToken {
    Any,
    One,
    Literal(char),
}

/// SQL LIKE: `%` matches any run, `_` one character, `\` escapes
fn like_match(text: &str, pattern: &str) -> bool {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        tokens.push(match c {
            '%' => LikeToken::Any,
            '_' => LikeToken::One,
            '\\' => LikeToken::Literal(chars.next().unwrap_or('\\')),
            c => LikeToken::Literal(c),
        });
    }

    // matched[j]: the first j tokens match the text consumed so far
    let mut matched = vec![false; tokens.len() + 1];
    matched[0] = true;
    for j in 1..=tokens.len() {
        matched[j] = matched[j - 1] && tokens[j - 1] == LikeToken::Any;
    }

    for ch in text.chars() {
        let mut next = vec![false; tokens.len() + 1];
        for j in 1..=tokens.len() {
            next[j] = match tokens[j - 1] {
                LikeToken::Any => next[j - 1] || matched[j],
                LikeToken::One => matched[j - 1],
                LikeToken::Literal(c) => matched[j - 1] && c == ch,
            };
        }
        matched = next;
    }
    matched[tokens.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn executor() -> MemoryExecutor {
        let executor = MemoryExecutor::new();
        executor
            .seed(
                "users",
                vec![
                    json!({"id": 1, "name": "Ada", "age": 36, "score": 10}),
                    json!({"id": 2, "name": "Brian", "age": null, "score": 5}),
                    json!({"id": 3, "name": "Cleo", "age": 22, "score": null}),
                ],
            )
            .unwrap();
        executor
    }

    #[test]
    fn test_like_match() {
        assert!(like_match("Ada Lovelace", "Ada%"));
        assert!(like_match("Ada", "A_a"));
        assert!(like_match("anything", "%"));
        assert!(!like_match("Ada", "a%"));
        assert!(like_match("50%", "50\\%"));
        assert!(!like_match("500", "50\\%"));
    }

    #[test]
    fn test_compare_values() {
        assert_eq!(compare_values(&json!(2), &json!("2")), Some(Ordering::Equal));
        assert_eq!(compare_values(&json!("10"), &json!(9)), Some(Ordering::Greater));
        assert_eq!(compare_values(&json!(1.5), &json!(1)), Some(Ordering::Greater));
        assert_eq!(compare_values(&Value::Null, &Value::Null), None);
        assert_eq!(compare_values(&json!("x"), &json!(1)), None);
    }

    #[tokio::test]
    async fn test_fetch_filters_sorts_and_projects() {
        let executor = executor();
        let query = QueryBuilder::table("users")
            .select("id, name")
            .where_gt("id", 1)
            .order_by_desc("id");
        let rows = executor.fetch_all(&query).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("id"), Some(&json!(3)));
        assert!(!rows[0].contains("age"));
    }

    #[tokio::test]
    async fn test_nulls_sort_last_ascending() {
        let executor = executor();
        let rows = executor
            .fetch_all(&QueryBuilder::table("users").order_by("age"))
            .await
            .unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r.get("id").cloned().unwrap()).collect();
        assert_eq!(ids, vec![json!(3), json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn test_null_comparisons_never_match() {
        let executor = executor();
        let count = executor
            .count(&QueryBuilder::table("users").where_ne("age", 36))
            .await
            .unwrap();
        assert_eq!(count, 1);

        let count = executor
            .count(&QueryBuilder::table("users").where_null("age"))
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_increment_and_delete() {
        let executor = executor();
        let affected = executor
            .increment(&QueryBuilder::table("users").where_lte("id", 3), "score", 2)
            .await
            .unwrap();
        assert_eq!(affected, 3);
        let rows = executor.rows("users");
        assert_eq!(rows[0].get("score"), Some(&json!(12)));
        assert_eq!(rows[2].get("score"), Some(&Value::Null));

        let removed = executor
            .delete(&QueryBuilder::table("users").where_in("id", vec![1, 3]))
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert_eq!(executor.rows("users").len(), 1);
    }

    #[tokio::test]
    async fn test_increment_non_numeric_leaves_table_untouched() {
        let executor = executor();
        let err = executor
            .increment(&QueryBuilder::table("users"), "name", 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Database(_)));
        assert_eq!(executor.rows("users")[0].get("name"), Some(&json!("Ada")));
    }

    #[tokio::test]
    async fn test_missing_table() {
        let executor = MemoryExecutor::new();
        let err = executor
            .fetch_all(&QueryBuilder::table("ghosts"))
            .await
            .unwrap_err();
        assert!(matches!(err, ModelError::Database(_)));
    }
}

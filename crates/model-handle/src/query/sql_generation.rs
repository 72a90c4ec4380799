//! Query Builder SQL generation (PostgreSQL dialect)
//!
//! Every statement comes in a parameterized form (`$1..$n` plus the bound
//! values) used by the executor, and `to_sql` renders the SELECT with values
//! inlined for logging and tests.
//!
//! The `*_with_casts` forms take the column types of the table. A string
//! compared against a non-text column is then rendered as `$n::type`, so
//! request values such as `"1"` compare against integer or boolean columns.

use std::collections::HashMap;

use serde_json::Value;

use super::builder::QueryBuilder;
use super::types::*;
use crate::error::{ModelError, ModelResult};
use crate::security::{escape_identifier, validate_identifier};

/// Column name to SQL type name (as `format_type` reports it)
pub type ColumnTypes = HashMap<String, String>;

/// Collects SQL text and either binds values or inlines them
struct SqlWriter<'a> {
    sql: String,
    params: Vec<Value>,
    inline: bool,
    casts: Option<&'a ColumnTypes>,
}

impl<'a> SqlWriter<'a> {
    fn new(inline: bool) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            inline,
            casts: None,
        }
    }

    fn with_casts(casts: Option<&'a ColumnTypes>) -> Self {
        Self {
            casts,
            ..Self::new(false)
        }
    }

    fn push(&mut self, text: &str) {
        self.sql.push_str(text);
    }

    fn push_ident(&mut self, identifier: &str) -> ModelResult<()> {
        validate_identifier(identifier)?;
        self.sql.push_str(&escape_identifier(identifier));
        Ok(())
    }

    fn push_value(&mut self, value: &Value) {
        if self.inline {
            self.sql.push_str(&format_value(value));
        } else {
            self.params.push(value.clone());
            self.sql.push_str(&format!("${}", self.params.len()));
        }
    }

    /// Bind a value compared against `column`, cast to the column's type
    /// when it is a string and the column is not textual
    fn push_operand(&mut self, column: &str, value: &Value) {
        self.push_value(value);
        if self.inline || !value.is_string() {
            return;
        }
        let name = column.rsplit('.').next().unwrap_or(column);
        if let Some(sql_type) = self.casts.and_then(|casts| casts.get(name)) {
            if !is_textual(sql_type) {
                self.sql.push_str("::");
                self.sql.push_str(sql_type);
            }
        }
    }

    fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }
}

fn is_textual(sql_type: &str) -> bool {
    sql_type == "text"
        || sql_type == "name"
        || sql_type == "citext"
        || sql_type.starts_with("character")
}

impl QueryBuilder {
    /// SELECT statement with placeholders and the values to bind
    pub fn to_sql_with_params(&self) -> ModelResult<(String, Vec<Value>)> {
        self.select_statement(None)
    }

    /// SELECT statement with values inlined (for logging and testing)
    pub fn to_sql(&self) -> ModelResult<String> {
        let mut writer = SqlWriter::new(true);
        self.write_select(&mut writer)?;
        Ok(writer.finish().0)
    }

    /// `SELECT COUNT(*)` over the table and predicates of this query
    pub fn to_count_sql_with_params(&self) -> ModelResult<(String, Vec<Value>)> {
        self.count_statement(None)
    }

    /// `DELETE` over the table and predicates of this query
    pub fn to_delete_sql_with_params(&self) -> ModelResult<(String, Vec<Value>)> {
        self.delete_statement(None)
    }

    /// `UPDATE ... SET column = column + step` over the predicates of this query
    pub fn to_increment_sql_with_params(&self, column: &str, step: i64) -> ModelResult<(String, Vec<Value>)> {
        self.increment_statement(column, step, None)
    }

    pub fn to_sql_with_casts(&self, casts: &ColumnTypes) -> ModelResult<(String, Vec<Value>)> {
        self.select_statement(Some(casts))
    }

    pub fn to_count_sql_with_casts(&self, casts: &ColumnTypes) -> ModelResult<(String, Vec<Value>)> {
        self.count_statement(Some(casts))
    }

    pub fn to_delete_sql_with_casts(&self, casts: &ColumnTypes) -> ModelResult<(String, Vec<Value>)> {
        self.delete_statement(Some(casts))
    }

    pub fn to_increment_sql_with_casts(
        &self,
        column: &str,
        step: i64,
        casts: &ColumnTypes,
    ) -> ModelResult<(String, Vec<Value>)> {
        self.increment_statement(column, step, Some(casts))
    }

    fn select_statement(&self, casts: Option<&ColumnTypes>) -> ModelResult<(String, Vec<Value>)> {
        let mut writer = SqlWriter::with_casts(casts);
        self.write_select(&mut writer)?;
        Ok(writer.finish())
    }

    fn count_statement(&self, casts: Option<&ColumnTypes>) -> ModelResult<(String, Vec<Value>)> {
        let mut writer = SqlWriter::with_casts(casts);
        writer.push("SELECT COUNT(*) FROM ");
        writer.push_ident(self.require_table()?)?;
        self.write_where(&mut writer)?;
        Ok(writer.finish())
    }

    fn delete_statement(&self, casts: Option<&ColumnTypes>) -> ModelResult<(String, Vec<Value>)> {
        let mut writer = SqlWriter::with_casts(casts);
        writer.push("DELETE FROM ");
        writer.push_ident(self.require_table()?)?;
        self.write_where(&mut writer)?;
        Ok(writer.finish())
    }

    fn increment_statement(
        &self,
        column: &str,
        step: i64,
        casts: Option<&ColumnTypes>,
    ) -> ModelResult<(String, Vec<Value>)> {
        let mut writer = SqlWriter::with_casts(casts);
        writer.push("UPDATE ");
        writer.push_ident(self.require_table()?)?;
        writer.push(" SET ");
        writer.push_ident(column)?;
        writer.push(" = ");
        writer.push_ident(column)?;
        writer.push(" + ");
        writer.push_value(&Value::from(step));
        self.write_where(&mut writer)?;
        Ok(writer.finish())
    }

    fn require_table(&self) -> ModelResult<&str> {
        if self.from_table.is_empty() {
            return Err(ModelError::Query("Query has no table".to_string()));
        }
        Ok(&self.from_table)
    }

    fn write_select(&self, writer: &mut SqlWriter<'_>) -> ModelResult<()> {
        writer.push("SELECT ");
        if self.selects_all() {
            writer.push("*");
        } else {
            for (i, field) in self.select_fields.iter().enumerate() {
                if i > 0 {
                    writer.push(", ");
                }
                writer.push_ident(field)?;
            }
        }

        writer.push(" FROM ");
        writer.push_ident(self.require_table()?)?;
        self.write_where(writer)?;

        if !self.order_by.is_empty() {
            writer.push(" ORDER BY ");
            for (i, (column, direction)) in self.order_by.iter().enumerate() {
                if i > 0 {
                    writer.push(", ");
                }
                writer.push_ident(column)?;
                writer.push(&format!(" {}", direction));
            }
        }

        if let Some(limit) = self.limit_count {
            writer.push(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset_value {
            writer.push(&format!(" OFFSET {}", offset));
        }
        Ok(())
    }

    fn write_where(&self, writer: &mut SqlWriter<'_>) -> ModelResult<()> {
        if self.where_conditions.is_empty() {
            return Ok(());
        }

        writer.push(" WHERE ");
        for (i, condition) in self.where_conditions.iter().enumerate() {
            if i > 0 {
                writer.push(" AND ");
            }
            write_condition(writer, condition)?;
        }
        Ok(())
    }
}

fn write_condition(writer: &mut SqlWriter<'_>, condition: &WhereCondition) -> ModelResult<()> {
    match condition.operator {
        QueryOperator::In | QueryOperator::NotIn => {
            if condition.values.is_empty() {
                // An empty IN list matches nothing; an empty NOT IN matches everything
                writer.push(if condition.operator == QueryOperator::In {
                    "1 = 0"
                } else {
                    "1 = 1"
                });
                return Ok(());
            }
            writer.push_ident(&condition.column)?;
            writer.push(&format!(" {} (", condition.operator));
            for (j, value) in condition.values.iter().enumerate() {
                if j > 0 {
                    writer.push(", ");
                }
                writer.push_operand(&condition.column, value);
            }
            writer.push(")");
        }
        QueryOperator::Between => {
            let [start, end] = condition.values.as_slice() else {
                return Err(ModelError::Query(format!(
                    "BETWEEN on '{}' needs exactly two values",
                    condition.column
                )));
            };
            writer.push_ident(&condition.column)?;
            writer.push(" BETWEEN ");
            writer.push_operand(&condition.column, start);
            writer.push(" AND ");
            writer.push_operand(&condition.column, end);
        }
        QueryOperator::IsNull | QueryOperator::IsNotNull => {
            writer.push_ident(&condition.column)?;
            writer.push(&format!(" {}", condition.operator));
        }
        QueryOperator::Equal | QueryOperator::NotEqual
            if matches!(condition.value, None | Some(Value::Null)) =>
        {
            writer.push_ident(&condition.column)?;
            writer.push(if condition.operator == QueryOperator::Equal {
                " IS NULL"
            } else {
                " IS NOT NULL"
            });
        }
        _ => {
            let value = condition.value.as_ref().ok_or_else(|| {
                ModelError::Query(format!(
                    "Condition on '{}' with {} has no value",
                    condition.column, condition.operator
                ))
            })?;
            writer.push_ident(&condition.column)?;
            writer.push(&format!(" {} ", condition.operator));
            if matches!(condition.operator, QueryOperator::Like | QueryOperator::NotLike) {
                writer.push_value(value);
            } else {
                writer.push_operand(&condition.column, value);
            }
        }
    }
    Ok(())
}

/// Format a value for inline SQL
pub(crate) fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\'', "''")), // Escape single quotes
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "NULL".to_string(),
        other => format!("'{}'", other.to_string().replace('\'', "''")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_basic_select_query() {
        let query = QueryBuilder::table("users");
        assert_eq!(query.to_sql().unwrap(), "SELECT * FROM \"users\"");
    }

    #[test]
    fn test_select_with_conditions_order_and_limit() {
        let query = QueryBuilder::table("users")
            .select("id, name")
            .where_eq("status", "active")
            .where_gt("age", 18)
            .order_by_desc("id")
            .limit(10)
            .offset(20);

        let (sql, params) = query.to_sql_with_params().unwrap();
        assert_eq!(
            sql,
            "SELECT \"id\", \"name\" FROM \"users\" WHERE \"status\" = $1 AND \"age\" > $2 \
             ORDER BY \"id\" DESC LIMIT 10 OFFSET 20"
        );
        assert_eq!(params, vec![json!("active"), json!(18)]);
    }

    #[test]
    fn test_inline_rendering_escapes_quotes() {
        let query = QueryBuilder::table("users").where_eq("name", "O'Brien");
        assert_eq!(
            query.to_sql().unwrap(),
            "SELECT * FROM \"users\" WHERE \"name\" = 'O''Brien'"
        );
    }

    #[test]
    fn test_list_operators() {
        let query = QueryBuilder::table("users")
            .where_in("role", vec!["admin", "editor"])
            .where_between("age", 18, 65)
            .where_not_null("email")
            .where_in("id", Vec::<i64>::new());

        let (sql, params) = query.to_sql_with_params().unwrap();
        assert!(sql.contains("\"role\" IN ($1, $2)"));
        assert!(sql.contains("\"age\" BETWEEN $3 AND $4"));
        assert!(sql.contains("\"email\" IS NOT NULL"));
        assert!(sql.ends_with("1 = 0"));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_null_equality_becomes_is_null() {
        let query = QueryBuilder::table("users").where_eq("deleted_at", Value::Null);
        assert_eq!(
            query.to_sql().unwrap(),
            "SELECT * FROM \"users\" WHERE \"deleted_at\" IS NULL"
        );
    }

    #[test]
    fn test_dml_statements() {
        let query = QueryBuilder::table("posts").where_eq("id", 7);

        let (sql, params) = query.to_delete_sql_with_params().unwrap();
        assert_eq!(sql, "DELETE FROM \"posts\" WHERE \"id\" = $1");
        assert_eq!(params, vec![json!(7)]);

        let (sql, params) = query.to_increment_sql_with_params("views", 2).unwrap();
        assert_eq!(
            sql,
            "UPDATE \"posts\" SET \"views\" = \"views\" + $1 WHERE \"id\" = $2"
        );
        assert_eq!(params, vec![json!(2), json!(7)]);

        let (sql, _) = query.to_count_sql_with_params().unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM \"posts\" WHERE \"id\" = $1");
    }

    #[test]
    fn test_string_operands_cast_to_column_type() {
        let casts: ColumnTypes = [
            ("id", "bigint"),
            ("active", "boolean"),
            ("name", "character varying(255)"),
        ]
        .into_iter()
        .map(|(column, sql_type)| (column.to_string(), sql_type.to_string()))
        .collect();

        let query = QueryBuilder::table("users")
            .where_eq("users.id", "1")
            .where_eq("active", "1")
            .where_eq("name", "Ada")
            .where_like("name", "A%")
            .where_gt("id", 3)
            .where_in("id", vec!["4", "5"]);

        let (sql, params) = query.to_sql_with_casts(&casts).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM \"users\" WHERE \"users\".\"id\" = $1::bigint AND \"active\" = $2::boolean \
             AND \"name\" = $3 AND \"name\" LIKE $4 AND \"id\" > $5 AND \"id\" IN ($6::bigint, $7::bigint)"
        );
        assert_eq!(params.len(), 7);

        let (sql, _) = query.to_count_sql_with_casts(&casts).unwrap();
        assert!(sql.starts_with("SELECT COUNT(*) FROM \"users\" WHERE \"users\".\"id\" = $1::bigint"));

        let (sql, _) = query.to_increment_sql_with_casts("hits", 1, &casts).unwrap();
        assert!(sql.contains("+ $1 WHERE \"users\".\"id\" = $2::bigint"));

        // Without column types nothing is cast
        let (sql, _) = query.to_sql_with_params().unwrap();
        assert!(!sql.contains("::"));
    }

    #[test]
    fn test_missing_table_is_an_error() {
        assert!(QueryBuilder::new().to_sql().is_err());
    }
}

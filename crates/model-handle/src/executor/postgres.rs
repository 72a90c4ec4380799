//! PostgreSQL executor
//!
//! Runs the parameterized SQL generated by [`QueryBuilder`] through a sqlx
//! pool. SELECTs are wrapped in `row_to_json` so rows come back as JSON
//! objects regardless of column types.
//!
//! Column types are read from `pg_attribute` once per table and used to
//! cast string operands, since request parameters always arrive as text.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions};
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};

use super::QueryExecutor;
use crate::config::{HandleConfig, PoolConfig};
use crate::error::{ModelError, ModelResult};
use crate::query::sql_generation::ColumnTypes;
use crate::query::QueryBuilder;
use crate::record::Record;
use crate::security::escape_identifier;

const COLUMN_TYPES_SQL: &str = "SELECT a.attname::text, format_type(a.atttypid, a.atttypmod) \
     FROM pg_attribute a \
     WHERE a.attrelid = to_regclass($1) AND a.attnum > 0 AND NOT a.attisdropped";

#[derive(Debug, Clone)]
pub struct PostgresExecutor {
    pool: PgPool,
    column_types: Arc<DashMap<String, Arc<ColumnTypes>>>,
}

impl PostgresExecutor {
    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            column_types: Arc::new(DashMap::new()),
        }
    }

    /// Connect using `DATABASE_URL` and the pool settings from `config`
    pub async fn connect(config: &HandleConfig) -> ModelResult<Self> {
        let url = config.require_database_url()?;
        Self::connect_with(url, &config.pool).await
    }

    pub async fn connect_with(database_url: &str, config: &PoolConfig) -> ModelResult<Self> {
        if !database_url.starts_with("postgresql://") && !database_url.starts_with("postgres://") {
            return Err(ModelError::Configuration(
                "Invalid PostgreSQL URL scheme".to_string(),
            ));
        }

        let mut options = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout_duration())
            .test_before_acquire(config.test_before_acquire);

        if let Some(idle_timeout) = config.idle_timeout {
            options = options.idle_timeout(std::time::Duration::from_secs(idle_timeout));
        }
        if let Some(max_lifetime) = config.max_lifetime {
            options = options.max_lifetime(std::time::Duration::from_secs(max_lifetime));
        }

        let pool = options.connect(database_url).await.map_err(|e| {
            tracing::error!("Failed to create PostgreSQL pool: {}", e);
            ModelError::Connection(format!("Failed to create PostgreSQL pool: {}", e))
        })?;

        tracing::debug!(
            "PostgreSQL pool ready (max: {}, min: {})",
            config.max_connections,
            config.min_connections
        );
        Ok(Self::from_pool(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Drop cached column types, e.g. after a schema change
    pub fn clear_column_types(&self) {
        self.column_types.clear();
    }

    /// Column types of `table`, loaded from the catalog on first use. A table
    /// the catalog does not know gives an empty map and is not cached.
    async fn column_types(&self, table: &str) -> ModelResult<Arc<ColumnTypes>> {
        if let Some(types) = self.column_types.get(table) {
            return Ok(types.clone());
        }

        let rows = sqlx::query(COLUMN_TYPES_SQL)
            .bind(escape_identifier(table))
            .fetch_all(&self.pool)
            .await?;
        let mut types = ColumnTypes::new();
        for row in &rows {
            types.insert(row.try_get::<String, _>(0)?, row.try_get::<String, _>(1)?);
        }

        let types = Arc::new(types);
        if !types.is_empty() {
            tracing::debug!("Loaded {} column type(s) for {}", types.len(), table);
            self.column_types.insert(table.to_string(), types.clone());
        }
        Ok(types)
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> ModelResult<u64> {
        tracing::debug!("Executing: {}", sql);
        let result = bind_all(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    async fn fetch_all(&self, query: &QueryBuilder) -> ModelResult<Vec<Record>> {
        let types = self.column_types(query.table_name()).await?;
        let (sql, params) = query.to_sql_with_casts(&types)?;
        let wrapped = format!("SELECT row_to_json(q)::jsonb FROM ({}) AS q", sql);
        tracing::debug!("Fetching: {}", sql);

        let rows = bind_all(sqlx::query(&wrapped), &params)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let sqlx::types::Json(value) = row.try_get::<sqlx::types::Json<Value>, _>(0)?;
                Record::try_from(value)
            })
            .collect()
    }

    async fn count(&self, query: &QueryBuilder) -> ModelResult<u64> {
        let types = self.column_types(query.table_name()).await?;
        let (sql, params) = query.to_count_sql_with_casts(&types)?;
        tracing::debug!("Counting: {}", sql);

        let row = bind_all(sqlx::query(&sql), &params)
            .fetch_one(&self.pool)
            .await?;
        let count: i64 = row.try_get(0)?;
        u64::try_from(count).map_err(|_| ModelError::Database(format!("Negative count {}", count)))
    }

    async fn delete(&self, query: &QueryBuilder) -> ModelResult<u64> {
        let types = self.column_types(query.table_name()).await?;
        let (sql, params) = query.to_delete_sql_with_casts(&types)?;
        self.execute(&sql, &params).await
    }

    async fn increment(&self, query: &QueryBuilder, column: &str, step: i64) -> ModelResult<u64> {
        let types = self.column_types(query.table_name()).await?;
        let (sql, params) = query.to_increment_sql_with_casts(column, step, &types)?;
        self.execute(&sql, &params).await
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[Value],
) -> Query<'q, Postgres, PgArguments> {
    for value in params {
        query = bind_json_value(query, value);
    }
    query
}

fn bind_json_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else if let Some(f) = n.as_f64() {
                query.bind(f)
            } else {
                query.bind(n.to_string())
            }
        }
        Value::String(s) => query.bind(s.clone()),
        // For complex JSON types, bind as JSONB
        Value::Array(_) | Value::Object(_) => query.bind(sqlx::types::Json(value.clone())),
    }
}

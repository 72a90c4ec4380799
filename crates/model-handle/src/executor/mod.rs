//! Query executors
//!
//! An executor is the persistent-entity accessor behind a model reference:
//! it runs built queries against some storage and reports rows or affected
//! row counts. The handle never talks to storage any other way.

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::ModelResult;
use crate::query::QueryBuilder;
use crate::record::Record;

pub mod memory;
pub mod postgres;

pub use memory::MemoryExecutor;
pub use postgres::PostgresExecutor;

/// Runs built queries against a storage backend
#[async_trait]
pub trait QueryExecutor: Send + Sync + Debug {
    /// Rows matching the query, honoring selection, ordering and window.
    /// Relations listed on the query are attached by the caller.
    async fn fetch_all(&self, query: &QueryBuilder) -> ModelResult<Vec<Record>>;

    /// First row matching the query
    async fn fetch_optional(&self, query: &QueryBuilder) -> ModelResult<Option<Record>> {
        let mut rows = self.fetch_all(&query.clone().limit(1)).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    /// Number of rows matching the query's predicates
    async fn count(&self, query: &QueryBuilder) -> ModelResult<u64>;

    /// Delete rows matching the query's predicates; returns rows affected
    async fn delete(&self, query: &QueryBuilder) -> ModelResult<u64>;

    /// Add `step` to `column` on rows matching the query's predicates;
    /// returns rows affected
    async fn increment(&self, query: &QueryBuilder, column: &str, step: i64) -> ModelResult<u64>;
}

//! # model-handle: generic CRUD helper over a model reference
//!
//! A [`ModelHandle`] wraps one model reference and composes filtered,
//! ordered, field-projected queries against it: list, column extraction,
//! pagination, single-record lookup, counting, deletion, uniqueness checks
//! and numeric increments. Request-driven filters accumulate on the model's
//! scope through [`ModelHandle::when`].
//!
//! Queries are described by [`QueryBuilder`] and executed by a
//! [`QueryExecutor`]: [`PostgresExecutor`] for a real database and
//! [`MemoryExecutor`] for tests.

pub mod conditions;
pub mod config;
pub mod error;
pub mod executor;
pub mod handle;
pub mod model;
pub mod pagination;
pub mod params;
pub mod query;
pub mod record;
pub mod registry;
pub mod relations;
pub mod security;

// Re-export core traits and types
pub use conditions::{Conditions, Fields, Ordering};
pub use config::{HandleConfig, PoolConfig, DEFAULT_PAGE_SIZE};
pub use error::{ModelError, ModelResult};
pub use executor::{MemoryExecutor, PostgresExecutor, QueryExecutor};
pub use handle::ModelHandle;
pub use model::{Model, ModelDefinition, ModelRef};
pub use pagination::{PageRequest, Paginator};
pub use params::{ParamSource, RequestParams};
pub use query::{OrderDirection, QueryBuilder, QueryOperator, WhereCondition};
pub use record::{ColumnValues, Record};
pub use registry::ModelRegistry;
pub use relations::{Relation, RelationKind};

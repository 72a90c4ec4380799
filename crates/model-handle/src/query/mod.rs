//! Query Builder Module - fluent builder for the queries a handle composes

pub mod builder;
pub mod conditional;
pub mod ordering;
pub mod pagination;
pub mod select;
pub mod sql_generation;
pub mod types;
pub mod where_clause;

pub use builder::QueryBuilder;
pub use types::{OrderDirection, QueryOperator, WhereCondition};

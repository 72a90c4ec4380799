//! Models and model references
//!
//! A [`ModelDefinition`] describes an entity (table, primary key,
//! relations). A [`ModelRef`] pairs a definition with the executor that
//! reaches its storage and with the scope query accumulated so far.

use std::fmt::Debug;
use std::sync::Arc;

use serde::Deserialize;

use crate::executor::QueryExecutor;
use crate::query::QueryBuilder;
use crate::relations::Relation;

/// Static metadata for a typed model
pub trait Model: Send + Sync + Debug + for<'de> Deserialize<'de> {
    /// Name used to look the model up in a registry
    fn model_name() -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Table name for this model
    fn table_name() -> &'static str;

    /// Primary key field name
    fn primary_key_name() -> &'static str {
        "id"
    }

    /// Relations that may be eager loaded
    fn relations() -> Vec<Relation> {
        Vec::new()
    }

    fn definition() -> ModelDefinition
    where
        Self: Sized,
    {
        Self::relations().into_iter().fold(
            ModelDefinition::new(Self::model_name(), Self::table_name())
                .primary_key(Self::primary_key_name()),
            ModelDefinition::relation,
        )
    }
}

/// Runtime description of an entity type
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDefinition {
    name: String,
    table: String,
    primary_key: String,
    relations: Vec<Relation>,
}

impl ModelDefinition {
    pub fn new(name: &str, table: &str) -> Self {
        Self {
            name: name.to_string(),
            table: table.to_string(),
            primary_key: "id".to_string(),
            relations: Vec::new(),
        }
    }

    pub fn primary_key(mut self, primary_key: &str) -> Self {
        self.primary_key = primary_key.to_string();
        self
    }

    /// Add a relation, replacing any existing relation with the same name
    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.retain(|r| r.name != relation.name);
        self.relations.push(relation);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn primary_key_name(&self) -> &str {
        &self.primary_key
    }

    pub fn find_relation(&self, name: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.name == name)
    }

    pub fn relations(&self) -> &[Relation] {
        &self.relations
    }
}

/// Handle to a persistent entity: definition, executor and scope
#[derive(Debug, Clone)]
pub struct ModelRef {
    definition: Arc<ModelDefinition>,
    executor: Arc<dyn QueryExecutor>,
    scope: QueryBuilder,
}

impl ModelRef {
    pub fn new(definition: ModelDefinition, executor: Arc<dyn QueryExecutor>) -> Self {
        let scope = QueryBuilder::table(definition.table_name());
        Self {
            definition: Arc::new(definition),
            executor,
            scope,
        }
    }

    /// Reference for a typed model
    pub fn of<M: Model>(executor: Arc<dyn QueryExecutor>) -> Self {
        Self::new(M::definition(), executor)
    }

    pub fn definition(&self) -> &ModelDefinition {
        &self.definition
    }

    pub fn executor(&self) -> &Arc<dyn QueryExecutor> {
        &self.executor
    }

    pub fn table_name(&self) -> &str {
        self.definition.table_name()
    }

    pub fn primary_key_name(&self) -> &str {
        self.definition.primary_key_name()
    }

    /// The accumulated scope query
    pub fn scope(&self) -> &QueryBuilder {
        &self.scope
    }

    /// Whether any predicate has been added to the scope
    pub fn has_scope(&self) -> bool {
        self.scope.has_conditions()
    }

    /// A fresh query starting from the scope
    pub fn query(&self) -> QueryBuilder {
        self.scope.clone()
    }

    /// Return a reference whose scope is `f` applied to the current one
    pub fn scoped<F>(mut self, f: F) -> Self
    where
        F: FnOnce(QueryBuilder) -> QueryBuilder,
    {
        self.scope = f(self.scope);
        self
    }
}

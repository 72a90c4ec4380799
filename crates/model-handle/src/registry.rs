//! Model registry - resolves model type names to definitions

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ModelError, ModelResult};
use crate::executor::QueryExecutor;
use crate::model::{Model, ModelDefinition, ModelRef};

/// Name-indexed set of model definitions
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: HashMap<String, ModelDefinition>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under its own name, replacing any previous one
    pub fn register(&mut self, definition: ModelDefinition) -> &mut Self {
        tracing::debug!("Registering model '{}' (table: {})", definition.name(), definition.table_name());
        self.models.insert(definition.name().to_string(), definition);
        self
    }

    /// Register a typed model under [`Model::model_name`]
    pub fn register_model<M: Model>(&mut self) -> &mut Self {
        self.register(M::definition())
    }

    pub fn get(&self, name: &str) -> ModelResult<&ModelDefinition> {
        self.models
            .get(name)
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Build a model reference for the named type
    pub fn instantiate(&self, name: &str, executor: Arc<dyn QueryExecutor>) -> ModelResult<ModelRef> {
        let definition = self.get(name)?.clone();
        Ok(ModelRef::new(definition, executor))
    }
}

//! Rows returned by executors and the shapes derived from them

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::conditions::Fields;
use crate::error::{ModelError, ModelResult};

/// One row, as a JSON object keyed by column name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    pub fn insert(&mut self, column: &str, value: Value) -> Option<Value> {
        self.0.insert(column.to_string(), value)
    }

    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.0.remove(column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keep only the selected columns
    pub fn project(&self, fields: &Fields) -> Record {
        match fields {
            Fields::All => self.clone(),
            Fields::Columns(columns) => Record(
                columns
                    .iter()
                    .filter_map(|c| self.0.get(c).map(|v| (c.clone(), v.clone())))
                    .collect(),
            ),
        }
    }

    /// Deserialize the row into a typed model
    pub fn into_model<T: DeserializeOwned>(self) -> ModelResult<T> {
        serde_json::from_value(Value::Object(self.0)).map_err(|e| {
            ModelError::Serialization(format!("Failed to deserialize record: {}", e))
        })
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Record(map)
    }
}

impl TryFrom<Value> for Record {
    type Error = ModelError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Record(map)),
            other => Err(ModelError::Serialization(format!(
                "Expected a JSON object for a record, got {}",
                other
            ))),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        Value::Object(record.0)
    }
}

/// Key used when indexing values by another column
pub(crate) fn key_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Result of a column extraction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ColumnValues {
    /// One value per record, in query order
    List(Vec<Value>),
    /// Values indexed by the key column, in first-seen order; a repeated
    /// key keeps its position and takes the later value
    Keyed(IndexMap<String, Value>),
}

impl ColumnValues {
    pub(crate) fn keyed<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let mut entries = IndexMap::new();
        for (key, value) in pairs {
            entries.insert(key, value);
        }
        ColumnValues::Keyed(entries)
    }

    pub fn len(&self) -> usize {
        match self {
            ColumnValues::List(values) => values.len(),
            ColumnValues::Keyed(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value stored under `key` (keyed extraction only)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            ColumnValues::List(_) => None,
            ColumnValues::Keyed(entries) => entries.get(key),
        }
    }

    /// All values, dropping keys
    pub fn values(&self) -> Vec<&Value> {
        match self {
            ColumnValues::List(values) => values.iter().collect(),
            ColumnValues::Keyed(entries) => entries.values().collect(),
        }
    }

    /// Keyed entries, with list positions as keys for sequential results
    pub fn into_map(self) -> IndexMap<String, Value> {
        match self {
            ColumnValues::List(values) => values
                .into_iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v))
                .collect(),
            ColumnValues::Keyed(entries) => entries,
        }
    }
}

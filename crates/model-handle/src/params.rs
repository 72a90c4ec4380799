//! Request parameter sources
//!
//! `when` filters read their values through [`ParamSource`] instead of any
//! ambient request state. JSON `null` is treated the same as a missing key.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{ModelError, ModelResult};

/// Key to value lookup for request parameters
pub trait ParamSource {
    /// The value for `name`, or `None` when absent
    fn param(&self, name: &str) -> Option<Value>;
}

impl<T: ParamSource + ?Sized> ParamSource for &T {
    fn param(&self, name: &str) -> Option<Value> {
        (**self).param(name)
    }
}

impl ParamSource for HashMap<String, Value> {
    fn param(&self, name: &str) -> Option<Value> {
        self.get(name).filter(|v| !v.is_null()).cloned()
    }
}

impl ParamSource for HashMap<String, String> {
    fn param(&self, name: &str) -> Option<Value> {
        self.get(name).map(|v| Value::String(v.clone()))
    }
}

impl ParamSource for Map<String, Value> {
    fn param(&self, name: &str) -> Option<Value> {
        self.get(name).filter(|v| !v.is_null()).cloned()
    }
}

impl ParamSource for Value {
    fn param(&self, name: &str) -> Option<Value> {
        self.as_object().and_then(|object| object.param(name))
    }
}

/// Parameters of one request, usually parsed from its query string
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    params: HashMap<String, Value>,
}

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a URL query string (`a=1&b=two`, leading `?` allowed).
    /// A repeated key keeps its last value.
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let params = url::form_urlencoded::parse(query.as_bytes())
            .map(|(key, value)| (key.into_owned(), Value::String(value.into_owned())))
            .collect();
        Self { params }
    }

    /// Parse the query string of a full URL
    pub fn from_url(url: &str) -> ModelResult<Self> {
        let parsed = url::Url::parse(url)
            .map_err(|e| ModelError::Query(format!("Invalid request URL '{}': {}", url, e)))?;
        Ok(Self::from_query(parsed.query().unwrap_or_default()))
    }

    pub fn insert<T: Into<Value>>(mut self, name: &str, value: T) -> Self {
        self.params.insert(name.to_string(), value.into());
        self
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl ParamSource for RequestParams {
    fn param(&self, name: &str) -> Option<Value> {
        self.params.param(name)
    }
}

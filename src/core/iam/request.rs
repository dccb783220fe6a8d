//! Authorization requests and their contextual metadata

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Contextual metadata value consumed by conditions
///
/// `Null` keeps documents with explicit nulls loadable; no bundled
/// condition accepts it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

/// Metadata carrier keyed by condition name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestMetadata(HashMap<String, Value>);

impl RequestMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Look up a value; missing keys resolve to `None`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for RequestMetadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RequestMetadata(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// A single access request: who (role) wants to do what (action) to which
/// resource, within which scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub role: String,
    pub action: String,
    pub resource: String,
    pub scope: String,
    #[serde(default)]
    pub metadata: RequestMetadata,
}

impl Request {
    /// Create a request without metadata
    ///
    /// # Examples
    /// ```
    /// use gatekeeper::Request;
    ///
    /// let req = Request::new("admin", "read", "doc1", "default")
    ///     .with_metadata("remote_ip", "10.0.0.5");
    /// assert_eq!(req.metadata.get("remote_ip").and_then(|v| v.as_str()), Some("10.0.0.5"));
    /// ```
    pub fn new(
        role: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Request {
            role: role.into(),
            action: action.into(),
            resource: resource.into(),
            scope: scope.into(),
            metadata: RequestMetadata::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key, value);
        self
    }
}

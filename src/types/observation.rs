//! Observation data structures for route/play matchups

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A single attribute value of an observation.
///
/// Rows arrive loosely typed (JSON lines, CSV exports), so every value is
/// tagged with the shape it was received in and resolved explicitly later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    /// Numeric value (including pre-encoded route codes)
    Number(f64),
    /// Boolean flag, coerced to 1.0 / 0.0
    Flag(bool),
    /// String value (route labels such as "SLANT")
    Label(String),
    /// Explicit null / missing cell
    Missing,
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Number(n) => write!(f, "{}", n),
            FeatureValue::Flag(b) => write!(f, "{}", b),
            FeatureValue::Label(s) => write!(f, "{:?}", s),
            FeatureValue::Missing => write!(f, "null"),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Number(value)
    }
}

impl From<i64> for FeatureValue {
    fn from(value: i64) -> Self {
        FeatureValue::Number(value as f64)
    }
}

impl From<bool> for FeatureValue {
    fn from(value: bool) -> Self {
        FeatureValue::Flag(value)
    }
}

impl From<&str> for FeatureValue {
    fn from(value: &str) -> Self {
        FeatureValue::Label(value.to_string())
    }
}

impl From<String> for FeatureValue {
    fn from(value: String) -> Self {
        FeatureValue::Label(value)
    }
}

impl<T: Into<FeatureValue>> From<Option<T>> for FeatureValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FeatureValue::Missing)
    }
}

/// One row of input data: a single route/play matchup.
///
/// May carry more attributes than the model needs; only the names listed in
/// the feature order are ever read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Observation {
    values: HashMap<String, FeatureValue>,
}

impl Observation {
    /// Create an empty observation
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FeatureValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set an attribute, replacing any previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FeatureValue>) {
        self.values.insert(name.into(), value.into());
    }

    /// Remove an attribute
    pub fn remove(&mut self, name: &str) -> Option<FeatureValue> {
        self.values.remove(name)
    }

    /// Look up an attribute by name
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Route label if the route attribute is still a string
    pub fn route_label(&self) -> Option<&str> {
        match self.values.get(super::ROUTE_ATTRIBUTE) {
            Some(FeatureValue::Label(label)) => Some(label.as_str()),
            _ => None,
        }
    }

    /// Play identifier, if the row carries one
    pub fn play_id(&self) -> Option<String> {
        match self.values.get("play_id")? {
            FeatureValue::Label(id) => Some(id.clone()),
            FeatureValue::Number(n) if n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            FeatureValue::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl<K, V> FromIterator<(K, V)> for Observation
where
    K: Into<String>,
    V: Into<FeatureValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

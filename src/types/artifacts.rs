//! Feature-order and label-mapping artifacts

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Key of the fallback entry in the route label mapping
pub const FALLBACK_LABEL: &str = "undefined";

/// Ordered feature names the model was trained with.
///
/// Position is load-bearing: the scorer only sees column indices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureOrder {
    names: Vec<String>,
}

impl FeatureOrder {
    /// Validate and wrap a list of feature names.
    ///
    /// The list must be non-empty and free of duplicates.
    pub fn new(names: Vec<String>) -> std::result::Result<Self, String> {
        if names.is_empty() {
            return Err("feature order is empty".to_string());
        }

        let mut seen = HashSet::with_capacity(names.len());
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(format!("duplicate feature name {:?}", name));
            }
        }

        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Column index of a feature
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl TryFrom<Vec<String>> for FeatureOrder {
    type Error = String;

    fn try_from(names: Vec<String>) -> std::result::Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<FeatureOrder> for Vec<String> {
    fn from(order: FeatureOrder) -> Self {
        order.names
    }
}

/// Route name to integer code, as used when the model was trained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelMapping {
    codes: BTreeMap<String, u32>,
}

impl LabelMapping {
    pub fn new(codes: BTreeMap<String, u32>) -> Self {
        Self { codes }
    }

    /// Code of a known label
    pub fn code(&self, label: &str) -> Option<u32> {
        self.codes.get(label).copied()
    }

    /// Code reserved for unrecognised labels
    pub fn fallback_code(&self) -> Option<u32> {
        self.code(FALLBACK_LABEL)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.codes.contains_key(label)
    }

    /// Encode a route label, substituting the fallback code for unknown labels.
    pub fn encode(&self, label: &str) -> Result<u32> {
        self.code(label)
            .or_else(|| self.fallback_code())
            .ok_or_else(|| PipelineError::UnknownRouteLabel {
                label: label.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Iterate over (label, code) pairs in label order
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.codes.iter().map(|(k, &v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, u32)> for LabelMapping {
    fn from_iter<I: IntoIterator<Item = (K, u32)>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_order_rejects_duplicates() {
        let parsed: std::result::Result<FeatureOrder, _> =
            serde_json::from_str(r#"["route", "yards_to_go", "route"]"#);
        assert!(parsed.is_err());

        let parsed: std::result::Result<FeatureOrder, _> = serde_json::from_str("[]");
        assert!(parsed.is_err());
    }

    #[test]
    fn test_feature_order_keeps_position() {
        let order: FeatureOrder =
            serde_json::from_str(r#"["yards_to_go", "route", "defender_separation"]"#).unwrap();
        assert_eq!(order.len(), 3);
        assert_eq!(order.position("route"), Some(1));
        assert_eq!(order.position("air_yards"), None);
    }

    #[test]
    fn test_label_mapping_fallback() {
        let mapping: LabelMapping =
            serde_json::from_str(r#"{"SLANT": 0, "GO": 1, "undefined": 2}"#).unwrap();

        assert_eq!(mapping.encode("GO").unwrap(), 1);
        assert_eq!(mapping.encode("WHEEL").unwrap(), 2);
        assert_eq!(mapping.fallback_code(), Some(2));
    }

    #[test]
    fn test_label_mapping_without_fallback() {
        let mapping: LabelMapping = vec![("SLANT", 0), ("GO", 1)].into_iter().collect();

        assert_eq!(mapping.encode("SLANT").unwrap(), 0);
        match mapping.encode("WHEEL") {
            Err(PipelineError::UnknownRouteLabel { label }) => assert_eq!(label, "WHEEL"),
            other => panic!("expected UnknownRouteLabel, got {:?}", other),
        }
    }

    #[test]
    fn test_label_mapping_rejects_negative_codes() {
        let parsed: std::result::Result<LabelMapping, _> =
            serde_json::from_str(r#"{"SLANT": -1}"#);
        assert!(parsed.is_err());
    }
}

//! Feature resolution for catch-probability model inference.
//!
//! Turns a loosely-typed observation into the exact column order and
//! encoding the route model was trained with.

use crate::error::{PipelineError, Result};
use crate::types::{FeatureOrder, FeatureValue, LabelMapping, Observation, ROUTE_ATTRIBUTE};
use tracing::{debug, warn};

/// Model-ready feature row.
///
/// Length and order match the feature order it was resolved against, and
/// every value is finite.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.values
    }
}

/// Wraps pre-built values, enforcing finiteness. Offending columns are
/// reported by position since no names are known here.
impl TryFrom<Vec<f32>> for FeatureVector {
    type Error = PipelineError;

    fn try_from(values: Vec<f32>) -> Result<Self> {
        if let Some((i, v)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(PipelineError::NonFiniteFeature {
                name: format!("#{}", i),
                value: v.to_string(),
            });
        }
        Ok(Self { values })
    }
}

/// Resolves observations against one feature order and label mapping.
pub struct FeatureResolver<'a> {
    feature_order: &'a FeatureOrder,
    label_mapping: &'a LabelMapping,
}

impl<'a> FeatureResolver<'a> {
    pub fn new(feature_order: &'a FeatureOrder, label_mapping: &'a LabelMapping) -> Self {
        Self {
            feature_order,
            label_mapping,
        }
    }

    /// Build the feature vector for one observation.
    ///
    /// Every ordered feature must be present before the route is encoded or
    /// any value is coerced, so an absent column is reported ahead of a bad
    /// value in another one.
    pub fn resolve(&self, observation: &Observation) -> Result<FeatureVector> {
        let raw_values = self
            .feature_order
            .iter()
            .map(|name| {
                observation
                    .get(name)
                    .map(|raw| (name, raw))
                    .ok_or_else(|| PipelineError::MissingFeature(name.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        let route_code = match observation.get(ROUTE_ATTRIBUTE) {
            Some(raw) if self.feature_order.position(ROUTE_ATTRIBUTE).is_some() => {
                Some(self.encode_route(raw)?)
            }
            _ => None,
        };

        let values = raw_values
            .into_iter()
            .map(|(name, raw)| match route_code {
                Some(code) if name == ROUTE_ATTRIBUTE => Ok(code),
                _ => coerce(name, raw),
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(features = values.len(), "Resolved observation");
        Ok(FeatureVector { values })
    }

    /// Route arrives either as a label ("SLANT") or already encoded (10).
    fn encode_route(&self, raw: &FeatureValue) -> Result<f32> {
        match raw {
            FeatureValue::Label(label) => {
                if !self.label_mapping.contains(label) {
                    warn!(route = %label, "Unmapped route label, using fallback code");
                }
                let code = self.label_mapping.encode(label)?;
                Ok(code as f32)
            }
            other => coerce(ROUTE_ATTRIBUTE, other),
        }
    }
}

/// Resolve `observation` into the column order given by `feature_order`.
pub fn resolve(
    observation: &Observation,
    feature_order: &FeatureOrder,
    label_mapping: &LabelMapping,
) -> Result<FeatureVector> {
    FeatureResolver::new(feature_order, label_mapping).resolve(observation)
}

/// Coerce a raw value to `f32`, rejecting anything that is not finite afterwards.
fn coerce(name: &str, raw: &FeatureValue) -> Result<f32> {
    let non_finite = || PipelineError::NonFiniteFeature {
        name: name.to_string(),
        value: raw.to_string(),
    };

    let value = match raw {
        FeatureValue::Number(n) => *n as f32,
        FeatureValue::Flag(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        FeatureValue::Label(s) => s.trim().parse::<f64>().map_err(|_| non_finite())? as f32,
        FeatureValue::Missing => return Err(non_finite()),
    };

    if value.is_finite() {
        Ok(value)
    } else {
        Err(non_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario() -> (FeatureOrder, LabelMapping) {
        let order = FeatureOrder::new(vec![
            "yards_to_go".to_string(),
            "route".to_string(),
            "defender_separation".to_string(),
        ])
        .unwrap();
        let mapping: LabelMapping = vec![("SLANT", 0), ("GO", 1), ("undefined", 2)]
            .into_iter()
            .collect();
        (order, mapping)
    }

    fn slant() -> Observation {
        Observation::new()
            .with("yards_to_go", 7.0)
            .with("route", "SLANT")
            .with("defender_separation", 2.3)
    }

    #[test]
    fn test_resolves_in_feature_order() {
        let (order, mapping) = scenario();
        let vector = resolve(&slant(), &order, &mapping).unwrap();

        assert_eq!(vector.as_slice(), &[7.0, 0.0, 2.3_f32]);
    }

    #[test]
    fn test_extra_attributes_are_ignored() {
        let (order, mapping) = scenario();
        let obs = slant().with("game_id", 2023091007_i64).with("receiver", "M. Andrews");

        let vector = resolve(&obs, &order, &mapping).unwrap();
        assert_eq!(vector.len(), 3);
    }

    #[test]
    fn test_unmapped_route_uses_fallback() {
        let (order, mapping) = scenario();
        let obs = slant().with("route", "WHEEL");

        let vector = resolve(&obs, &order, &mapping).unwrap();
        assert_eq!(vector.get(1), Some(2.0));
    }

    #[test]
    fn test_unmapped_route_without_fallback() {
        let (order, _) = scenario();
        let mapping: LabelMapping = vec![("SLANT", 0), ("GO", 1)].into_iter().collect();
        let obs = slant().with("route", "WHEEL");

        assert!(matches!(
            resolve(&obs, &order, &mapping),
            Err(PipelineError::UnknownRouteLabel { label }) if label == "WHEEL"
        ));
    }

    #[test]
    fn test_label_and_code_resolve_identically() {
        let (order, mapping) = scenario();
        let labelled = slant().with("route", "GO");
        let encoded = slant().with("route", 1.0);

        assert_eq!(
            resolve(&labelled, &order, &mapping).unwrap(),
            resolve(&encoded, &order, &mapping).unwrap()
        );
    }

    #[test]
    fn test_missing_feature_is_named() {
        let (order, mapping) = scenario();
        let mut obs = slant();
        obs.remove("defender_separation");

        match resolve(&obs, &order, &mapping) {
            Err(PipelineError::MissingFeature(name)) => assert_eq!(name, "defender_separation"),
            other => panic!("expected MissingFeature, got {:?}", other),
        }
    }

    #[test]
    fn test_absent_feature_reported_before_bad_value() {
        let (order, mapping) = scenario();
        let obs = Observation::new()
            .with("yards_to_go", FeatureValue::Missing)
            .with("route", "SLANT");

        match resolve(&obs, &order, &mapping) {
            Err(PipelineError::MissingFeature(name)) => assert_eq!(name, "defender_separation"),
            other => panic!("expected MissingFeature, got {:?}", other),
        }
    }

    #[test]
    fn test_absent_feature_reported_before_unknown_route() {
        let (order, _) = scenario();
        let mapping: LabelMapping = vec![("SLANT", 0), ("GO", 1)].into_iter().collect();
        let obs = Observation::new()
            .with("yards_to_go", 7.0)
            .with("route", "WHEEL");

        assert!(matches!(
            resolve(&obs, &order, &mapping),
            Err(PipelineError::MissingFeature(name)) if name == "defender_separation"
        ));
    }

    #[test]
    fn test_route_encoded_before_values_are_coerced() {
        let (order, _) = scenario();
        let mapping: LabelMapping = vec![("SLANT", 0), ("GO", 1)].into_iter().collect();
        let obs = slant()
            .with("yards_to_go", FeatureValue::Missing)
            .with("route", "WHEEL");

        assert!(matches!(
            resolve(&obs, &order, &mapping),
            Err(PipelineError::UnknownRouteLabel { label }) if label == "WHEEL"
        ));
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let (order, mapping) = scenario();
        let bad_values = [
            FeatureValue::Missing,
            FeatureValue::Number(f64::NAN),
            FeatureValue::Number(f64::INFINITY),
            // finite as f64, overflows f32
            FeatureValue::Number(1e300),
            FeatureValue::Label("n/a".to_string()),
        ];

        for bad in bad_values {
            let obs = slant().with("yards_to_go", bad.clone());
            match resolve(&obs, &order, &mapping) {
                Err(PipelineError::NonFiniteFeature { name, .. }) => {
                    assert_eq!(name, "yards_to_go")
                }
                other => panic!("expected NonFiniteFeature for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_missing_route_value_is_non_finite() {
        let (order, mapping) = scenario();
        let obs = slant().with("route", FeatureValue::Missing);

        assert!(matches!(
            resolve(&obs, &order, &mapping),
            Err(PipelineError::NonFiniteFeature { name, .. }) if name == "route"
        ));
    }

    #[test]
    fn test_numeric_strings_and_flags_coerce() {
        let (order, mapping) = scenario();
        let obs = slant()
            .with("yards_to_go", " 10 ")
            .with("defender_separation", true);

        let vector = resolve(&obs, &order, &mapping).unwrap();
        assert_eq!(vector.as_slice(), &[10.0, 0.0, 1.0]);
    }

    #[test]
    fn test_vector_from_values_checks_finiteness() {
        assert!(FeatureVector::try_from(vec![1.0, 2.0]).is_ok());
        assert!(matches!(
            FeatureVector::try_from(vec![1.0, f32::NAN]),
            Err(PipelineError::NonFiniteFeature { name, .. }) if name == "#1"
        ));
    }
}

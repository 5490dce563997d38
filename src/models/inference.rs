//! Prediction engine: runs the scorer and extracts the catch probability

use crate::error::{PipelineError, Result};
use crate::feature_resolver::FeatureVector;
use tracing::debug;

/// Index of the positive ("catch") class in a class-probability output
pub const POSITIVE_CLASS: usize = 1;

/// A trained model that maps feature rows to class-probability outputs.
///
/// The scorer knows nothing about feature names at inference time, only
/// column positions.
pub trait Scorer: Send + Sync {
    /// Number of columns each row must have, if the model declares it
    fn n_features(&self) -> Option<usize>;

    /// Feature names recorded at training time, if any
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Score a batch of rows; one output vector per row.
    ///
    /// A single-element output is the positive-class probability; longer
    /// outputs are a full class distribution.
    fn predict_proba(&self, batch: &[&[f32]]) -> anyhow::Result<Vec<Vec<f64>>>;
}

/// Score one feature vector and return the positive-class probability.
pub fn predict(model: &dyn Scorer, features: &FeatureVector) -> Result<f64> {
    if let Some(expected) = model.n_features() {
        if features.len() != expected {
            return Err(PipelineError::ScoringFailure(format!(
                "feature vector has {} values but model expects {}",
                features.len(),
                expected
            )));
        }
    }

    // Single-row batch
    let batch = [features.as_slice()];
    let outputs = model
        .predict_proba(&batch)
        .map_err(|e| PipelineError::ScoringFailure(format!("{:#}", e)))?;

    let row = match outputs.as_slice() {
        [row] => row,
        other => {
            return Err(PipelineError::ScoringFailure(format!(
                "scorer returned {} rows for a single-row batch",
                other.len()
            )))
        }
    };

    let probability = extract_positive_class(row)?;
    debug!(probability = probability, outputs = row.len(), "Scored feature vector");
    Ok(probability)
}

/// Pick the positive-class slot from one row of scorer output.
///
/// Slot selection is positional, never argmax: `[p]` yields `p`,
/// `[p0, p1, ...]` yields `p1`.
pub fn extract_positive_class(row: &[f64]) -> Result<f64> {
    let probability = match row.len() {
        0 => {
            return Err(PipelineError::ScoringFailure(
                "scorer returned an empty output row".to_string(),
            ))
        }
        1 => row[0],
        _ => row[POSITIVE_CLASS],
    };

    if !probability.is_finite() || !(0.0..=1.0).contains(&probability) {
        return Err(PipelineError::ScoringFailure(format!(
            "scorer returned {} which is not a probability in [0, 1]",
            probability
        )));
    }

    Ok(probability)
}

//! Error types for the catch-probability pipeline

use std::path::PathBuf;

/// Every failure the pipeline can surface to a caller of `predict_route_prob`.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Artifact location does not exist
    #[error("artifact not found at {}", path.display())]
    ArtifactNotFound { path: PathBuf },

    /// Artifact exists but could not be parsed into the expected structure
    #[error("artifact at {} is corrupt: {reason}", path.display())]
    ArtifactCorrupt { path: PathBuf, reason: String },

    /// Route label is unmapped and the mapping has no "undefined" fallback
    #[error("route label {label:?} is not in the label mapping and no \"undefined\" fallback is configured")]
    UnknownRouteLabel { label: String },

    /// Observation lacks an attribute named in the feature order
    #[error("observation is missing required feature {0:?}")]
    MissingFeature(String),

    /// Attribute present but not representable as a finite number
    #[error("feature {name:?} is not a finite number ({value})")]
    NonFiniteFeature { name: String, value: String },

    /// Scorer errored or produced an unusable result
    #[error("scoring failed: {0}")]
    ScoringFailure(String),
}

impl PipelineError {
    pub(crate) fn corrupt(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PipelineError::ArtifactCorrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Short, stable name of the error variant (used as a metrics key)
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::ArtifactNotFound { .. } => "artifact_not_found",
            PipelineError::ArtifactCorrupt { .. } => "artifact_corrupt",
            PipelineError::UnknownRouteLabel { .. } => "unknown_route_label",
            PipelineError::MissingFeature(_) => "missing_feature",
            PipelineError::NonFiniteFeature { .. } => "non_finite_feature",
            PipelineError::ScoringFailure(_) => "scoring_failure",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

//! Route Catch-Probability Pipeline
//!
//! Deterministic scoring of passing-route observations with a pretrained
//! gradient-boosted tree model: raw rows are resolved into the exact feature
//! order and encoding the model was trained with, then scored.

pub mod config;
pub mod error;
pub mod feature_resolver;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use feature_resolver::{resolve, FeatureResolver, FeatureVector};
pub use models::{ArtifactStore, Scorer};
pub use pipeline::{predict_route_prob, RoutePipeline};
pub use types::{CatchPrediction, FeatureOrder, FeatureValue, LabelMapping, Observation};

//! Type definitions for the catch-probability pipeline

pub mod artifacts;
pub mod observation;
pub mod prediction;

pub use artifacts::{FeatureOrder, LabelMapping, FALLBACK_LABEL};
pub use observation::{FeatureValue, Observation};
pub use prediction::CatchPrediction;

/// Name of the categorical route attribute
pub const ROUTE_ATTRIBUTE: &str = "route";

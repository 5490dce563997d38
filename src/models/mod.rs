//! Route model artifacts and inference

pub mod inference;
pub mod loader;
pub mod xgboost;

pub use inference::{predict, Scorer};
pub use loader::{get_feature_order, get_label_mapping, get_model, ArtifactPaths, ArtifactStore};
pub use xgboost::Forest;

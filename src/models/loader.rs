//! Artifact store: loads the route model, feature order and label mapping once

use crate::error::{PipelineError, Result};
use crate::models::xgboost::{Forest, XgbModel};
use crate::types::{FeatureOrder, LabelMapping, FALLBACK_LABEL};
use once_cell::sync::{Lazy, OnceCell};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

pub const MODEL_FILE: &str = "route_model.json";
pub const FEATURES_FILE: &str = "route_features.json";
pub const LABEL_MAPPING_FILE: &str = "route_label_mapping.json";

/// Locations of the three co-versioned artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub feature_order: PathBuf,
    pub label_mapping: PathBuf,
}

impl ArtifactPaths {
    /// Standard file names inside `models_dir`
    pub fn in_dir<P: AsRef<Path>>(models_dir: P) -> Self {
        let dir = models_dir.as_ref();
        Self {
            model: dir.join(MODEL_FILE),
            feature_order: dir.join(FEATURES_FILE),
            label_mapping: dir.join(LABEL_MAPPING_FILE),
        }
    }

    /// Artifacts versioned with this crate under `models/`
    pub fn bundled() -> Self {
        Self::in_dir(Path::new(env!("CARGO_MANIFEST_DIR")).join("models"))
    }
}

/// Lazily loaded, immutable artifact bundle.
///
/// Each artifact is read from storage on its first access only; later calls
/// hand out a shared reference to the cached value. Concurrent first calls
/// block on a single load.
pub struct ArtifactStore {
    paths: ArtifactPaths,
    model: OnceCell<Forest>,
    feature_order: OnceCell<FeatureOrder>,
    label_mapping: OnceCell<LabelMapping>,
}

static BUNDLED: Lazy<ArtifactStore> = Lazy::new(|| ArtifactStore::new(ArtifactPaths::bundled()));

impl ArtifactStore {
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths,
            model: OnceCell::new(),
            feature_order: OnceCell::new(),
            label_mapping: OnceCell::new(),
        }
    }

    /// Store over the standard file names inside `models_dir`
    pub fn from_dir<P: AsRef<Path>>(models_dir: P) -> Self {
        Self::new(ArtifactPaths::in_dir(models_dir))
    }

    /// Process-wide store over the bundled artifacts
    pub fn global() -> &'static ArtifactStore {
        &BUNDLED
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// Trained route model
    pub fn get_model(&self) -> Result<&Forest> {
        self.model.get_or_try_init(|| load_model(&self.paths.model))
    }

    /// Ordered feature names
    pub fn get_feature_order(&self) -> Result<&FeatureOrder> {
        self.feature_order.get_or_try_init(|| {
            let order: FeatureOrder = load_json(&self.paths.feature_order)?;
            info!(
                path = %self.paths.feature_order.display(),
                features = order.len(),
                "Feature order loaded"
            );
            Ok(order)
        })
    }

    /// Route label mapping
    pub fn get_label_mapping(&self) -> Result<&LabelMapping> {
        self.label_mapping.get_or_try_init(|| {
            let mapping: LabelMapping = load_json(&self.paths.label_mapping)?;
            if mapping.fallback_code().is_none() {
                warn!(
                    path = %self.paths.label_mapping.display(),
                    "Label mapping has no {:?} entry; unmapped routes will be rejected",
                    FALLBACK_LABEL
                );
            }
            info!(
                path = %self.paths.label_mapping.display(),
                labels = mapping.len(),
                "Route label mapping loaded"
            );
            Ok(mapping)
        })
    }

    /// Load all three artifacts up front
    pub fn preload(&self) -> Result<()> {
        self.get_model()?;
        self.get_feature_order()?;
        self.get_label_mapping()?;
        Ok(())
    }
}

/// Process-wide route model
pub fn get_model() -> Result<&'static Forest> {
    ArtifactStore::global().get_model()
}

/// Process-wide feature order
pub fn get_feature_order() -> Result<&'static FeatureOrder> {
    ArtifactStore::global().get_feature_order()
}

/// Process-wide route label mapping
pub fn get_label_mapping() -> Result<&'static LabelMapping> {
    ArtifactStore::global().get_label_mapping()
}

fn read_artifact(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(PipelineError::ArtifactNotFound {
            path: path.to_path_buf(),
        });
    }
    fs::read_to_string(path).map_err(|e| PipelineError::corrupt(path, e))
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = read_artifact(path)?;
    serde_json::from_str(&text).map_err(|e| PipelineError::corrupt(path, e))
}

fn load_model(path: &Path) -> Result<Forest> {
    let start = Instant::now();
    info!(path = %path.display(), "Loading route model");

    let document: XgbModel = load_json(path)?;
    let forest = Forest::from_model(&document).map_err(|e| PipelineError::corrupt(path, e))?;

    info!(
        path = %path.display(),
        trees = forest.n_trees(),
        objective = %forest.objective(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Route model loaded successfully"
    );
    Ok(forest)
}

//! End-to-end scoring: artifact store → feature resolver → prediction engine

use crate::error::{PipelineError, Result};
use crate::feature_resolver::{FeatureResolver, FeatureVector};
use crate::models::inference::{self, Scorer};
use crate::models::loader::ArtifactStore;
use crate::types::{CatchPrediction, FeatureOrder, Observation};
use tracing::debug;

/// Catch-probability pipeline bound to one artifact store
pub struct RoutePipeline<'a> {
    store: &'a ArtifactStore,
}

impl RoutePipeline<'static> {
    /// Pipeline over the process-wide bundled artifacts
    pub fn bundled() -> Self {
        Self::new(ArtifactStore::global())
    }
}

impl<'a> RoutePipeline<'a> {
    pub fn new(store: &'a ArtifactStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &ArtifactStore {
        self.store
    }

    /// Resolve an observation into the model's feature vector
    pub fn resolve(&self, observation: &Observation) -> Result<FeatureVector> {
        let feature_order = self.store.get_feature_order()?;
        let label_mapping = self.store.get_label_mapping()?;
        FeatureResolver::new(feature_order, label_mapping).resolve(observation)
    }

    /// Catch probability for one observation
    pub fn predict(&self, observation: &Observation) -> Result<f64> {
        let model = self.store.get_model()?;
        let feature_order = self.store.get_feature_order()?;
        ensure_co_versioned(model, feature_order)?;

        let features = self.resolve(observation)?;
        let probability = inference::predict(model, &features)?;

        debug!(
            play_id = ?observation.play_id(),
            probability = probability,
            "Observation scored"
        );
        Ok(probability)
    }

    /// Catch probability wrapped in a timestamped record
    pub fn score(&self, observation: &Observation) -> Result<CatchPrediction> {
        let probability = self.predict(observation)?;
        Ok(CatchPrediction::new(probability).with_play_details(
            observation.play_id(),
            observation.route_label().map(str::to_string),
        ))
    }

    /// Score several observations independently
    pub fn score_batch(&self, observations: &[Observation]) -> Vec<Result<CatchPrediction>> {
        observations.iter().map(|o| self.score(o)).collect()
    }
}

/// Catch probability for one observation using the bundled artifacts.
///
/// Artifacts are loaded on the first call and reused for the rest of the
/// process.
pub fn predict_route_prob(observation: &Observation) -> Result<f64> {
    RoutePipeline::bundled().predict(observation)
}

/// The model and the feature order must come from the same training run.
fn ensure_co_versioned(model: &dyn Scorer, feature_order: &FeatureOrder) -> Result<()> {
    if let Some(expected) = model.n_features() {
        if expected != feature_order.len() {
            return Err(PipelineError::ScoringFailure(format!(
                "model expects {} features but feature order lists {}",
                expected,
                feature_order.len()
            )));
        }
    }

    if let Some(names) = model.feature_names() {
        if names != feature_order.names() {
            return Err(PipelineError::ScoringFailure(format!(
                "model feature names {:?} do not match feature order {:?}",
                names,
                feature_order.names()
            )));
        }
    }

    Ok(())
}

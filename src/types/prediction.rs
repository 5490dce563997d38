//! Catch-probability prediction records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scored observation emitted by the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchPrediction {
    /// Play identifier carried over from the observation, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub play_id: Option<String>,

    /// Route label as received (before encoding)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,

    /// Positive-class ("catch") probability in [0, 1]
    pub catch_probability: f64,

    /// Scoring timestamp
    pub scored_at: DateTime<Utc>,
}

impl CatchPrediction {
    /// Create a new prediction record stamped with the current time
    pub fn new(catch_probability: f64) -> Self {
        Self {
            play_id: None,
            route: None,
            catch_probability,
            scored_at: Utc::now(),
        }
    }

    /// Attach identifying details of the scored observation
    pub fn with_play_details(mut self, play_id: Option<String>, route: Option<String>) -> Self {
        self.play_id = play_id;
        self.route = route;
        self
    }
}

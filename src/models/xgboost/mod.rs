//! XGBoost JSON model format support.
//!
//! Parses the JSON document written by `Booster.save_model("*.json")` and
//! converts it into a [`Forest`] that implements [`Scorer`](crate::models::Scorer).

mod forest;
mod json;

pub use forest::{ConversionError, Forest};
pub use json::XgbModel;

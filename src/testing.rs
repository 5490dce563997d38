//! Shared fixtures for unit tests.

use serde_json::json;
use std::fs;
use std::path::Path;

use crate::models::loader::{FEATURES_FILE, LABEL_MAPPING_FILE, MODEL_FILE};
use crate::types::Observation;

/// Two-tree binary:logistic model over
/// `["yards_to_go", "route", "defender_separation"]`.
pub(crate) fn scenario_model() -> serde_json::Value {
    json!({
        "version": [2, 0, 3],
        "learner": {
            "attributes": {},
            "feature_names": ["yards_to_go", "route", "defender_separation"],
            "feature_types": ["float", "float", "float"],
            "gradient_booster": {
                "name": "gbtree",
                "model": {
                    "gbtree_model_param": {"num_parallel_tree": "1", "num_trees": "2"},
                    "tree_info": [0, 0],
                    "trees": [
                        {
                            "id": 0,
                            "tree_param": {"num_deleted": "0", "num_feature": "3", "num_nodes": "5", "size_leaf_vector": "1"},
                            "left_children": [1, -1, 3, -1, -1],
                            "right_children": [2, -1, 4, -1, -1],
                            "parents": [2147483647, 0, 0, 2, 2],
                            "split_indices": [2, 0, 0, 0, 0],
                            "split_conditions": [1.5, -0.4, 10.0, 0.3, 0.05],
                            "split_type": [0, 0, 0, 0, 0],
                            "default_left": [1, 0, 1, 0, 0],
                            "base_weights": [0.0, -0.4, 0.2, 0.3, 0.05],
                            "loss_changes": [4.1, 0.0, 1.2, 0.0, 0.0],
                            "sum_hessian": [50.0, 20.0, 30.0, 18.0, 12.0],
                            "categories": [],
                            "categories_nodes": [],
                            "categories_segments": [],
                            "categories_sizes": []
                        },
                        {
                            "id": 1,
                            "tree_param": {"num_deleted": "0", "num_feature": "3", "num_nodes": "3", "size_leaf_vector": "1"},
                            "left_children": [1, -1, -1],
                            "right_children": [2, -1, -1],
                            "parents": [2147483647, 0, 0],
                            "split_indices": [1, 0, 0],
                            "split_conditions": [0.5, 0.2, -0.1],
                            "split_type": [0, 0, 0],
                            "default_left": [0, 0, 0],
                            "base_weights": [0.0, 0.2, -0.1],
                            "loss_changes": [0.9, 0.0, 0.0],
                            "sum_hessian": [50.0, 21.0, 29.0],
                            "categories": [],
                            "categories_nodes": [],
                            "categories_segments": [],
                            "categories_sizes": []
                        }
                    ]
                }
            },
            "learner_model_param": {
                "base_score": "5E-1",
                "boost_from_average": "1",
                "num_class": "0",
                "num_feature": "3",
                "num_target": "1"
            },
            "objective": {"name": "binary:logistic", "reg_loss_param": {"scale_pos_weight": "1"}}
        }
    })
}

/// Write the three scenario artifacts into `dir`.
pub(crate) fn write_scenario_bundle(dir: &Path) {
    fs::write(
        dir.join(FEATURES_FILE),
        r#"["yards_to_go", "route", "defender_separation"]"#,
    )
    .unwrap();
    fs::write(
        dir.join(LABEL_MAPPING_FILE),
        r#"{"SLANT": 0, "GO": 1, "undefined": 2}"#,
    )
    .unwrap();
    fs::write(dir.join(MODEL_FILE), scenario_model().to_string()).unwrap();
}

/// `{"yards_to_go": 7.0, "route": "SLANT", "defender_separation": 2.3}`
pub(crate) fn scenario_observation() -> Observation {
    Observation::new()
        .with("yards_to_go", 7.0)
        .with("route", "SLANT")
        .with("defender_separation", 2.3)
}

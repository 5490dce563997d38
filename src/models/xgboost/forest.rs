//! Compact tree ensemble converted from an XGBoost JSON document.

use super::json::{Tree as XgbTree, XgbModel};
use crate::models::inference::Scorer;
use anyhow::{bail, Result};

/// Error raised while converting an XGBoost document into a [`Forest`].
#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("tree {0} has no nodes")]
    EmptyTree(usize),
    #[error("tree {tree}: array {field} has {actual} entries, expected {expected}")]
    InconsistentArrays {
        tree: usize,
        field: &'static str,
        actual: usize,
        expected: usize,
    },
    #[error(
        "invalid node index in tree {tree}: node {node} references child {child} but tree has {num_nodes} nodes"
    )]
    InvalidNodeIndex {
        tree: usize,
        node: usize,
        child: i32,
        num_nodes: usize,
    },
    #[error("tree {tree}: node {node} splits on feature {feature} but model has {num_features} features")]
    InvalidFeatureIndex {
        tree: usize,
        node: usize,
        feature: i32,
        num_features: usize,
    },
    #[error("tree {tree}: categorical split data is out of bounds")]
    InvalidCategories { tree: usize },
    #[error("tree {tree} belongs to output group {group} but model has {num_groups} groups")]
    InvalidTreeGroup {
        tree: usize,
        group: i32,
        num_groups: usize,
    },
    #[error("dart weight_drop has {actual} entries for {expected} trees")]
    DartWeights { actual: usize, expected: usize },
    #[error("model declares {0} features")]
    InvalidFeatureCount(i64),
    #[error("unsupported objective {0:?}")]
    UnsupportedObjective(String),
}

/// Transform applied to the summed margin of each output group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputTransform {
    Identity,
    Sigmoid,
    Exp,
    Softmax,
}

impl OutputTransform {
    fn for_objective(objective: &str) -> Result<Self, ConversionError> {
        match objective {
            "binary:logistic" | "reg:logistic" => Ok(OutputTransform::Sigmoid),
            "multi:softprob" => Ok(OutputTransform::Softmax),
            "count:poisson" | "reg:gamma" | "reg:tweedie" => Ok(OutputTransform::Exp),
            "binary:logitraw" | "reg:squarederror" | "reg:linear" | "reg:pseudohubererror"
            | "reg:absoluteerror" | "reg:squaredlogerror" | "reg:quantileerror" => {
                Ok(OutputTransform::Identity)
            }
            other => Err(ConversionError::UnsupportedObjective(other.to_string())),
        }
    }

    /// XGBoost stores `base_score` in output space; the trees sum in margin space.
    fn base_margin(self, base_score: f32) -> f32 {
        match self {
            OutputTransform::Sigmoid => {
                let p = base_score.clamp(1e-7, 1.0 - 1e-7);
                (p / (1.0 - p)).ln()
            }
            OutputTransform::Exp => base_score.max(1e-7).ln(),
            OutputTransform::Identity | OutputTransform::Softmax => base_score,
        }
    }

    fn apply(self, margins: &[f32]) -> Vec<f64> {
        match self {
            OutputTransform::Identity => margins.iter().map(|&m| m as f64).collect(),
            OutputTransform::Sigmoid => margins
                .iter()
                .map(|&m| 1.0 / (1.0 + (-(m as f64)).exp()))
                .collect(),
            OutputTransform::Exp => margins.iter().map(|&m| (m as f64).exp()).collect(),
            OutputTransform::Softmax => {
                let max = margins
                    .iter()
                    .copied()
                    .fold(f32::NEG_INFINITY, f32::max) as f64;
                let exps: Vec<f64> = margins.iter().map(|&m| (m as f64 - max).exp()).collect();
                let sum: f64 = exps.iter().sum();
                exps.into_iter().map(|e| e / sum).collect()
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: f32,
    },
    Numeric {
        feature: usize,
        threshold: f32,
        default_left: bool,
        left: usize,
        right: usize,
    },
    /// Categories listed here go right, everything else goes left
    Categorical {
        feature: usize,
        categories: Vec<i32>,
        default_left: bool,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
struct RegTree {
    nodes: Vec<Node>,
}

impl RegTree {
    /// Children always sit after their parent, so the walk terminates.
    fn leaf_value(&self, row: &[f32]) -> f32 {
        let mut idx = 0;
        loop {
            idx = match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Numeric {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                } => {
                    let x = row[*feature];
                    if x.is_nan() {
                        if *default_left { *left } else { *right }
                    } else if x < *threshold {
                        *left
                    } else {
                        *right
                    }
                }
                Node::Categorical {
                    feature,
                    categories,
                    default_left,
                    left,
                    right,
                } => {
                    let x = row[*feature];
                    if x.is_nan() {
                        if *default_left { *left } else { *right }
                    } else if x < 0.0 {
                        *left
                    } else if categories.binary_search(&(x as i32)).is_ok() {
                        *right
                    } else {
                        *left
                    }
                }
            };
        }
    }

    fn from_xgb(tree: &XgbTree, tree_idx: usize, num_features: usize) -> Result<Self, ConversionError> {
        let num_nodes = tree.num_nodes();
        if num_nodes == 0 {
            return Err(ConversionError::EmptyTree(tree_idx));
        }

        let check_len = |field: &'static str, actual: usize| {
            if actual == num_nodes {
                Ok(())
            } else {
                Err(ConversionError::InconsistentArrays {
                    tree: tree_idx,
                    field,
                    actual,
                    expected: num_nodes,
                })
            }
        };
        check_len("right_children", tree.right_children.len())?;
        check_len("split_indices", tree.split_indices.len())?;
        check_len("split_conditions", tree.split_conditions.len())?;
        check_len("default_left", tree.default_left.len())?;

        let mut nodes = Vec::with_capacity(num_nodes);
        for node_idx in 0..num_nodes {
            let left = tree.left_children[node_idx];
            let right = tree.right_children[node_idx];

            // XGBoost marks leaves with left child == -1
            if left == -1 {
                nodes.push(Node::Leaf {
                    value: tree.split_conditions[node_idx],
                });
                continue;
            }

            for child in [left, right] {
                if child <= node_idx as i32 || child as usize >= num_nodes {
                    return Err(ConversionError::InvalidNodeIndex {
                        tree: tree_idx,
                        node: node_idx,
                        child,
                        num_nodes,
                    });
                }
            }

            let raw_feature = tree.split_indices[node_idx];
            if raw_feature < 0 || raw_feature as usize >= num_features {
                return Err(ConversionError::InvalidFeatureIndex {
                    tree: tree_idx,
                    node: node_idx,
                    feature: raw_feature,
                    num_features,
                });
            }
            let feature = raw_feature as usize;
            let default_left = tree.default_left[node_idx] != 0;

            let is_categorical = tree.split_type.get(node_idx).copied().unwrap_or(0) == 1;
            if is_categorical {
                nodes.push(Node::Categorical {
                    feature,
                    categories: node_categories(tree, tree_idx, node_idx)?,
                    default_left,
                    left: left as usize,
                    right: right as usize,
                });
            } else {
                nodes.push(Node::Numeric {
                    feature,
                    threshold: tree.split_conditions[node_idx],
                    default_left,
                    left: left as usize,
                    right: right as usize,
                });
            }
        }

        Ok(Self { nodes })
    }
}

/// Sorted category values stored for a categorical split node.
fn node_categories(
    tree: &XgbTree,
    tree_idx: usize,
    node_idx: usize,
) -> Result<Vec<i32>, ConversionError> {
    let Some(slot) = tree
        .categories_nodes
        .iter()
        .position(|&n| n as usize == node_idx)
    else {
        return Ok(Vec::new());
    };

    let bad = || ConversionError::InvalidCategories { tree: tree_idx };
    let start = *tree.categories_segments.get(slot).ok_or_else(bad)?;
    let size = *tree.categories_sizes.get(slot).ok_or_else(bad)?;
    if start < 0 || size < 0 {
        return Err(bad());
    }
    let (start, size) = (start as usize, size as usize);

    let mut categories = tree
        .categories
        .get(start..start + size)
        .ok_or_else(bad)?
        .to_vec();
    categories.sort_unstable();
    Ok(categories)
}

/// Gradient-boosted tree ensemble ready for scoring.
#[derive(Debug, Clone)]
pub struct Forest {
    trees: Vec<RegTree>,
    tree_groups: Vec<usize>,
    tree_weights: Option<Vec<f32>>,
    base_margin: f32,
    n_groups: usize,
    n_features: usize,
    feature_names: Vec<String>,
    objective: String,
    transform: OutputTransform,
}

impl Forest {
    /// Validate an XGBoost document and convert it into a forest.
    pub fn from_model(model: &XgbModel) -> Result<Self, ConversionError> {
        let param = &model.learner.learner_model_param;
        if param.num_feature <= 0 {
            return Err(ConversionError::InvalidFeatureCount(param.num_feature));
        }
        let n_features = param.num_feature as usize;
        let n_groups = if param.num_class <= 1 {
            1
        } else {
            param.num_class as usize
        };

        let objective = model.learner.objective.name.clone();
        let transform = OutputTransform::for_objective(&objective)?;

        let (model_trees, weights) = model.trees();
        if let Some(w) = weights {
            if w.len() != model_trees.trees.len() {
                return Err(ConversionError::DartWeights {
                    actual: w.len(),
                    expected: model_trees.trees.len(),
                });
            }
        }

        let mut trees = Vec::with_capacity(model_trees.trees.len());
        let mut tree_groups = Vec::with_capacity(model_trees.trees.len());
        for (tree_idx, xgb_tree) in model_trees.trees.iter().enumerate() {
            let group = model_trees.tree_info.get(tree_idx).copied().unwrap_or(0);
            if group < 0 || group as usize >= n_groups {
                return Err(ConversionError::InvalidTreeGroup {
                    tree: tree_idx,
                    group,
                    num_groups: n_groups,
                });
            }
            trees.push(RegTree::from_xgb(xgb_tree, tree_idx, n_features)?);
            tree_groups.push(group as usize);
        }

        Ok(Self {
            trees,
            tree_groups,
            tree_weights: weights.map(<[f32]>::to_vec),
            base_margin: transform.base_margin(param.base_score),
            n_groups,
            n_features,
            feature_names: model.learner.feature_names.clone(),
            objective,
            transform,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_groups(&self) -> usize {
        self.n_groups
    }

    pub fn objective(&self) -> &str {
        &self.objective
    }

    /// Raw per-group margins for one row of `n_features` values
    fn predict_margin(&self, row: &[f32]) -> Vec<f32> {
        let mut margins = vec![self.base_margin; self.n_groups];
        for (tree_idx, tree) in self.trees.iter().enumerate() {
            let leaf = tree.leaf_value(row);
            let weight = self
                .tree_weights
                .as_ref()
                .map_or(1.0, |w| w[tree_idx]);
            margins[self.tree_groups[tree_idx]] += leaf * weight;
        }
        margins
    }

    /// Transformed outputs for one row
    pub fn predict_row(&self, row: &[f32]) -> Result<Vec<f64>> {
        if row.len() != self.n_features {
            bail!(
                "row has {} values but model expects {} features",
                row.len(),
                self.n_features
            );
        }
        Ok(self.transform.apply(&self.predict_margin(row)))
    }
}

impl Scorer for Forest {
    fn n_features(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn feature_names(&self) -> Option<&[String]> {
        if self.feature_names.is_empty() {
            None
        } else {
            Some(&self.feature_names)
        }
    }

    fn predict_proba(&self, batch: &[&[f32]]) -> Result<Vec<Vec<f64>>> {
        batch.iter().map(|row| self.predict_row(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model_json(objective: &str, num_class: &str, trees: serde_json::Value, tree_info: serde_json::Value) -> XgbModel {
        serde_json::from_value(json!({
            "version": [2, 0, 3],
            "learner": {
                "feature_names": ["yards_to_go", "route"],
                "gradient_booster": {
                    "name": "gbtree",
                    "model": {"trees": trees, "tree_info": tree_info}
                },
                "objective": {"name": objective},
                "learner_model_param": {
                    "base_score": "5E-1",
                    "num_class": num_class,
                    "num_feature": "2"
                }
            }
        }))
        .unwrap()
    }

    /// yards_to_go < 5 -> 0.4, else -0.4
    fn numeric_stump() -> serde_json::Value {
        json!({
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "split_indices": [0, 0, 0],
            "split_conditions": [5.0, 0.4, -0.4],
            "default_left": [1, 0, 0],
            "split_type": [0, 0, 0]
        })
    }

    #[test]
    fn test_binary_logistic_stump() {
        let model = model_json("binary:logistic", "0", json!([numeric_stump()]), json!([0]));
        let forest = Forest::from_model(&model).unwrap();

        assert_eq!(forest.n_trees(), 1);
        assert_eq!(forest.n_groups(), 1);

        // base_score 0.5 is a zero margin
        let short = forest.predict_row(&[3.0, 0.0]).unwrap();
        let long = forest.predict_row(&[8.0, 0.0]).unwrap();
        let expected = 1.0 / (1.0 + (-0.4f64).exp());
        assert!((short[0] - expected).abs() < 1e-6);
        assert!((long[0] - (1.0 - expected)).abs() < 1e-6);
    }

    #[test]
    fn test_missing_value_follows_default_direction() {
        let model = model_json("binary:logitraw", "0", json!([numeric_stump()]), json!([0]));
        let forest = Forest::from_model(&model).unwrap();

        let margin = forest.predict_row(&[f32::NAN, 0.0]).unwrap();
        assert!((margin[0] - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_categorical_split_routes_listed_categories_right() {
        let tree = json!({
            "left_children": [1, -1, -1],
            "right_children": [2, -1, -1],
            "split_indices": [1, 0, 0],
            "split_conditions": [0.0, -1.0, 1.0],
            "default_left": [0, 0, 0],
            "split_type": [1, 0, 0],
            "categories": [4, 1],
            "categories_nodes": [0],
            "categories_segments": [0],
            "categories_sizes": [2]
        });
        let model = model_json("reg:squarederror", "0", json!([tree]), json!([0]));
        let forest = Forest::from_model(&model).unwrap();

        assert!((forest.predict_row(&[0.0, 1.0]).unwrap()[0] - 1.5).abs() < 1e-6);
        assert!((forest.predict_row(&[0.0, 4.0]).unwrap()[0] - 1.5).abs() < 1e-6);
        assert!((forest.predict_row(&[0.0, 2.0]).unwrap()[0] - -0.5).abs() < 1e-6);
        // Category values truncate toward zero; only negatives fall left
        assert!((forest.predict_row(&[0.0, 1.7]).unwrap()[0] - 1.5).abs() < 1e-6);
        assert!((forest.predict_row(&[0.0, 4.2]).unwrap()[0] - 1.5).abs() < 1e-6);
        assert!((forest.predict_row(&[0.0, -1.0]).unwrap()[0] - -0.5).abs() < 1e-6);
    }

    #[test]
    fn test_softprob_produces_distribution() {
        let model = model_json(
            "multi:softprob",
            "2",
            json!([numeric_stump(), numeric_stump()]),
            json!([0, 1]),
        );
        let forest = Forest::from_model(&model).unwrap();
        assert_eq!(forest.n_groups(), 2);

        let probs = forest.predict_row(&[3.0, 0.0]).unwrap();
        assert_eq!(probs.len(), 2);
        assert!((probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_backward_child_reference() {
        let tree = json!({
            "left_children": [1, 0],
            "right_children": [1, -1],
            "split_indices": [0, 0],
            "split_conditions": [1.0, 1.0],
            "default_left": [0, 0]
        });
        let model = model_json("binary:logistic", "0", json!([tree]), json!([0]));
        assert!(matches!(
            Forest::from_model(&model),
            Err(ConversionError::InvalidNodeIndex { .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_feature() {
        let mut tree = numeric_stump();
        tree["split_indices"] = json!([7, 0, 0]);
        let model = model_json("binary:logistic", "0", json!([tree]), json!([0]));
        assert!(matches!(
            Forest::from_model(&model),
            Err(ConversionError::InvalidFeatureIndex { feature: 7, .. })
        ));
    }

    #[test]
    fn test_rejects_unsupported_objective() {
        let model = model_json("rank:pairwise", "0", json!([numeric_stump()]), json!([0]));
        assert!(matches!(
            Forest::from_model(&model),
            Err(ConversionError::UnsupportedObjective(_))
        ));
    }

    #[test]
    fn test_row_width_is_checked() {
        let model = model_json("binary:logistic", "0", json!([numeric_stump()]), json!([0]));
        let forest = Forest::from_model(&model).unwrap();
        assert!(forest.predict_row(&[1.0]).is_err());
        let short: &[f32] = &[1.0];
        let valid: &[f32] = &[1.0, 0.0];
        let wide: &[f32] = &[1.0, 0.0, 3.0];
        assert!(forest.predict_proba(&[short]).is_err());
        assert!(forest.predict_proba(&[valid, wide]).is_err());
        assert_eq!(forest.predict_proba(&[valid]).unwrap().len(), 1);
    }
}

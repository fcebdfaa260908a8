//! Random forest classifier evaluated from an exported JSON artifact.
//!
//! Each tree is a flat node array rooted at index 0. A sample goes to the
//! left child when `x[feature] <= threshold`. Leaves store class counts (or
//! weights); the forest probability is the mean of the normalized leaf
//! distributions, as in the usual soft-voting random forest.

use crate::error::{ArtifactError, InferenceError};
use crate::models::classifier::Classifier;
use serde::{Deserialize, Serialize};

/// One node of a decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

/// A single decision tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Normalized class distribution of the leaf reached by `features`.
    fn leaf_distribution(&self, features: &[f64]) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }

    fn check(&self, tree: usize, n_features: usize, n_classes: usize) -> Result<(), ArtifactError> {
        let invalid = |reason: String| ArtifactError::invalid("random forest", format!("tree {tree}: {reason}"));

        if self.nodes.is_empty() {
            return Err(invalid("no nodes".to_string()));
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(invalid(format!("node {idx} splits on feature {feature}")));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(format!("node {idx} has a non-finite threshold")));
                    }
                    // Children after their parent guarantees every walk ends.
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(invalid(format!("node {idx} has bad child {child}")));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(invalid(format!(
                            "leaf {idx} has {} values for {n_classes} classes",
                            value.len()
                        )));
                    }
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0)
                        || value.iter().sum::<f64>() <= 0.0
                    {
                        return Err(invalid(format!("leaf {idx} has an invalid distribution")));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Soft-voting random forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ForestParams")]
pub struct RandomForest {
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

#[derive(Deserialize)]
struct ForestParams {
    n_features: usize,
    n_classes: usize,
    trees: Vec<DecisionTree>,
}

impl TryFrom<ForestParams> for RandomForest {
    type Error = ArtifactError;

    fn try_from(params: ForestParams) -> Result<Self, Self::Error> {
        Self::new(params.n_features, params.n_classes, params.trees)
    }
}

impl RandomForest {
    /// Create a forest, checking every tree's structure.
    pub fn new(
        n_features: usize,
        n_classes: usize,
        trees: Vec<DecisionTree>,
    ) -> Result<Self, ArtifactError> {
        if trees.is_empty() {
            return Err(ArtifactError::invalid("random forest", "no trees"));
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.check(i, n_features, n_classes)?;
        }

        Ok(Self {
            n_features,
            n_classes,
            trees,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for RandomForest {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn feature_count(&self) -> Option<usize> {
        Some(self.n_features)
    }

    fn class_count(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if features.len() != self.n_features {
            return Err(InferenceError::FeatureCountMismatch {
                expected: self.n_features,
                got: features.len(),
            });
        }

        let mut proba = vec![0.0; self.n_classes];
        for tree in &self.trees {
            let leaf = tree.leaf_distribution(features);
            let total: f64 = leaf.iter().sum();
            for (acc, v) in proba.iter_mut().zip(leaf) {
                *acc += v / total;
            }
        }

        let n_trees = self.trees.len() as f64;
        proba.iter_mut().for_each(|p| *p /= n_trees);
        Ok(proba)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump(feature: usize, threshold: f64, left: Vec<f64>, right: Vec<f64>) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode::Split {
                    feature,
                    threshold,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { value: left },
                TreeNode::Leaf { value: right },
            ],
        }
    }

    #[test]
    fn test_single_tree_routing() {
        let forest =
            RandomForest::new(1, 2, vec![stump(0, 0.0, vec![3.0, 1.0], vec![0.0, 4.0])]).unwrap();

        assert_eq!(forest.predict_proba(&[-1.0]).unwrap(), vec![0.75, 0.25]);
        // threshold itself goes left
        assert_eq!(forest.predict_proba(&[0.0]).unwrap(), vec![0.75, 0.25]);
        assert_eq!(forest.predict_proba(&[0.5]).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_trees_are_averaged() {
        let forest = RandomForest::new(
            2,
            2,
            vec![
                stump(0, 0.0, vec![1.0, 0.0], vec![0.0, 1.0]),
                stump(1, 0.0, vec![1.0, 1.0], vec![0.0, 2.0]),
            ],
        )
        .unwrap();

        let proba = forest.predict_proba(&[1.0, -1.0]).unwrap();
        assert!((proba[0] - 0.25).abs() < 1e-12);
        assert!((proba[1] - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_malformed_trees() {
        // child pointing backwards would loop forever
        let looping = DecisionTree {
            nodes: vec![TreeNode::Split {
                feature: 0,
                threshold: 0.0,
                left: 0,
                right: 0,
            }],
        };
        assert!(RandomForest::new(1, 2, vec![looping]).is_err());

        let wrong_feature = stump(3, 0.0, vec![1.0, 0.0], vec![0.0, 1.0]);
        assert!(RandomForest::new(1, 2, vec![wrong_feature]).is_err());

        let wrong_width = stump(0, 0.0, vec![1.0], vec![0.0, 1.0]);
        assert!(RandomForest::new(1, 2, vec![wrong_width]).is_err());

        let empty_leaf = stump(0, 0.0, vec![0.0, 0.0], vec![0.0, 1.0]);
        assert!(RandomForest::new(1, 2, vec![empty_leaf]).is_err());

        assert!(RandomForest::new(1, 2, Vec::new()).is_err());
    }

    #[test]
    fn test_mis_sized_input() {
        let forest =
            RandomForest::new(1, 2, vec![stump(0, 0.0, vec![1.0, 0.0], vec![0.0, 1.0])]).unwrap();
        assert_eq!(
            forest.predict_proba(&[1.0, 2.0]),
            Err(InferenceError::FeatureCountMismatch {
                expected: 1,
                got: 2
            })
        );
    }

    #[test]
    fn test_json_artifact_format() {
        let json = r#"{
            "n_features": 1,
            "n_classes": 2,
            "trees": [{"nodes": [
                {"type": "split", "feature": 0, "threshold": 0.5, "left": 1, "right": 2},
                {"type": "leaf", "value": [2.0, 0.0]},
                {"type": "leaf", "value": [0.0, 2.0]}
            ]}]
        }"#;
        let forest: RandomForest = serde_json::from_str(json).unwrap();
        assert_eq!(forest.tree_count(), 1);
        assert_eq!(forest.predict_proba(&[1.0]).unwrap(), vec![0.0, 1.0]);
    }
}

use super::Classifier;
use crate::features::FeatureRow;
use serde::{Deserialize, Serialize};

/// A split node (`feature`, `threshold`, `left`, `right`) or a leaf (`value`).
/// Rows with `x <= threshold` go left.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(default)]
    pub feature: Option<usize>,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub left: Option<usize>,
    #[serde(default)]
    pub right: Option<usize>,
    /// Positive-class probability at a leaf
    #[serde(default)]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    /// Node 0 is the root
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("empty tree".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match (node.feature, node.left, node.right, node.value) {
                (_, None, None, Some(_)) => {}
                (Some(f), Some(l), Some(r), _) => {
                    if f >= feature_count {
                        return Err(format!("node {} splits on unknown feature {}", i, f));
                    }
                    // Children after parents rules out cycles
                    if l <= i || r <= i || l >= self.nodes.len() || r >= self.nodes.len() {
                        return Err(format!("node {} has invalid children", i));
                    }
                }
                _ => return Err(format!("node {} is neither a split nor a leaf", i)),
            }
        }
        Ok(())
    }

    fn leaf_value(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            let node = &self.nodes[idx];
            match (node.feature, node.left, node.right) {
                (Some(f), Some(l), Some(r)) => {
                    idx = if x[f] <= node.threshold { l } else { r };
                }
                _ => return node.value.unwrap_or(0.5),
            }
        }
    }
}

/// Random-forest classifier: mean of the per-tree leaf probabilities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestModel {
    pub feature_names: Vec<String>,
    pub trees: Vec<DecisionTree>,
}

impl ForestModel {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.trees.is_empty() {
            return Err("forest has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.feature_names.len())
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }
}

impl Classifier for ForestModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, row: &FeatureRow) -> f64 {
        let x = row.vector(&self.feature_names);
        let sum: f64 = self.trees.iter().map(|t| t.leaf_value(&x)).sum();
        sum / self.trees.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn stump(threshold: f64, left: f64, right: f64) -> DecisionTree {
        DecisionTree {
            nodes: vec![
                TreeNode {
                    feature: Some(0),
                    threshold,
                    left: Some(1),
                    right: Some(2),
                    value: None,
                },
                TreeNode {
                    feature: None,
                    threshold: 0.0,
                    left: None,
                    right: None,
                    value: Some(left),
                },
                TreeNode {
                    feature: None,
                    threshold: 0.0,
                    left: None,
                    right: None,
                    value: Some(right),
                },
            ],
        }
    }

    #[test]
    fn test_forest_averages_trees() {
        let forest = ForestModel {
            feature_names: vec!["spread".to_string()],
            trees: vec![stump(-3.0, 0.7, 0.4), stump(0.0, 0.6, 0.2)],
        };
        assert!(forest.validate().is_ok());

        let at = |spread: f64| forest.predict_proba(&FeatureRow::new().with("spread", spread));
        // -3 <= -3 goes left in both trees
        assert_relative_eq!(at(-3.0), 0.65);
        assert_relative_eq!(at(-1.0), 0.5);
        assert_relative_eq!(at(7.0), 0.3);
    }

    #[test]
    fn test_validate_rejects_bad_children() {
        let mut tree = stump(0.0, 0.5, 0.5);
        tree.nodes[0].right = Some(0);
        let forest = ForestModel {
            feature_names: vec!["spread".to_string()],
            trees: vec![tree],
        };
        assert!(forest.validate().is_err());

        let forest = ForestModel {
            feature_names: vec![],
            trees: vec![stump(0.0, 0.5, 0.5)],
        };
        assert!(forest.validate().is_err());
    }
}

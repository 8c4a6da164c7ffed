//! Pretrained maintenance-status classifiers exported to JSON.
//!
//! Three shapes are supported: a linear model (one coefficient row per class,
//! or a single row for binary models), a single decision tree, and a forest of
//! trees whose normalized leaf distributions are averaged. Tree nodes use the
//! flat array layout of scikit-learn's `tree_` (leaf = `feature < 0`).

use crate::error::Error;
use crate::types::Label;
use serde::{Deserialize, Serialize};

pub trait Classifier: Send + Sync {
    fn n_features(&self) -> usize;

    /// One label per input row, in row order.
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Label>, Error>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub feature: i64,
    #[serde(default)]
    pub threshold: f64,
    #[serde(default)]
    pub left: i64,
    #[serde(default)]
    pub right: i64,
    /// Class weights at this node; only read at leaves.
    #[serde(default)]
    pub value: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierArtifact {
    Linear {
        classes: Vec<Label>,
        coef: Vec<Vec<f64>>,
        intercept: Vec<f64>,
    },
    DecisionTree {
        classes: Vec<Label>,
        n_features: usize,
        nodes: Vec<TreeNode>,
    },
    RandomForest {
        classes: Vec<Label>,
        n_features: usize,
        trees: Vec<Vec<TreeNode>>,
    },
}

impl ClassifierArtifact {
    fn classes(&self) -> &[Label] {
        match self {
            ClassifierArtifact::Linear { classes, .. }
            | ClassifierArtifact::DecisionTree { classes, .. }
            | ClassifierArtifact::RandomForest { classes, .. } => classes,
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        let classes = self.classes();
        if classes.is_empty() {
            return Err(Error::Config("classifier has no classes".into()));
        }
        match self {
            ClassifierArtifact::Linear { coef, intercept, .. } => {
                if classes.len() < 2 {
                    return Err(Error::Config("linear model needs at least two classes".into()));
                }
                let expected_rows = if classes.len() == 2 && coef.len() == 1 { 1 } else { classes.len() };
                if coef.len() != expected_rows || intercept.len() != expected_rows {
                    return Err(Error::Config(format!(
                        "linear model has {} coefficient rows and {} intercepts for {} classes",
                        coef.len(),
                        intercept.len(),
                        classes.len()
                    )));
                }
                let width = coef.first().map(Vec::len).unwrap_or(0);
                if width == 0 || coef.iter().any(|r| r.len() != width) {
                    return Err(Error::Config("linear model coefficient rows must share a non-zero width".into()));
                }
                Ok(())
            }
            ClassifierArtifact::DecisionTree { nodes, n_features, .. } => {
                validate_tree(nodes, *n_features, classes.len())
            }
            ClassifierArtifact::RandomForest { trees, n_features, .. } => {
                if trees.is_empty() {
                    return Err(Error::Config("random forest has no trees".into()));
                }
                trees
                    .iter()
                    .try_for_each(|t| validate_tree(t, *n_features, classes.len()))
            }
        }
    }

    fn class_at(&self, index: usize) -> Result<Label, Error> {
        self.classes()
            .get(index)
            .cloned()
            .ok_or_else(|| Error::Config(format!("model produced class index {} out of range", index)))
    }
}

fn validate_tree(nodes: &[TreeNode], n_features: usize, n_classes: usize) -> Result<(), Error> {
    if nodes.is_empty() {
        return Err(Error::Config("decision tree has no nodes".into()));
    }
    for (i, node) in nodes.iter().enumerate() {
        if node.feature < 0 {
            if node.value.len() != n_classes {
                return Err(Error::Config(format!(
                    "tree leaf {} has {} class weights, expected {}",
                    i,
                    node.value.len(),
                    n_classes
                )));
            }
            continue;
        }
        if node.feature as usize >= n_features {
            return Err(Error::Config(format!("tree node {} splits on unknown feature {}", i, node.feature)));
        }
        // Children always come after their parent, which also rules out cycles.
        for child in [node.left, node.right] {
            if child <= i as i64 || child as usize >= nodes.len() {
                return Err(Error::Config(format!("tree node {} has invalid child {}", i, child)));
            }
        }
    }
    Ok(())
}

fn leaf<'a>(nodes: &'a [TreeNode], row: &[f64]) -> &'a TreeNode {
    let mut idx = 0usize;
    loop {
        let node = &nodes[idx];
        if node.feature < 0 {
            return node;
        }
        idx = if row[node.feature as usize] <= node.threshold {
            node.left as usize
        } else {
            node.right as usize
        };
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

impl Classifier for ClassifierArtifact {
    fn n_features(&self) -> usize {
        match self {
            ClassifierArtifact::Linear { coef, .. } => coef.first().map(Vec::len).unwrap_or(0),
            ClassifierArtifact::DecisionTree { n_features, .. }
            | ClassifierArtifact::RandomForest { n_features, .. } => *n_features,
        }
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Label>, Error> {
        let n = self.n_features();
        let mut labels = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if row.len() != n {
                return Err(Error::DataShape(format!(
                    "row {} has {} features, the model expects {}",
                    i + 1,
                    row.len(),
                    n
                )));
            }
            let class_index = match self {
                ClassifierArtifact::Linear { coef, intercept, .. } => {
                    let scores: Vec<f64> = coef
                        .iter()
                        .zip(intercept)
                        .map(|(w, b)| w.iter().zip(row).map(|(w, x)| w * x).sum::<f64>() + b)
                        .collect();
                    if scores.len() == 1 {
                        usize::from(scores[0] > 0.0)
                    } else {
                        argmax(&scores)
                    }
                }
                ClassifierArtifact::DecisionTree { nodes, .. } => argmax(&leaf(nodes, row).value),
                ClassifierArtifact::RandomForest { trees, classes, .. } => {
                    let mut votes = vec![0.0; classes.len()];
                    for tree in trees {
                        let value = &leaf(tree, row).value;
                        let total: f64 = value.iter().sum();
                        if total > 0.0 {
                            for (v, w) in votes.iter_mut().zip(value) {
                                *v += w / total;
                            }
                        }
                    }
                    argmax(&votes)
                }
            };
            labels.push(self.class_at(class_index)?);
        }
        Ok(labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(s: &str) -> Label {
        Label::Status(s.to_string())
    }

    #[test]
    fn multiclass_linear_picks_highest_score() {
        let model: ClassifierArtifact = serde_json::from_str(
            r#"{"kind":"linear","classes":["Normal","Warning","Failure"],
                "coef":[[-1.0],[0.0],[1.0]],"intercept":[0.0,0.5,0.0]}"#,
        )
        .unwrap();
        model.validate().unwrap();
        let out = model.predict(&[vec![-2.0], vec![0.2], vec![3.0]]).unwrap();
        assert_eq!(out, vec![status("Normal"), status("Warning"), status("Failure")]);
    }

    #[test]
    fn binary_linear_uses_sign() {
        let model = ClassifierArtifact::Linear {
            classes: vec![Label::Code(0), Label::Code(1)],
            coef: vec![vec![1.0, 1.0]],
            intercept: vec![-1.0],
        };
        model.validate().unwrap();
        let out = model.predict(&[vec![0.2, 0.3], vec![1.0, 1.0]]).unwrap();
        assert_eq!(out, vec![Label::Code(0), Label::Code(1)]);
    }

    fn stump() -> Vec<TreeNode> {
        vec![
            TreeNode { feature: 0, threshold: 0.5, left: 1, right: 2, value: vec![] },
            TreeNode { feature: -1, threshold: 0.0, left: -1, right: -1, value: vec![9.0, 1.0] },
            TreeNode { feature: -1, threshold: 0.0, left: -1, right: -1, value: vec![2.0, 8.0] },
        ]
    }

    #[test]
    fn tree_routes_on_threshold() {
        let model = ClassifierArtifact::DecisionTree {
            classes: vec![status("OK"), status("Failure")],
            n_features: 1,
            nodes: stump(),
        };
        model.validate().unwrap();
        let out = model.predict(&[vec![0.5], vec![0.51]]).unwrap();
        assert_eq!(out, vec![status("OK"), status("Failure")]);
    }

    #[test]
    fn forest_averages_normalized_leaves() {
        let mut flipped = stump();
        flipped[1].value = vec![0.0, 1.0];
        let model = ClassifierArtifact::RandomForest {
            classes: vec![status("OK"), status("Failure")],
            n_features: 1,
            // Tree 1 says OK at 0.9, tree 2 says Failure at 1.0 on the left branch.
            trees: vec![stump(), flipped],
        };
        model.validate().unwrap();
        assert_eq!(model.predict(&[vec![0.0]]).unwrap(), vec![status("Failure")]);
    }

    #[test]
    fn cyclic_tree_is_rejected() {
        let mut nodes = stump();
        nodes[0].left = 0;
        let model = ClassifierArtifact::DecisionTree {
            classes: vec![status("OK"), status("Failure")],
            n_features: 1,
            nodes,
        };
        assert!(model.validate().is_err());
    }

    #[test]
    fn single_class_linear_is_rejected_at_load() {
        let model = ClassifierArtifact::Linear {
            classes: vec![status("Failure")],
            coef: vec![vec![1.0]],
            intercept: vec![0.0],
        };
        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("at least two classes"));
    }

    #[test]
    fn width_mismatch_is_data_shape() {
        let model = ClassifierArtifact::Linear {
            classes: vec![Label::Code(0), Label::Code(1)],
            coef: vec![vec![1.0, 1.0]],
            intercept: vec![0.0],
        };
        assert!(matches!(model.predict(&[vec![1.0]]), Err(Error::DataShape(_))));
    }
}

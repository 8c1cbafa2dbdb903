use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{collections::HashMap, fs, path::Path};

use crate::encode;
use crate::error::ModelError;
use crate::types::FeatureTable;

#[derive(Deserialize)]
struct MetaJson {
    feat_list: Vec<String>,
    classes: Vec<String>,
    #[serde(default = "default_base_score")]
    base_score: f32,
}

fn default_base_score() -> f32 {
    0.5
}

/// One node of an XGBoost JSON dump (`Booster.dump_model(..., dump_format="json")`).
/// Extra dump fields such as `depth`, `gain` and `cover` are ignored.
#[derive(Deserialize)]
#[serde(untagged)]
enum NodeJson {
    Leaf {
        nodeid: u32,
        leaf: f32,
    },
    Split {
        nodeid: u32,
        split: String,
        split_condition: f32,
        yes: u32,
        no: u32,
        missing: Option<u32>,
        #[serde(default)]
        children: Vec<NodeJson>,
    },
}

impl NodeJson {
    fn nodeid(&self) -> u32 {
        match self {
            NodeJson::Leaf { nodeid, .. } | NodeJson::Split { nodeid, .. } => *nodeid,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(f32),
    Split {
        feature: usize,
        threshold: f32,
        yes: usize,
        no: usize,
        missing: usize,
    },
}

/// A single regression tree stored as a flat node array; index 0 is the root.
#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_json(root: &NodeJson, features: &HashMap<&str, usize>) -> Result<Self> {
        // First pass: assign array slots in visiting order (root gets 0).
        let mut slots: HashMap<u32, usize> = HashMap::new();
        let mut stack = vec![root];
        let mut order = Vec::new();
        while let Some(node) = stack.pop() {
            if slots.insert(node.nodeid(), order.len()).is_some() {
                bail!("duplicate nodeid {}", node.nodeid());
            }
            order.push(node);
            if let NodeJson::Split { children, .. } = node {
                stack.extend(children.iter().rev());
            }
        }

        let mut nodes = Vec::with_capacity(order.len());
        for node in order {
            match node {
                NodeJson::Leaf { leaf, .. } => nodes.push(Node::Leaf(*leaf)),
                NodeJson::Split {
                    nodeid,
                    split,
                    split_condition,
                    yes,
                    no,
                    missing,
                    children,
                } => {
                    let feature = resolve_feature(split, features)
                        .with_context(|| format!("node {}", nodeid))?;
                    // Branch targets must be this node's own children, which keeps the tree acyclic.
                    let child = |id: u32| -> Result<usize> {
                        if !children.iter().any(|c| c.nodeid() == id) {
                            bail!("node {} points at {} which is not one of its children", nodeid, id);
                        }
                        Ok(slots[&id])
                    };
                    nodes.push(Node::Split {
                        feature,
                        threshold: *split_condition,
                        yes: child(*yes)?,
                        no: child(*no)?,
                        missing: child(missing.unwrap_or(*yes))?,
                    });
                }
            }
        }
        Ok(Self { nodes })
    }

    fn leaf_value(&self, x: &[f32]) -> f32 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(v) => return *v,
                Node::Split {
                    feature,
                    threshold,
                    yes,
                    no,
                    missing,
                } => {
                    let value = x[*feature];
                    idx = if value.is_nan() {
                        *missing
                    } else if value < *threshold {
                        *yes
                    } else {
                        *no
                    };
                }
            }
        }
    }
}

/// Split names are either a trained feature name or the positional `f<N>` form.
fn resolve_feature(split: &str, features: &HashMap<&str, usize>) -> Result<usize> {
    if let Some(idx) = features.get(split) {
        return Ok(*idx);
    }
    if let Some(idx) = split.strip_prefix('f').and_then(|n| n.parse::<usize>().ok()) {
        if idx < features.len() {
            return Ok(idx);
        }
    }
    bail!("split feature {:?} is not in feat_list", split)
}

/// Gradient-boosted tree classifier plus the label decoder it was trained with.
pub struct Model {
    trees: Vec<Tree>,
    feat_list: Vec<String>,
    classes: Vec<String>,
    base_score: f32,
}

impl Model {
    pub fn load(model_path: impl AsRef<Path>, meta_path: impl AsRef<Path>) -> Result<Self> {
        let model_path = model_path.as_ref();
        let meta_path = meta_path.as_ref();

        let meta_txt = fs::read_to_string(meta_path)
            .with_context(|| format!("failed to read meta at {}", meta_path.display()))?;
        let model_txt = fs::read_to_string(model_path)
            .with_context(|| format!("failed to read model at {}", model_path.display()))?;

        Self::from_json(&model_txt, &meta_txt)
            .with_context(|| format!("invalid model artifact {}", model_path.display()))
    }

    pub fn from_json(model_json: &str, meta_json: &str) -> Result<Self> {
        let meta: MetaJson =
            serde_json::from_str(meta_json).with_context(|| "failed to parse meta.json")?;
        let dump: Vec<NodeJson> =
            serde_json::from_str(model_json).with_context(|| "failed to parse tree dump")?;

        if meta.classes.is_empty() {
            bail!("meta.classes is empty");
        }
        if meta.feat_list.is_empty() {
            bail!("meta.feat_list is empty");
        }
        if dump.is_empty() {
            bail!("model has no trees");
        }
        let num_class = meta.classes.len();
        if num_class > 2 && dump.len() % num_class != 0 {
            bail!(
                "{} trees cannot be split evenly across {} classes",
                dump.len(),
                num_class
            );
        }
        if num_class == 2 && !(meta.base_score > 0.0 && meta.base_score < 1.0) {
            bail!("binary base_score must be a probability, got {}", meta.base_score);
        }

        let features: HashMap<&str, usize> = meta
            .feat_list
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();
        let trees = dump
            .iter()
            .enumerate()
            .map(|(i, root)| Tree::from_json(root, &features).with_context(|| format!("tree {}", i)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            trees,
            feat_list: meta.feat_list,
            classes: meta.classes,
            base_score: meta.base_score,
        })
    }

    pub fn feat_list(&self) -> &[String] {
        &self.feat_list
    }

    pub fn in_dim(&self) -> usize {
        self.feat_list.len()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    fn is_binary(&self) -> bool {
        self.classes.len() == 2
    }

    /// Raw scores: one logit for a binary model, one margin per class otherwise.
    pub fn margins(&self, x: &[f32]) -> Result<Vec<f32>, ModelError> {
        if x.len() != self.in_dim() {
            return Err(ModelError::FeatureLength {
                got: x.len(),
                expected: self.in_dim(),
            });
        }

        if self.is_binary() {
            let p = self.base_score;
            let base = (p / (1.0 - p)).ln();
            let sum: f32 = self.trees.iter().map(|t| t.leaf_value(x)).sum();
            return Ok(vec![base + sum]);
        }

        let num_class = self.classes.len();
        let mut margins = vec![self.base_score; num_class];
        for (i, tree) in self.trees.iter().enumerate() {
            margins[i % num_class] += tree.leaf_value(x);
        }
        Ok(margins)
    }

    /// Class probabilities in `classes` order.
    pub fn predict_proba(&self, x: &[f32]) -> Result<Vec<f32>, ModelError> {
        let margins = self.margins(x)?;
        if self.is_binary() {
            let p = sigmoid(margins[0]);
            return Ok(vec![1.0 - p, p]);
        }
        Ok(softmax(&margins))
    }

    /// Encoded label for one feature vector. Ties go to the lowest class index.
    pub fn predict_encoded(&self, x: &[f32]) -> Result<usize, ModelError> {
        let margins = self.margins(x)?;
        if self.is_binary() {
            return Ok(usize::from(sigmoid(margins[0]) > 0.5));
        }
        let mut best = 0;
        for (i, m) in margins.iter().enumerate().skip(1) {
            if *m > margins[best] {
                best = i;
            }
        }
        Ok(best)
    }

    /// Label decoder: encoded index back to the class string.
    pub fn decode(&self, label: usize) -> Result<&str, ModelError> {
        self.classes
            .get(label)
            .map(String::as_str)
            .ok_or(ModelError::UnknownClass(label))
    }

    /// Encodes, classifies and decodes every row of `table`, preserving order.
    pub fn predict(&self, table: &FeatureTable) -> Result<Vec<String>, ModelError> {
        table
            .iter()
            .map(|row| {
                let x = encode::encode_row(row, &self.feat_list);
                let label = self.predict_encoded(&x)?;
                self.decode(label).map(str::to_string)
            })
            .collect()
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(margins: &[f32]) -> Vec<f32> {
    let max = margins.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = margins.iter().map(|m| (m - max).exp()).collect();
    let total: f32 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const META_3: &str = r#"{"feat_list": ["a", "b"], "classes": ["x", "y", "z"]}"#;

    fn stump(feature: &str, threshold: f32, yes: f32, no: f32) -> String {
        format!(
            r#"{{"nodeid":0,"depth":0,"split":"{}","split_condition":{},"yes":1,"no":2,"missing":1,
                "children":[{{"nodeid":1,"leaf":{}}},{{"nodeid":2,"leaf":{}}}]}}"#,
            feature, threshold, yes, no
        )
    }

    fn three_class() -> Model {
        let dump = format!(
            "[{},{},{}]",
            stump("a", 0.5, 1.0, -1.0),
            stump("b", 10.0, -1.0, 1.0),
            r#"{"nodeid":0,"leaf":0.1}"#
        );
        Model::from_json(&dump, META_3).unwrap()
    }

    #[test]
    fn trees_are_assigned_round_robin() {
        let m = three_class();
        assert_eq!(m.margins(&[0.0, 0.0]).unwrap(), vec![1.5, -0.5, 0.6]);
        assert_eq!(m.predict_encoded(&[0.0, 0.0]).unwrap(), 0);
        assert_eq!(m.predict_encoded(&[1.0, 20.0]).unwrap(), 1);
        assert_eq!(m.decode(1).unwrap(), "y");
    }

    #[test]
    fn threshold_is_strict_less_than() {
        let m = three_class();
        // a == 0.5 goes to `no`
        assert_eq!(m.margins(&[0.5, 0.0]).unwrap()[0], -0.5);
    }

    #[test]
    fn nan_follows_missing_branch() {
        let dump = r#"[{"nodeid":0,"split":"a","split_condition":0.5,"yes":1,"no":2,"missing":2,
            "children":[{"nodeid":1,"leaf":1.0},{"nodeid":2,"leaf":-1.0}]},
            {"nodeid":0,"leaf":0.0},{"nodeid":0,"leaf":0.0}]"#;
        let m = Model::from_json(dump, META_3).unwrap();
        assert_eq!(m.margins(&[f32::NAN, 0.0]).unwrap()[0], -0.5);
    }

    #[test]
    fn ties_go_to_first_class() {
        let dump = r#"[{"nodeid":0,"leaf":0.2},{"nodeid":0,"leaf":0.2},{"nodeid":0,"leaf":0.2}]"#;
        let m = Model::from_json(dump, META_3).unwrap();
        assert_eq!(m.predict_encoded(&[0.0, 0.0]).unwrap(), 0);
    }

    #[test]
    fn binary_uses_sigmoid_over_logit_base() {
        let meta = r#"{"feat_list": ["a"], "classes": ["no", "yes"], "base_score": 0.5}"#;
        let dump = format!("[{}]", stump("f0", 1.0, -2.0, 2.0));
        let m = Model::from_json(&dump, meta).unwrap();

        assert_eq!(m.predict_encoded(&[0.0]).unwrap(), 0);
        assert_eq!(m.predict_encoded(&[3.0]).unwrap(), 1);
        let p = m.predict_proba(&[3.0]).unwrap();
        assert!((p[0] + p[1] - 1.0).abs() < 1e-6);
        assert!(p[1] > 0.88 && p[1] < 0.89);
    }

    #[test]
    fn softmax_probabilities_sum_to_one() {
        let p = three_class().predict_proba(&[0.0, 0.0]).unwrap();
        assert!((p.iter().sum::<f32>() - 1.0).abs() < 1e-6);
        assert!(p[0] > p[2] && p[2] > p[1]);
    }

    #[test]
    fn feature_length_is_checked() {
        match three_class().margins(&[0.0]) {
            Err(ModelError::FeatureLength { got: 1, expected: 2 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn decode_out_of_range_fails() {
        assert!(matches!(three_class().decode(3), Err(ModelError::UnknownClass(3))));
    }

    #[test]
    fn unknown_split_feature_is_rejected() {
        let dump = format!(
            "[{},{},{}]",
            stump("c", 0.5, 1.0, -1.0),
            stump("a", 0.5, 1.0, -1.0),
            stump("a", 0.5, 1.0, -1.0)
        );
        let err = Model::from_json(&dump, META_3).err().unwrap();
        assert!(format!("{:#}", err).contains("not in feat_list"));
    }

    #[test]
    fn dangling_child_is_rejected() {
        let dump = r#"[{"nodeid":0,"split":"a","split_condition":0.5,"yes":1,"no":7,
            "children":[{"nodeid":1,"leaf":1.0},{"nodeid":2,"leaf":-1.0}]},
            {"nodeid":0,"leaf":0.0},{"nodeid":0,"leaf":0.0}]"#;
        assert!(Model::from_json(dump, META_3).is_err());
    }

    #[test]
    fn uneven_tree_count_is_rejected() {
        let dump = r#"[{"nodeid":0,"leaf":0.1},{"nodeid":0,"leaf":0.1}]"#;
        assert!(Model::from_json(dump, META_3).is_err());
    }
}

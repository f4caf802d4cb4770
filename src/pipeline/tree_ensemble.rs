//! Gradient-boosted tree classifier read from XGBoost's native JSON model.
//!
//! Only the fields needed for prediction are read: per-tree node arrays,
//! `tree_info` (tree → class), `learner_model_param` and the objective name.

use serde::Deserialize;

use super::classifier::{check_input_width, check_output_width, Classifier};
use super::probability::sigmoid;
use super::{PipelineError, ProbabilityVector};

// ═══════════════════════════════════════════════════════════
// Export format
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Deserialize)]
pub struct XgbModel {
    pub learner: XgbLearner,
}

#[derive(Debug, Deserialize)]
pub struct XgbLearner {
    pub gradient_booster: XgbBooster,
    pub learner_model_param: XgbModelParam,
    pub objective: XgbObjective,
}

#[derive(Debug, Deserialize)]
pub struct XgbBooster {
    pub name: String,
    #[serde(default)]
    pub model: Option<XgbTreeModel>,
}

#[derive(Debug, Deserialize)]
pub struct XgbTreeModel {
    pub trees: Vec<XgbTree>,
    pub tree_info: Vec<usize>,
}

#[derive(Debug, Deserialize)]
pub struct XgbTree {
    pub left_children: Vec<i64>,
    pub right_children: Vec<i64>,
    pub split_indices: Vec<u32>,
    pub split_conditions: Vec<f32>,
    pub default_left: Vec<Flag>,
    /// 0 numerical, 1 categorical. Absent in exports older than 1.6.
    #[serde(default)]
    pub split_type: Vec<u8>,
}

/// `default_left` entries are integers in older exports and booleans in newer ones.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

/// XGBoost stores these as strings.
#[derive(Debug, Deserialize)]
pub struct XgbModelParam {
    pub base_score: String,
    pub num_class: String,
    pub num_feature: String,
}

#[derive(Debug, Deserialize)]
pub struct XgbObjective {
    pub name: String,
}

// ═══════════════════════════════════════════════════════════
// Evaluated model
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
    Leaf(f32),
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn leaf_value(&self, x: &[f32]) -> f32 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let fv = x[feature];
                    idx = if fv.is_nan() {
                        if default_left {
                            left
                        } else {
                            right
                        }
                    } else if fv < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    /// One margin per class, softmax over margins.
    Softmax,
    /// Single margin, sigmoid, expanded to `[1 - p, p]`.
    Logistic,
}

/// Boosted tree ensemble evaluated natively.
#[derive(Debug, Clone)]
pub struct TreeEnsembleClassifier {
    name: String,
    trees: Vec<Tree>,
    tree_class: Vec<usize>,
    base_margin: Vec<f32>,
    link: Link,
    n_features: usize,
    n_classes: usize,
}

impl TreeEnsembleClassifier {
    pub fn from_export(name: impl Into<String>, export: XgbModel) -> Result<Self, String> {
        let learner = export.learner;
        if learner.gradient_booster.name != "gbtree" {
            return Err(format!(
                "unsupported booster '{}', expected gbtree",
                learner.gradient_booster.name
            ));
        }
        let model = learner
            .gradient_booster
            .model
            .ok_or("gbtree booster has no model section")?;

        let param = &learner.learner_model_param;
        let n_features: usize = param
            .num_feature
            .trim()
            .parse()
            .map_err(|_| format!("bad num_feature '{}'", param.num_feature))?;
        let num_class: usize = param
            .num_class
            .trim()
            .parse()
            .map_err(|_| format!("bad num_class '{}'", param.num_class))?;
        let base_scores = parse_base_score(&param.base_score)?;

        let (link, n_classes, n_margins) = match learner.objective.name.as_str() {
            "multi:softprob" | "multi:softmax" if num_class >= 2 => {
                (Link::Softmax, num_class, num_class)
            }
            "binary:logistic" => (Link::Logistic, 2, 1),
            other => {
                return Err(format!(
                    "unsupported objective '{other}' with num_class={num_class}"
                ))
            }
        };

        let base_margin = match (link, base_scores.as_slice()) {
            (Link::Softmax, [single]) => vec![*single; n_margins],
            (Link::Softmax, many) if many.len() == n_margins => many.to_vec(),
            (Link::Logistic, [p]) if *p > 0.0 && *p < 1.0 => vec![(p / (1.0 - p)).ln()],
            _ => {
                return Err(format!(
                    "base_score '{}' does not fit {n_margins} margin(s)",
                    param.base_score
                ))
            }
        };

        if model.trees.len() != model.tree_info.len() {
            return Err(format!(
                "{} trees but {} tree_info entries",
                model.trees.len(),
                model.tree_info.len()
            ));
        }
        if model.trees.is_empty() {
            return Err("model has no trees".into());
        }
        if let Some(bad) = model.tree_info.iter().find(|&&c| c >= n_margins) {
            return Err(format!("tree_info refers to class {bad} of {n_margins}"));
        }

        let trees = model
            .trees
            .iter()
            .enumerate()
            .map(|(t, raw)| build_tree(raw, n_features).map_err(|e| format!("tree {t}: {e}")))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name: name.into(),
            trees,
            tree_class: model.tree_info,
            base_margin,
            link,
            n_features,
            n_classes,
        })
    }

    fn margins(&self, x: &[f32]) -> Vec<f32> {
        let mut margins = self.base_margin.clone();
        for (tree, &class) in self.trees.iter().zip(&self.tree_class) {
            margins[class] += tree.leaf_value(x);
        }
        margins
    }
}

impl Classifier for TreeEnsembleClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, features: &[f32]) -> Result<ProbabilityVector, PipelineError> {
        check_input_width(self, features)?;
        let margins = self.margins(features);
        let probs = match self.link {
            Link::Softmax => ProbabilityVector::from_logits(&margins)?,
            Link::Logistic => {
                let p = sigmoid(margins[0]);
                ProbabilityVector::new(vec![1.0 - p, p])?
            }
        };
        check_output_width(self, &probs)?;
        Ok(probs)
    }
}

/// Accepts `"5E-1"`, `"[5E-1]"` and `"[1E-1,2E-1,...]"`.
fn parse_base_score(raw: &str) -> Result<Vec<f32>, String> {
    let inner = raw.trim().trim_start_matches('[').trim_end_matches(']');
    inner
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<f32>()
                .map_err(|_| format!("bad base_score '{raw}'"))
        })
        .collect()
}

fn build_tree(raw: &XgbTree, n_features: usize) -> Result<Tree, String> {
    let n = raw.left_children.len();
    if n == 0 {
        return Err("empty tree".into());
    }
    if raw.right_children.len() != n
        || raw.split_indices.len() != n
        || raw.split_conditions.len() != n
        || raw.default_left.len() != n
    {
        return Err("node arrays have different lengths".into());
    }
    if !raw.split_type.is_empty() && raw.split_type.len() != n {
        return Err("split_type length differs from node count".into());
    }
    if let Some(i) = raw.split_type.iter().position(|&t| t != 0) {
        return Err(format!("node {i} uses a categorical split, which is not supported"));
    }

    let mut nodes = Vec::with_capacity(n);
    for i in 0..n {
        let (left, right) = (raw.left_children[i], raw.right_children[i]);
        if left == -1 {
            nodes.push(Node::Leaf(raw.split_conditions[i]));
            continue;
        }
        // Children are always stored after their parent, which also rules out cycles.
        let child = |c: i64| -> Result<usize, String> {
            usize::try_from(c)
                .ok()
                .filter(|&c| c > i && c < n)
                .ok_or_else(|| format!("node {i} has invalid child {c}"))
        };
        let feature = raw.split_indices[i] as usize;
        if feature >= n_features {
            return Err(format!(
                "node {i} splits on feature {feature} of {n_features}"
            ));
        }
        nodes.push(Node::Split {
            feature,
            threshold: raw.split_conditions[i],
            left: child(left)?,
            right: child(right)?,
            default_left: raw.default_left[i].is_set(),
        });
    }
    Ok(Tree { nodes })
}

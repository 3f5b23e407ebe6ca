//! Bounded-depth categorical decision tree
//!
//! Exact-greedy construction in the CART style, adapted to categorical
//! features: every split is multiway (one branch per code observed at the
//! node) and is chosen by the largest reduction of Gini impurity. Equal gains
//! go to the lower attribute index.
//!
//! Leaves predict the majority label of their training records; a tie goes to
//! `false` (on time). At prediction time a code with no branch at some node
//! stops the walk there and returns that node's majority label.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::dataset::Attribute;
use crate::encoding::FeatureEncoder;
use crate::errors::{AnalysisError, Result};
use crate::metrics::LABEL_NAMES;

/// Minimum impurity decrease for a split to count as an improvement
const MIN_GAIN: f64 = 1e-12;

/// Tree growth limits
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub max_depth: usize,
    /// Nodes with fewer records than this become leaves
    pub min_samples_split: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 4,
            min_samples_split: 2,
        }
    }
}

/// Multiway split of an internal node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSplit {
    /// Feature index (see [`Attribute::ALL`])
    pub attribute: usize,
    /// Encoded value -> child node id
    pub branches: BTreeMap<u32, usize>,
}

/// Tree node; internal when `split` is set, leaf otherwise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: usize,
    pub depth: usize,
    /// Training label counts, `[on time, delayed]`
    pub votes: [usize; 2],
    /// Majority label of `votes`
    pub prediction: bool,
    pub split: Option<NodeSplit>,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.split.is_none()
    }
}

/// A prediction and the route that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreePrediction {
    pub label: bool,
    /// Node whose majority label was returned
    pub node: usize,
    /// `(feature index, code)` decisions taken from the root
    pub path: Vec<(usize, u32)>,
    /// The walk stopped early on a code without a branch
    pub fallback: bool,
}

/// Fitted decision tree. Node `0` is the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionTree {
    config: TreeConfig,
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Grow a tree on encoded rows and their labels
    pub fn fit(config: TreeConfig, features: &[Vec<u32>], labels: &[bool]) -> Result<Self> {
        if features.is_empty() {
            return Err(AnalysisError::EmptyDataset {
                stage: "decision tree",
            });
        }
        if features.len() != labels.len() {
            return Err(AnalysisError::InvalidParameters(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        let feature_count = features[0].len();
        if features.iter().any(|row| row.len() != feature_count) {
            return Err(AnalysisError::InvalidParameters(
                "feature rows have inconsistent lengths".to_string(),
            ));
        }

        let builder = TreeBuilder {
            config: &config,
            features,
            labels,
            feature_count,
        };
        let mut nodes = Vec::new();
        let indices: Vec<usize> = (0..features.len()).collect();
        builder.build_node(&indices, 0, &mut nodes);

        let tree = Self { config, nodes };
        debug!(
            nodes = tree.node_count(),
            leaves = tree.leaf_count(),
            depth = tree.depth(),
            "fitted decision tree"
        );
        Ok(tree)
    }

    /// Predicted label for one encoded row
    pub fn predict(&self, features: &[u32]) -> bool {
        self.predict_explained(features).label
    }

    /// Predicted label plus the node and decisions that produced it
    pub fn predict_explained(&self, features: &[u32]) -> TreePrediction {
        let mut path = Vec::new();
        let mut idx = 0usize;

        loop {
            let node = &self.nodes[idx];
            let Some(split) = &node.split else {
                return TreePrediction {
                    label: node.prediction,
                    node: idx,
                    path,
                    fallback: false,
                };
            };

            let next = features
                .get(split.attribute)
                .and_then(|code| split.branches.get(code).map(|&child| (*code, child)));

            match next {
                Some((code, child)) => {
                    path.push((split.attribute, code));
                    idx = child;
                }
                None => {
                    return TreePrediction {
                        label: node.prediction,
                        node: idx,
                        path,
                        fallback: true,
                    }
                }
            }
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// Deepest leaf depth (a single leaf has depth 0)
    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Indented text view with decoded category names and leaf votes
    pub fn render(&self, encoder: &FeatureEncoder) -> String {
        let mut out = String::new();
        self.render_node(0, 0, encoder, &mut out);
        out
    }

    fn render_node(&self, idx: usize, indent: usize, encoder: &FeatureEncoder, out: &mut String) {
        let node = &self.nodes[idx];
        let prefix = "|   ".repeat(indent);

        match &node.split {
            None => out.push_str(&format!(
                "{prefix}|--- class: {} (on time={}, delayed={})\n",
                LABEL_NAMES[node.prediction as usize], node.votes[0], node.votes[1]
            )),
            Some(split) => {
                let attribute = Attribute::from_index(split.attribute);
                for (&code, &child) in &split.branches {
                    let (name, value) = match attribute {
                        Some(a) => (a.column().to_string(), encoder.decode(a, code).to_string()),
                        None => (format!("feature_{}", split.attribute), code.to_string()),
                    };
                    out.push_str(&format!("{prefix}|--- {name} = {value}\n"));
                    self.render_node(child, indent + 1, encoder, out);
                }
            }
        }
    }
}

/// Candidate split with its impurity decrease
#[derive(Debug)]
struct SplitCandidate {
    attribute: usize,
    gain: f64,
    groups: BTreeMap<u32, Vec<usize>>,
}

struct TreeBuilder<'a> {
    config: &'a TreeConfig,
    features: &'a [Vec<u32>],
    labels: &'a [bool],
    feature_count: usize,
}

impl TreeBuilder<'_> {
    /// Recursively build nodes; returns the id of the node created
    fn build_node(&self, indices: &[usize], depth: usize, nodes: &mut Vec<TreeNode>) -> usize {
        let current = nodes.len();
        let votes = self.votes(indices);
        nodes.push(TreeNode {
            id: current,
            depth,
            votes,
            prediction: votes[1] > votes[0],
            split: None,
        });

        let pure = votes[0] == 0 || votes[1] == 0;
        if depth >= self.config.max_depth || pure || indices.len() < self.config.min_samples_split {
            return current;
        }

        let Some(best) = self.find_best_split(indices) else {
            return current;
        };

        let mut branches = BTreeMap::new();
        for (code, group) in &best.groups {
            let child = self.build_node(group, depth + 1, nodes);
            branches.insert(*code, child);
        }

        nodes[current].split = Some(NodeSplit {
            attribute: best.attribute,
            branches,
        });
        current
    }

    fn find_best_split(&self, indices: &[usize]) -> Option<SplitCandidate> {
        let parent = gini(self.votes(indices));
        let n = indices.len() as f64;
        let mut best: Option<SplitCandidate> = None;

        for attribute in 0..self.feature_count {
            let mut groups: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
            for &idx in indices {
                groups.entry(self.features[idx][attribute]).or_default().push(idx);
            }
            if groups.len() < 2 {
                continue;
            }

            let weighted: f64 = groups
                .values()
                .map(|g| (g.len() as f64 / n) * gini(self.votes(g)))
                .sum();
            let gain = parent - weighted;
            if gain <= MIN_GAIN {
                continue;
            }

            let candidate = SplitCandidate {
                attribute,
                gain,
                groups,
            };

            // Attributes are scanned in ascending order; an equal gain keeps the earlier one.
            let better = best
                .as_ref()
                .map_or(true, |current| candidate.gain > current.gain + MIN_GAIN);
            if better {
                best = Some(candidate);
            }
        }

        best
    }

    fn votes(&self, indices: &[usize]) -> [usize; 2] {
        let delayed = indices.iter().filter(|&&i| self.labels[i]).count();
        [indices.len() - delayed, delayed]
    }
}

/// Gini impurity of a two-label vote count
fn gini(votes: [usize; 2]) -> f64 {
    let total = votes[0] + votes[1];
    if total == 0 {
        return 0.0;
    }
    let p0 = votes[0] as f64 / total as f64;
    let p1 = votes[1] as f64 / total as f64;
    1.0 - p0 * p0 - p1 * p1
}

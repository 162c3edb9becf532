use serde::{Deserialize, Serialize};

use crate::config::TreeConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        positives: usize,
        negatives: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub feature_count: usize,
    pub root: Node,
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    pub fn fit(rows: &[Vec<f64>], labels: &[bool], config: &TreeConfig) -> Option<Self> {
        if rows.is_empty() || rows.len() != labels.len() {
            return None;
        }
        let feature_count = rows[0].len();
        let indices: Vec<usize> = (0..rows.len()).collect();
        let root = grow(rows, labels, &indices, 0, config);
        Some(Self {
            feature_count,
            root,
        })
    }

    pub fn predict(&self, features: &[f64]) -> bool {
        let mut node = &self.root;
        loop {
            match node {
                Node::Leaf {
                    positives,
                    negatives,
                } => return positives >= negatives,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature).copied().unwrap_or(0.0);
                    node = if value <= *threshold { left } else { right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(node: &Node) -> usize {
            match node {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(left).max(walk(right)),
            }
        }
        walk(&self.root)
    }
}

fn grow(
    rows: &[Vec<f64>],
    labels: &[bool],
    indices: &[usize],
    depth: usize,
    config: &TreeConfig,
) -> Node {
    let positives = indices.iter().filter(|&&i| labels[i]).count();
    let negatives = indices.len() - positives;
    let leaf = Node::Leaf {
        positives,
        negatives,
    };

    if positives == 0
        || negatives == 0
        || depth >= config.max_depth
        || indices.len() < config.min_samples_split.max(2)
    {
        return leaf;
    }

    let parent_impurity = gini(positives, negatives);
    let split = match best_split(rows, labels, indices) {
        Some(split) if split.impurity < parent_impurity => split,
        _ => return leaf,
    };

    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .partition(|&&i| rows[i][split.feature] <= split.threshold);

    Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left: Box::new(grow(rows, labels, &left, depth + 1, config)),
        right: Box::new(grow(rows, labels, &right, depth + 1, config)),
    }
}

fn best_split(rows: &[Vec<f64>], labels: &[bool], indices: &[usize]) -> Option<Split> {
    let feature_count = rows[indices[0]].len();
    let total = indices.len();
    let total_positives = indices.iter().filter(|&&i| labels[i]).count();
    let mut best: Option<Split> = None;

    for feature in 0..feature_count {
        let mut sorted = indices.to_vec();
        sorted.sort_by(|&a, &b| {
            rows[a][feature]
                .partial_cmp(&rows[b][feature])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut left_positives = 0usize;
        for position in 0..total - 1 {
            if labels[sorted[position]] {
                left_positives += 1;
            }
            let current = rows[sorted[position]][feature];
            let next = rows[sorted[position + 1]][feature];
            if current == next {
                continue;
            }

            let left_count = position + 1;
            let right_count = total - left_count;
            let right_positives = total_positives - left_positives;
            let impurity = (left_count as f64
                * gini(left_positives, left_count - left_positives)
                + right_count as f64 * gini(right_positives, right_count - right_positives))
                / total as f64;

            // Strictly better only, so ties keep the earliest feature and threshold.
            if best.map_or(true, |b| impurity < b.impurity) {
                best = Some(Split {
                    feature,
                    threshold: current + (next - current) / 2.0,
                    impurity,
                });
            }
        }
    }

    best
}

fn gini(positives: usize, negatives: usize) -> f64 {
    let total = (positives + negatives) as f64;
    if total == 0.0 {
        return 0.0;
    }
    let p = positives as f64 / total;
    let n = negatives as f64 / total;
    1.0 - p * p - n * n
}

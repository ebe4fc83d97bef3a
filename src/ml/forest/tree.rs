use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::Rng;
use std::cmp::Ordering;

/// Values closer than this are treated as equal when looking for split points
const FEATURE_THRESHOLD: f64 = 1e-7;

/// Growth limits for a single CART tree
#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features examined per split (at least one non-constant feature is always examined)
    pub max_features: usize,
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        positive_fraction: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Binary classification tree grown on Gini impurity
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<Node>,
    /// Total weighted impurity decrease per feature, unnormalised
    impurity_decrease: Vec<f64>,
    depth: usize,
}

struct PendingNode {
    id: usize,
    samples: Vec<usize>,
    depth: usize,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    children_impurity: f64,
}

impl DecisionTree {
    /// Grow a tree on the rows named by `samples` (duplicates act as weights)
    pub fn fit(
        features: &Array2<f64>,
        labels: &[bool],
        samples: Vec<usize>,
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Self {
        let n_features = features.ncols();
        let mut tree = Self {
            nodes: vec![Node::Leaf { positive_fraction: 0.0 }],
            impurity_decrease: vec![0.0; n_features],
            depth: 0,
        };

        let mut stack = vec![PendingNode { id: 0, samples, depth: 0 }];
        while let Some(pending) = stack.pop() {
            tree.depth = tree.depth.max(pending.depth);

            let n_node = pending.samples.len();
            let positives = pending.samples.iter().filter(|&&i| labels[i]).count();
            let impurity = gini(positives, n_node);
            let positive_fraction = if n_node == 0 { 0.0 } else { positives as f64 / n_node as f64 };

            let depth_reached = params.max_depth.map_or(false, |max| pending.depth >= max);
            let can_split = !depth_reached
                && n_node >= params.min_samples_split
                && n_node >= 2 * params.min_samples_leaf
                && impurity > 0.0;

            let best = if can_split {
                find_best_split(features, labels, &pending.samples, params, rng)
            } else {
                None
            };

            let Some(best) = best else {
                tree.nodes[pending.id] = Node::Leaf { positive_fraction };
                continue;
            };

            tree.impurity_decrease[best.feature] += n_node as f64 * impurity - best.children_impurity;

            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = pending
                .samples
                .iter()
                .partition(|&&i| features[[i, best.feature]] <= best.threshold);

            let left = tree.nodes.len();
            tree.nodes.push(Node::Leaf { positive_fraction: 0.0 });
            let right = tree.nodes.len();
            tree.nodes.push(Node::Leaf { positive_fraction: 0.0 });

            tree.nodes[pending.id] = Node::Split {
                feature: best.feature,
                threshold: best.threshold,
                left,
                right,
            };

            stack.push(PendingNode { id: right, samples: right_samples, depth: pending.depth + 1 });
            stack.push(PendingNode { id: left, samples: left_samples, depth: pending.depth + 1 });
        }

        tree
    }

    /// Fraction of positive training samples in the leaf this row falls into
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut id = 0;
        loop {
            match &self.nodes[id] {
                Node::Leaf { positive_fraction } => return *positive_fraction,
                Node::Split { feature, threshold, left, right } => {
                    id = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    /// Impurity decrease per feature normalised to sum to 1 (all zeros for a single-leaf tree)
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.impurity_decrease.iter().sum();
        if total > 0.0 {
            self.impurity_decrease.iter().map(|v| v / total).collect()
        } else {
            vec![0.0; self.impurity_decrease.len()]
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}

/// Gini impurity of a binary node: 2p(1-p)
fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}

/// Scan features in random order. Stops after `max_features` features unless every one seen so far
/// was constant on this node.
fn find_best_split(
    features: &Array2<f64>,
    labels: &[bool],
    samples: &[usize],
    params: &TreeParams,
    rng: &mut StdRng,
) -> Option<BestSplit> {
    let n_features = features.ncols();
    let mut order: Vec<usize> = (0..n_features).collect();
    let mut best: Option<BestSplit> = None;
    let mut visited = 0;
    let mut non_constant = 0;

    for k in 0..n_features {
        if visited >= params.max_features && non_constant > 0 {
            break;
        }
        // Incremental Fisher-Yates so only the visited prefix is drawn
        let pick = rng.gen_range(k..n_features);
        order.swap(k, pick);
        let feature = order[k];
        visited += 1;

        let mut column: Vec<(f64, bool)> = samples.iter().map(|&i| (features[[i, feature]], labels[i])).collect();
        column.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        let (first, last) = (column[0].0, column[column.len() - 1].0);
        if last <= first + FEATURE_THRESHOLD {
            continue;
        }
        non_constant += 1;

        if let Some(candidate) = best_threshold(&column, feature, params.min_samples_leaf) {
            let better = best
                .as_ref()
                .map_or(true, |b| candidate.children_impurity < b.children_impurity);
            if better {
                best = Some(candidate);
            }
        }
    }

    best
}

/// Lowest weighted child impurity over all split points of one sorted column
fn best_threshold(column: &[(f64, bool)], feature: usize, min_samples_leaf: usize) -> Option<BestSplit> {
    let n = column.len();
    let total_positives = column.iter().filter(|(_, y)| *y).count();
    let mut left_positives = 0;
    let mut best: Option<BestSplit> = None;

    for k in 0..n - 1 {
        if column[k].1 {
            left_positives += 1;
        }
        let n_left = k + 1;
        let n_right = n - n_left;
        if n_left < min_samples_leaf || n_right < min_samples_leaf {
            continue;
        }
        let (value, next) = (column[k].0, column[k + 1].0);
        if next <= value + FEATURE_THRESHOLD {
            continue;
        }

        let children_impurity = n_left as f64 * gini(left_positives, n_left)
            + n_right as f64 * gini(total_positives - left_positives, n_right);

        if best.as_ref().map_or(true, |b| children_impurity < b.children_impurity) {
            let mut threshold = (value + next) / 2.0;
            if threshold >= next {
                threshold = value;
            }
            best = Some(BestSplit { feature, threshold, children_impurity });
        }
    }

    best
}

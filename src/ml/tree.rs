// ============================================================
// Layer 5 — CART Decision Tree
// ============================================================
// Binary classification tree grown greedily on Gini impurity:
//
//   gini(node) = 1 − Σ_c p_c²
//
// At every node, each candidate feature is scanned in sorted
// order and the threshold (midpoint between two consecutive
// distinct values) minimising the size-weighted child impurity
// is chosen. Rows with `value <= threshold` go left.
//
// Leaves store the class distribution of their rows, so
// predict_proba returns that distribution directly.
//
// Node rows are kept as one index list per feature, already
// sorted by that feature. A split partitions every list
// stably, so children inherit sorted order and the tree never
// re-sorts below the root.
//
// The same tree backs the random forest: bootstrap rows and
// per-node feature subsampling come in through `fit_rows`.
//
// Reference: Breiman et al. (1984) Classification and Regression Trees

use rand::{rngs::StdRng, seq::index::sample, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::errors::FitError;
use crate::domain::traits::Classifier;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small
    pub max_depth:         Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf:  usize,
    /// Features examined per node; `None` = all
    pub max_features:      Option<usize>,
    pub seed:              u64,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth:         None,
            min_samples_split: 2,
            min_samples_leaf:  1,
            max_features:      None,
            seed:              42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature:   usize,
        threshold: f64,
        left:      usize,
        right:     usize,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    params:    TreeParams,
    nodes:     Vec<TreeNode>,
    n_classes: usize,
}

impl DecisionTree {
    pub fn new(params: TreeParams) -> Self {
        Self { params, nodes: Vec::new(), n_classes: 0 }
    }

    /// Longest root-to-leaf path (root alone = 0)
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[TreeNode], at: usize) -> usize {
            match &nodes[at] {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() { 0 } else { walk(&self.nodes, 0) }
    }

    /// Grow the tree on the given row indices (duplicates allowed).
    pub fn fit_rows(
        &mut self,
        x:         &[Vec<f64>],
        y:         &[usize],
        n_classes: usize,
        rows:      &[usize],
        rng:       &mut StdRng,
    ) -> Result<(), FitError> {
        if rows.is_empty() {
            return Err(FitError::InsufficientData("decision tree needs at least one row".into()));
        }
        if n_classes == 0 {
            return Err(FitError::InsufficientData("no classes to learn".into()));
        }

        self.nodes.clear();
        self.n_classes = n_classes;

        let n_features = x[rows[0]].len();
        let sorted = presort(x, rows, n_features);
        let mut builder = CartBuilder {
            x,
            y,
            n_classes,
            n_features,
            params: &self.params,
            rng,
            nodes: Vec::new(),
        };
        builder.grow(sorted, 0);
        self.nodes = builder.nodes;
        tracing::trace!("CART grown: {} nodes, depth {}", self.nodes.len(), self.depth());
        Ok(())
    }

    /// Class distribution of the leaf `row` falls into.
    pub fn leaf_distribution(&self, row: &[f64]) -> Result<&[f64], FitError> {
        if self.nodes.is_empty() {
            return Err(FitError::NotFitted);
        }
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                TreeNode::Leaf { distribution } => return Ok(distribution),
                TreeNode::Split { feature, threshold, left, right } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

impl Classifier for DecisionTree {
    fn fit(&mut self, x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<(), FitError> {
        let rows: Vec<usize> = (0..x.len()).collect();
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        self.fit_rows(x, y, n_classes, &rows, &mut rng)
    }

    fn predict_proba(&self, x: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, FitError> {
        x.iter()
            .map(|row| self.leaf_distribution(row).map(<[f64]>::to_vec))
            .collect()
    }
}

// ─── Presorted node rows ──────────────────────────────────────────────────────

/// One row-index list per feature, each sorted by that feature.
pub(crate) type SortedRows = Vec<Vec<usize>>;

pub(crate) fn presort(x: &[Vec<f64>], rows: &[usize], n_features: usize) -> SortedRows {
    (0..n_features)
        .map(|f| {
            let mut idx = rows.to_vec();
            idx.sort_by(|&a, &b| x[a][f].total_cmp(&x[b][f]));
            idx
        })
        .collect()
}

/// Stable partition of every list on `x[feature] <= threshold`.
pub(crate) fn partition(
    x:         &[Vec<f64>],
    sorted:    SortedRows,
    feature:   usize,
    threshold: f64,
) -> (SortedRows, SortedRows) {
    sorted
        .into_iter()
        .map(|list| -> (Vec<usize>, Vec<usize>) {
            list.into_iter().partition(|&r| x[r][feature] <= threshold)
        })
        .unzip()
}

// ─── Builder ──────────────────────────────────────────────────────────────────

struct CartBuilder<'a> {
    x:          &'a [Vec<f64>],
    y:          &'a [usize],
    n_classes:  usize,
    n_features: usize,
    params:     &'a TreeParams,
    rng:        &'a mut StdRng,
    nodes:      Vec<TreeNode>,
}

struct BestSplit {
    feature:   usize,
    threshold: f64,
    impurity:  f64,
}

impl CartBuilder<'_> {
    /// Grow the subtree for `sorted` rows, returning its node index.
    fn grow(&mut self, sorted: SortedRows, depth: usize) -> usize {
        let rows   = &sorted[0];
        let n      = rows.len();
        let counts = self.class_counts(rows);
        let parent = gini(&counts, n);

        let depth_left = self.params.max_depth.map_or(true, |d| depth < d);
        let splittable = depth_left && n >= self.params.min_samples_split.max(2) && parent > 0.0;

        let best = if splittable { self.best_split(&sorted, n) } else { None };

        match best {
            Some(split) if split.impurity < parent - 1e-12 => {
                let at = self.nodes.len();
                // Placeholder, patched once both children exist
                self.nodes.push(TreeNode::Leaf { distribution: Vec::new() });

                let (left_rows, right_rows) = partition(self.x, sorted, split.feature, split.threshold);
                let left  = self.grow(left_rows, depth + 1);
                let right = self.grow(right_rows, depth + 1);

                self.nodes[at] = TreeNode::Split {
                    feature:   split.feature,
                    threshold: split.threshold,
                    left,
                    right,
                };
                at
            }
            _ => {
                let distribution = counts.iter().map(|&c| c as f64 / n as f64).collect();
                self.nodes.push(TreeNode::Leaf { distribution });
                self.nodes.len() - 1
            }
        }
    }

    fn class_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_classes];
        for &r in rows {
            counts[self.y[r]] += 1;
        }
        counts
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        match self.params.max_features {
            Some(m) if m < self.n_features => sample(&mut *self.rng, self.n_features, m.max(1)).into_vec(),
            _ => (0..self.n_features).collect(),
        }
    }

    fn best_split(&mut self, sorted: &SortedRows, n: usize) -> Option<BestSplit> {
        let min_leaf = self.params.min_samples_leaf.max(1);
        let total    = self.class_counts(&sorted[0]);
        let mut best: Option<BestSplit> = None;

        for feature in self.candidate_features() {
            let rows = &sorted[feature];
            let mut left = vec![0usize; self.n_classes];

            for i in 0..n - 1 {
                left[self.y[rows[i]]] += 1;

                let here = self.x[rows[i]][feature];
                let next = self.x[rows[i + 1]][feature];
                if here >= next {
                    continue;
                }
                let n_left  = i + 1;
                let n_right = n - n_left;
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let right: Vec<usize> = total.iter().zip(&left).map(|(t, l)| t - l).collect();
                let impurity = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;

                if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(BestSplit {
                        feature,
                        threshold: here + (next - here) / 2.0,
                        impurity,
                    });
                }
            }
        }
        best
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n as f64;
            p * p
        })
        .sum::<f64>()
}

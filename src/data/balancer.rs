// ============================================================
// Layer 4 — Class Balancer (SMOTE)
// ============================================================
// Corrects class-count skew in the TRAINING partition only.
//
// Synthetic Minority Over-sampling TEchnique:
//
//   for every class below the target count:
//       repeat until the class reaches the target:
//           x   ← random real member of the class
//           nn  ← one of x's k nearest same-class neighbours
//           gap ← uniform [0, 1)
//           emit x + gap · (nn − x)
//
// Every synthetic row lies on the segment between two real
// members of the same class, so it never leaves that class's
// region of feature space.
//
// Target = configured target, or the majority class count.
// Classes already at or above the target are left alone.
//
// Small classes:
//   - fewer than k+1 members → k shrinks to (members − 1)
//   - a single member        → BalancingError (no neighbour
//                              to interpolate towards)
//   - no member at all       → BalancingError (every row of the
//                              class landed in the test split)
//
// The output keeps every original row first, in the same
// order, followed by the synthetic rows. The test partition is
// never passed in here.
//
// Reference: Chawla et al. (2002) SMOTE, JAIR 16

use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::dataset::Dataset;
use crate::domain::errors::BalancingError;
use crate::domain::label_codec::LabelCodec;

/// SMOTE settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancerConfig {
    /// Neighbours considered per minority sample
    pub k_neighbors: usize,
    /// Member count every class is raised to; `None` = majority count
    pub target:      Option<usize>,
    pub seed:        u64,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self { k_neighbors: 5, target: None, seed: 42 }
    }
}

/// A balanced training set and how many of its rows are synthetic.
#[derive(Debug, Clone)]
pub struct BalancedTrainingSet {
    pub dataset:    Dataset,
    /// Rows `[0, n_original)` are real, the rest synthetic
    pub n_original: usize,
}

impl BalancedTrainingSet {
    pub fn synthetic_count(&self) -> usize {
        self.dataset.len() - self.n_original
    }
}

pub struct SmoteBalancer {
    config: BalancerConfig,
}

impl SmoteBalancer {
    pub fn new(config: BalancerConfig) -> Self {
        Self { config }
    }

    /// Oversample every minority class of `train` up to the target.
    pub fn balance(
        &self,
        train: &Dataset,
        codec: &LabelCodec,
    ) -> Result<BalancedTrainingSet, BalancingError> {
        if train.is_empty() {
            return Err(BalancingError::EmptyTrainingSet);
        }

        let counts   = train.class_counts();
        let majority = counts.iter().copied().max().unwrap_or(0);
        let target   = self.config.target.unwrap_or(majority);
        let mut rng  = StdRng::seed_from_u64(self.config.seed);

        let mut balanced = train.clone();

        for (class, &count) in counts.iter().enumerate() {
            if count >= target {
                continue;
            }
            let class_name = codec
                .classes()
                .get(class)
                .cloned()
                .unwrap_or_else(|| class.to_string());

            if count == 0 {
                return Err(BalancingError::AbsentClass { class: class_name });
            }
            if count < 2 {
                return Err(BalancingError::TooFewMembers { class: class_name, members: count });
            }

            let members: Vec<usize> = (0..train.len())
                .filter(|&i| train.targets[i] == class)
                .collect();
            let k = self.config.k_neighbors.min(count - 1).max(1);
            if k < self.config.k_neighbors {
                tracing::debug!(
                    "Class '{}' has {} members; using k = {} neighbours",
                    class_name,
                    count,
                    k
                );
            }

            let neighbours = nearest_neighbours(&train.features, &members, k);
            let needed     = target - count;

            for _ in 0..needed {
                let a   = rng.gen_range(0..members.len());
                let nn  = neighbours[a][rng.gen_range(0..k)];
                let gap: f64 = rng.gen();

                let base  = &train.features[members[a]];
                let other = &train.features[nn];
                let synthetic: Vec<f64> = base
                    .iter()
                    .zip(other)
                    .map(|(x, y)| x + gap * (y - x))
                    .collect();

                balanced.features.push(synthetic);
                balanced.targets.push(class);
            }

            tracing::info!(
                "SMOTE: class '{}' {} → {} (+{} synthetic)",
                class_name,
                count,
                target,
                needed
            );
        }

        Ok(BalancedTrainingSet {
            dataset:    balanced,
            n_original: train.len(),
        })
    }
}

/// For each member, the row indices of its `k` nearest other members
/// (squared Euclidean distance, ties broken by row order).
fn nearest_neighbours(features: &[Vec<f64>], members: &[usize], k: usize) -> Vec<Vec<usize>> {
    members
        .iter()
        .map(|&i| {
            let mut dists: Vec<(f64, usize)> = members
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| (squared_distance(&features[i], &features[j]), j))
                .collect();
            dists.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
            dists.into_iter().take(k).map(|(_, j)| j).collect()
        })
        .collect()
}

pub(crate) fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

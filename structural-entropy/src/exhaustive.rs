use crate::error::{Error, Result};
use crate::objective::structural_entropy;
use crate::{Clustering, Network, SimpleClustering};
use log::info;

/// Largest network the exhaustive solver accepts. The number of partitions grows as the
/// Bell numbers: 115975 partitions at 10 nodes.
pub const EXHAUSTIVE_MAX_NODES: usize = 10;

/// Reference solver that scores every partition of the node set and keeps the best.
/// Only useful for validating the heuristics on very small networks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Exhaustive;

impl Exhaustive {
    /// The partition of minimum structural entropy and its entropy. Among equally good
    /// partitions the first one enumerated wins.
    pub fn solve(&self, n: &Network) -> Result<(SimpleClustering, f64)> {
        let nodes = n.nodes();
        if nodes == 0 {
            return Err(Error::EmptyGraph);
        }
        if nodes > EXHAUSTIVE_MAX_NODES {
            return Err(Error::TooLargeForExhaustive {
                nodes,
                max: EXHAUSTIVE_MAX_NODES,
            });
        }

        let mut best = SimpleClustering::init_same_cluster(nodes);
        let mut best_entropy = structural_entropy(n, &best);
        let mut visited = 1;

        let mut partitions = RestrictedGrowth::new(nodes);
        while let Some(labels) = partitions.next_labels() {
            let candidate = SimpleClustering::new_from_labels(labels);
            let entropy = structural_entropy(n, &candidate);
            if entropy < best_entropy - 1e-12 {
                best = candidate;
                best_entropy = entropy;
            }
            visited += 1;
        }

        info!("exhaustive search scored {visited} partitions, best entropy {best_entropy:.6}");
        Ok((best, best_entropy))
    }
}

/// Enumerates the set partitions of `0..n` as restricted growth strings:
/// `labels[0] == 0` and `labels[i] <= 1 + max(labels[..i])`.
struct RestrictedGrowth {
    labels: Vec<usize>,
    // running maximum of labels[..=i]
    maxima: Vec<usize>,
}

impl RestrictedGrowth {
    /// Starts at the all-zero string, which is not returned by `next_labels`.
    fn new(n: usize) -> Self {
        RestrictedGrowth {
            labels: vec![0; n],
            maxima: vec![0; n],
        }
    }

    fn next_labels(&mut self) -> Option<&[usize]> {
        let n = self.labels.len();
        // rightmost position that can still be incremented
        let i = (1..n).rev().find(|&i| self.labels[i] <= self.maxima[i - 1])?;

        self.labels[i] += 1;
        self.maxima[i] = self.maxima[i - 1].max(self.labels[i]);
        for j in (i + 1)..n {
            self.labels[j] = 0;
            self.maxima[j] = self.maxima[i];
        }
        Some(&self.labels)
    }
}

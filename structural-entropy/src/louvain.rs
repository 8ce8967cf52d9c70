use crate::budget::{Budget, Cancel, NeverCancel};
use crate::error::{Error, Result};
use crate::local_moving::{LocalMoving, DEFAULT_EPSILON};
use crate::objective::structural_entropy;
use crate::{Clustering, Network, SimpleClustering};
use log::{debug, info, warn};

/// Settings of the multi-level optimizer.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LouvainOptions {
    /// Minimum entropy decrease for a node move to be accepted.
    pub epsilon: f64,
    /// Visit nodes in a random order drawn from this seed. `None` visits nodes in index order.
    pub seed: Option<u64>,
    /// Work limits applied to every local moving pass.
    pub budget: Budget,
}

impl Default for LouvainOptions {
    fn default() -> Self {
        LouvainOptions {
            epsilon: DEFAULT_EPSILON,
            seed: None,
            budget: Budget::unlimited(),
        }
    }
}

/// One level of the multi-level optimization: a network and the clustering of its nodes
/// that the local moving pass converged to. The clusters of level `k` are the nodes of level `k + 1`.
#[derive(Debug, Clone)]
pub struct Level {
    /// Network optimized at this level.
    pub network: Network,
    /// Converged clustering of `network`, with compact labels.
    pub clustering: SimpleClustering,
}

/// Per-level snapshots of a multi-level optimization.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    nodes: usize,
    levels: Vec<Level>,
}

impl Hierarchy {
    /// Levels from the original network upwards.
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    /// Compose the per-level clusterings into a clustering of the original nodes.
    pub fn flatten(&self) -> SimpleClustering {
        let mut flat = SimpleClustering::init_different_clusters(self.nodes);
        for level in &self.levels {
            flat.merge_clusters(&level.clustering);
        }
        flat
    }
}

/// Multi-level structural entropy minimization: local moving to convergence,
/// then contraction of communities into super-nodes, repeated until nothing moves.
pub struct Louvain {
    local_moving: LocalMoving,
}

impl Louvain {
    /// Initialize the optimizer with the given options.
    pub fn new(options: LouvainOptions) -> Louvain {
        Louvain {
            local_moving: LocalMoving::new(options.epsilon, options.seed, options.budget),
        }
    }

    /// Iterate the local moving phase on a single level. Returns true if cluster labels were updated.
    pub fn iterate_one_level<C: Clustering>(&mut self, n: &Network, c: &mut C) -> Result<bool> {
        self.local_moving.iterate(n, c, &NeverCancel)
    }

    /// Improve an existing clustering in place: local moving on `n`, then recursively on the
    /// network of its communities. Returns true if cluster labels were updated.
    /// A clustering where no single node move lowers the entropy is left unchanged.
    pub fn iterate<C: Clustering>(&mut self, n: &Network, c: &mut C) -> Result<bool> {
        if n.nodes() == 0 {
            return Err(Error::EmptyGraph);
        }
        if c.nodes() != n.nodes() {
            return Err(Error::LabelCountMismatch {
                labels: c.nodes(),
                nodes: n.nodes(),
            });
        }

        if !self.local_moving.iterate(n, c, &NeverCancel)? {
            return Ok(false);
        }

        if c.num_clusters() == n.nodes() {
            return Ok(true);
        }

        let reduced_n = n.create_reduced_network(c);
        let mut reduced_clusters = C::init_different_clusters(reduced_n.nodes());
        if reduced_n.nodes() > 1 {
            self.iterate(&reduced_n, &mut reduced_clusters)?;
        }
        c.merge_clusters(&reduced_clusters);

        Ok(true)
    }

    /// Partition the nodes of `n`.
    pub fn run(&mut self, n: &Network) -> Result<SimpleClustering> {
        self.run_cancellable(n, &NeverCancel)
    }

    /// Partition the nodes of `n`, polling `cancel` between sweeps.
    pub fn run_cancellable(&mut self, n: &Network, cancel: &impl Cancel) -> Result<SimpleClustering> {
        let hierarchy = self.run_levels(n, cancel)?;
        let flat = hierarchy.flatten();
        info!(
            "multi-level optimization: {} nodes -> {} communities over {} levels, entropy {:.6}",
            n.nodes(),
            flat.num_clusters(),
            hierarchy.levels.len(),
            structural_entropy(n, &flat)
        );
        Ok(flat)
    }

    /// Run the optimization and keep every level's network and clustering.
    pub fn run_levels(&mut self, n: &Network, cancel: &impl Cancel) -> Result<Hierarchy> {
        if n.nodes() == 0 {
            return Err(Error::EmptyGraph);
        }

        let mut hierarchy = Hierarchy {
            nodes: n.nodes(),
            levels: Vec::new(),
        };

        if n.total_volume() <= 0.0 {
            warn!("network has zero total volume; every node is left in its own community");
            return Ok(hierarchy);
        }

        let mut reduced: Option<Network> = None;
        loop {
            let current = reduced.as_ref().unwrap_or(n);
            let mut clustering = SimpleClustering::init_different_clusters(current.nodes());

            if !self.local_moving.iterate(current, &mut clustering, cancel)? {
                break;
            }

            let next = current.create_reduced_network(&clustering);
            debug!(
                "level {}: {} nodes -> {} communities",
                hierarchy.levels.len(),
                current.nodes(),
                next.nodes()
            );

            hierarchy.levels.push(Level {
                network: current.clone(),
                clustering,
            });

            let collapsed = next.nodes() == 1;
            reduced = Some(next);
            if collapsed {
                break;
            }
        }

        Ok(hierarchy)
    }
}

impl Default for Louvain {
    fn default() -> Self {
        Louvain::new(LouvainOptions::default())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::budget::AtomicCancel;
    use approx::assert_relative_eq;

    /// Two 4-cliques joined by one light edge, plus a pendant pair attached to each clique.
    fn nested() -> Network {
        let mut edges = vec![];
        for block in [0, 4] {
            for i in 0..4 {
                for j in (i + 1)..4 {
                    edges.push((block + i, block + j, 5.0));
                }
            }
        }
        edges.push((3, 4, 0.5));
        edges.push((0, 8, 1.0));
        edges.push((8, 9, 1.0));
        edges.push((7, 10, 1.0));
        edges.push((10, 11, 1.0));
        Network::from_edges(12, edges).unwrap()
    }

    #[test]
    fn test_levels_compose_to_flat() {
        let n = nested();
        let mut louvain = Louvain::default();
        let hierarchy = louvain.run_levels(&n, &NeverCancel).unwrap();
        let flat = louvain.run(&n).unwrap();

        assert!(!hierarchy.levels().is_empty());
        assert_eq!(hierarchy.flatten(), flat);
        assert_eq!(flat.nodes(), 12);

        // each level starts where the previous one ended
        let mut previous = structural_entropy(&n, &SimpleClustering::init_different_clusters(12));
        for level in hierarchy.levels() {
            let start = structural_entropy(
                &level.network,
                &SimpleClustering::init_different_clusters(level.network.nodes()),
            );
            let end = structural_entropy(&level.network, &level.clustering);
            assert_relative_eq!(start, previous, epsilon = 1e-9);
            assert!(end < start);
            previous = end;
        }
        assert_relative_eq!(previous, structural_entropy(&n, &flat), epsilon = 1e-9);
    }

    #[test]
    fn test_one_level_matches_first_level() {
        let n = nested();
        let mut louvain = Louvain::default();
        let hierarchy = louvain.run_levels(&n, &NeverCancel).unwrap();

        let mut c = SimpleClustering::init_different_clusters(n.nodes());
        assert!(louvain.iterate_one_level(&n, &mut c).unwrap());
        assert_eq!(c, hierarchy.levels()[0].clustering);

        // nothing left to move on this level
        assert!(!louvain.iterate_one_level(&n, &mut c).unwrap());
    }

    #[test]
    fn test_empty_and_degenerate() {
        let mut louvain = Louvain::default();
        let empty = Network::from_edges(0, std::iter::empty()).unwrap();
        assert_eq!(louvain.run(&empty), Err(Error::EmptyGraph));

        let isolated = Network::from_edges(3, std::iter::empty()).unwrap();
        let c = louvain.run(&isolated).unwrap();
        assert_eq!(c.labels(), &[0, 1, 2]);
    }

    #[test]
    fn test_cancelled() {
        let cancel = AtomicCancel::new();
        cancel.cancel();
        let mut louvain = Louvain::default();
        assert_eq!(louvain.run_cancellable(&nested(), &cancel), Err(Error::Cancelled));
    }

    #[test]
    fn test_seeded_order_is_reproducible() {
        let n = nested();
        let options = LouvainOptions {
            seed: Some(0xBADC0FFEE0DDF00D),
            ..LouvainOptions::default()
        };
        let a = Louvain::new(options).run(&n).unwrap();
        let b = Louvain::new(options).run(&n).unwrap();
        assert_eq!(a, b);
    }
}

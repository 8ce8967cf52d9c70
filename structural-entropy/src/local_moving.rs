use crate::budget::{Budget, Cancel};
use crate::error::Result;
use crate::stats::{CommunityRecord, CommunityStats};
use crate::{Clustering, Network, ZeroVec};
use log::{debug, warn};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

/// Moves below `-DEFAULT_EPSILON` are accepted; smaller improvements are treated as noise.
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// A clustering of a network together with the community statistics that are kept
/// consistent with it as single nodes move between communities.
pub struct MoveState<'a, C: Clustering> {
    network: &'a Network,
    clustering: &'a mut C,
    stats: CommunityStats,
}

impl<'a, C: Clustering> MoveState<'a, C> {
    /// Tabulate the statistics of `clustering` on `network`.
    pub fn new(network: &'a Network, clustering: &'a mut C) -> Self {
        let stats = CommunityStats::from_clustering(network, clustering);
        MoveState {
            network,
            clustering,
            stats,
        }
    }

    /// Current statistics store.
    pub fn stats(&self) -> &CommunityStats {
        &self.stats
    }

    /// Current clustering.
    pub fn clustering(&self) -> &C {
        self.clustering
    }

    /// Total entropy of the current clustering, from the incrementally maintained statistics.
    pub fn total_entropy(&self) -> f64 {
        self.stats.total_entropy()
    }

    /// Exact change of the total entropy if `node` moved to `target`. Does not modify anything.
    /// `target` must be an existing community id.
    pub fn evaluate_move(&self, node: usize, target: usize) -> f64 {
        let source = self.clustering.get(node);
        if source == target {
            return 0.0;
        }
        let (w_source, w_target) = self.edge_weights_to(node, source, target);
        self.move_delta(node, target, w_source, w_target)
    }

    /// Move `node` to `target`, updating the statistics incrementally.
    pub fn apply_move(&mut self, node: usize, target: usize) {
        let source = self.clustering.get(node);
        if source == target {
            return;
        }
        let (w_source, w_target) = self.edge_weights_to(node, source, target);
        self.commit_move(node, target, w_source, w_target);
    }

    /// Weight of the edges from `node` to the other members of `source` and to members of `target`.
    fn edge_weights_to(&self, node: usize, source: usize, target: usize) -> (f64, f64) {
        let mut w_source = 0.0;
        let mut w_target = 0.0;
        for (neighbor, w) in self.network.neighbors(node) {
            let c = self.clustering.get(neighbor);
            if c == source {
                w_source += w;
            } else if c == target {
                w_target += w;
            }
        }
        (w_source, w_target)
    }

    /// Records of the source and target community after moving `node`.
    ///
    /// Removing the node from its source turns its edges to other source members into
    /// cut edges and stops counting its remaining edges; joining the target does the reverse.
    fn moved_records(&self, node: usize, target: usize, w_source: f64, w_target: f64) -> (CommunityRecord, CommunityRecord) {
        let n = self.network;
        let degree = n.degree(node);
        let external = degree - 2.0 * n.self_loop_weight(node);
        let dlog2d = n.weight(node);

        let source = self.stats.record(self.clustering.get(node));
        let target = self.stats.record(target);

        let source_after = if source.size == 1 {
            CommunityRecord::default()
        } else {
            CommunityRecord {
                volume: source.volume - degree,
                cut: source.cut + 2.0 * w_source - external,
                dlog2d_sum: source.dlog2d_sum - dlog2d,
                size: source.size - 1,
            }
        };
        let target_after = CommunityRecord {
            volume: target.volume + degree,
            cut: target.cut + external - 2.0 * w_target,
            dlog2d_sum: target.dlog2d_sum + dlog2d,
            size: target.size + 1,
        };
        (source_after, target_after)
    }

    fn move_delta(&self, node: usize, target: usize, w_source: f64, w_target: f64) -> f64 {
        let source = self.clustering.get(node);
        let before = self.stats.entropy_of(source) + self.stats.entropy_of(target);
        let (source_after, target_after) = self.moved_records(node, target, w_source, w_target);
        let after = self.stats.entropy_of_record(&source_after) + self.stats.entropy_of_record(&target_after);
        after - before
    }

    fn commit_move(&mut self, node: usize, target: usize, w_source: f64, w_target: f64) {
        let source = self.clustering.get(node);
        let (source_after, target_after) = self.moved_records(node, target, w_source, w_target);
        self.stats.replace(source, source_after);
        self.stats.replace(target, target_after);
        self.clustering.set(node, target);
    }
}

/// Repeatedly sweeps over the nodes of a network, moving each node to the neighboring
/// community that lowers the structural entropy the most, until a sweep moves nothing.
pub struct LocalMoving {
    epsilon: f64,
    budget: Budget,
    rng: Option<ChaCha20Rng>,
    node_order: Vec<usize>,
    edge_weight_per_cluster: Vec<f64>,
    is_neighboring_cluster: Vec<bool>,
    neighboring_clusters: Vec<usize>,
}

impl LocalMoving {
    /// Visit nodes in index order, or in a seeded random order if `seed` is given.
    pub fn new(epsilon: f64, seed: Option<u64>, budget: Budget) -> Self {
        LocalMoving {
            epsilon,
            budget,
            rng: seed.map(ChaCha20Rng::seed_from_u64),
            node_order: Vec::new(),
            edge_weight_per_cluster: Vec::new(),
            is_neighboring_cluster: Vec::new(),
            neighboring_clusters: Vec::new(),
        }
    }

    /// Run sweeps until no node moves. Returns true if any node changed community,
    /// in which case the clustering labels are compacted.
    pub fn iterate<C: Clustering>(&mut self, n: &Network, c: &mut C, cancel: &impl Cancel) -> Result<bool> {
        if n.total_volume() <= 0.0 {
            return Ok(false);
        }

        let mut update = false;

        self.node_order.clear();
        self.node_order.extend(0..n.nodes());
        if let Some(rng) = self.rng.as_mut() {
            self.node_order.shuffle(rng);
        }

        let mut state = MoveState::new(n, c);

        self.edge_weight_per_cluster.zero_len(state.stats.len());
        self.is_neighboring_cluster.zero_len(state.stats.len());
        self.neighboring_clusters.clear();

        let mut sweeps = 0;
        loop {
            cancel.check()?;
            if self.budget.sweeps_exhausted(sweeps) {
                warn!("local moving stopped after {sweeps} sweeps without converging");
                break;
            }

            let mut moves = 0;
            for &j in &self.node_order {
                let current_cluster = state.clustering.get(j);

                // Tabulate the edge weight from j to each neighboring cluster.
                for (neighbor, edge_weight) in n.neighbors(j) {
                    let l = state.clustering.get(neighbor);
                    if !self.is_neighboring_cluster[l] {
                        self.is_neighboring_cluster[l] = true;
                        self.neighboring_clusters.push(l);
                    }
                    self.edge_weight_per_cluster[l] += edge_weight;
                }

                let w_current = self.edge_weight_per_cluster[current_cluster];
                let mut best_cluster = current_cluster;
                let mut best_delta = -self.epsilon;

                for &l in &self.neighboring_clusters {
                    if l == current_cluster {
                        continue;
                    }
                    let delta = state.move_delta(j, l, w_current, self.edge_weight_per_cluster[l]);
                    if delta < best_delta {
                        best_cluster = l;
                        best_delta = delta;
                    }
                }

                if best_cluster != current_cluster {
                    let w_best = self.edge_weight_per_cluster[best_cluster];
                    state.commit_move(j, best_cluster, w_current, w_best);
                    moves += 1;
                }

                for &l in &self.neighboring_clusters {
                    self.edge_weight_per_cluster[l] = 0.0;
                    self.is_neighboring_cluster[l] = false;
                }
                self.neighboring_clusters.clear();
            }

            sweeps += 1;
            debug!(
                "sweep {sweeps}: {moves} moves, {} communities, entropy {:.6}",
                state.stats.num_active(),
                state.total_entropy()
            );

            if moves == 0 {
                break;
            }
            update = true;
        }

        if update {
            c.remove_empty_clusters();
        }

        Ok(update)
    }
}

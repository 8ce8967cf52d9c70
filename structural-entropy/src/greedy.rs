use crate::budget::{Budget, Cancel, NeverCancel};
use crate::error::{Error, Result};
use crate::stats::CommunityStats;
use crate::{Clustering, Network, SimpleClustering};
use fxhash::FxHashMap;
use itertools::Itertools;
use log::{debug, info, warn};
use noisy_float::types::{n64, N64};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Number of communities the greedy optimizer merges down to when no target is given.
pub const DEFAULT_TARGET_COMMUNITIES: usize = 1;

/// Settings of the greedy merge optimizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GreedyOptions {
    /// Stop once this many communities remain. Defaults to `DEFAULT_TARGET_COMMUNITIES`.
    pub target_communities: Option<usize>,
    /// Stop as soon as the cheapest available merge would not lower the entropy.
    pub stop_on_no_gain: bool,
    /// Work limits.
    pub budget: Budget,
}

/// One merge performed by the greedy optimizer.
///
/// Communities `0..n` are the singletons of the `n` nodes; the community created by
/// the `k`-th merge has id `n + k`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MergeStep {
    /// First merged community.
    pub cluster1: usize,
    /// Second merged community.
    pub cluster2: usize,
    /// Id of the community created by the merge.
    pub merged: usize,
    /// Change in total entropy caused by the merge.
    pub delta: f64,
    /// Number of nodes in the merged community.
    pub size: usize,
}

/// A candidate merge of two communities, ordered so that `BinaryHeap` pops the smallest
/// delta first and, among equal deltas, the earliest inserted candidate.
#[derive(Debug, Clone, Copy)]
struct MergeCandidate {
    delta: N64,
    seq: u64,
    c1: usize,
    c2: usize,
    weight: f64,
}

impl Ord for MergeCandidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other.delta.cmp(&self.delta).then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for MergeCandidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MergeCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeCandidate {}

/// Community statistics, membership, adjacency and the candidate queue of one greedy run.
struct MergeState {
    stats: CommunityStats,
    members: Vec<Vec<usize>>,
    adjacency: Vec<FxHashMap<usize, f64>>,
    queue: BinaryHeap<MergeCandidate>,
    next_seq: u64,
}

impl MergeState {
    fn new(n: &Network) -> Self {
        let nodes = n.nodes();
        let mut state = MergeState {
            stats: CommunityStats::singletons(n),
            members: (0..nodes).map(|i| vec![i]).collect(),
            adjacency: vec![FxHashMap::default(); nodes],
            queue: BinaryHeap::new(),
            next_seq: 0,
        };

        for e in n.graph.edge_references() {
            let (i, j, w) = (e.source().usize(), e.target().usize(), *e.weight());
            if i != j && w > 0.0 {
                state.adjacency[i].insert(j, w);
                state.adjacency[j].insert(i, w);
                state.push_candidate(i, j, w);
            }
        }

        state
    }

    fn merge_delta(&self, c1: usize, c2: usize, weight: f64) -> f64 {
        let r1 = self.stats.record(c1);
        let r2 = self.stats.record(c2);
        let merged = r1.merged(r2, weight);
        self.stats.entropy_of_record(&merged) - self.stats.entropy_of(c1) - self.stats.entropy_of(c2)
    }

    fn push_candidate(&mut self, c1: usize, c2: usize, weight: f64) {
        let delta = self.merge_delta(c1, c2, weight);
        self.queue.push(MergeCandidate {
            delta: n64(delta),
            seq: self.next_seq,
            c1,
            c2,
            weight,
        });
        self.next_seq += 1;
    }

    fn is_active(&self, c: usize) -> bool {
        self.stats.record(c).is_active()
    }

    /// Pop candidates until one joins two active communities. Stale entries are dropped.
    fn pop_valid(&mut self) -> Option<MergeCandidate> {
        while let Some(candidate) = self.queue.pop() {
            if self.is_active(candidate.c1) && self.is_active(candidate.c2) {
                return Some(candidate);
            }
        }
        None
    }

    /// Merge the two communities of `candidate` into a new community and queue
    /// candidates between it and each of its neighbors. Returns the new id.
    fn merge(&mut self, candidate: &MergeCandidate) -> usize {
        let (c1, c2) = (candidate.c1, candidate.c2);

        let record = self.stats.record(c1).merged(self.stats.record(c2), candidate.weight);
        let merged = self.stats.push(record);
        self.stats.retire(c1);
        self.stats.retire(c2);

        let mut members = std::mem::take(&mut self.members[c1]);
        members.append(&mut self.members[c2]);
        self.members.push(members);

        let adjacent1 = std::mem::take(&mut self.adjacency[c1]);
        let adjacent2 = std::mem::take(&mut self.adjacency[c2]);

        let mut neighbors: FxHashMap<usize, f64> = FxHashMap::default();
        for (&k, &w) in adjacent1.iter().chain(adjacent2.iter()) {
            if k != c1 && k != c2 && self.is_active(k) {
                *neighbors.entry(k).or_insert(0.0) += w;
            }
        }

        self.adjacency.push(FxHashMap::default());
        for (k, w) in neighbors.into_iter().sorted_unstable_by_key(|&(k, _)| k) {
            self.adjacency[k].remove(&c1);
            self.adjacency[k].remove(&c2);
            self.adjacency[k].insert(merged, w);
            self.adjacency[merged].insert(k, w);
            self.push_candidate(merged, k, w);
        }

        merged
    }

    /// Clustering with one contiguous label per active community, in order of community id.
    fn clustering(&self, nodes: usize) -> SimpleClustering {
        let mut labels = vec![0; nodes];
        for (label, c) in self.stats.active_communities().enumerate() {
            for &node in &self.members[c] {
                labels[node] = label;
            }
        }
        SimpleClustering::new_from_labels(&labels)
    }
}

/// Agglomerative structural entropy minimization: starting from singletons, repeatedly
/// perform the adjacent-community merge with the smallest entropy change.
///
/// Candidates with equal deltas are taken in insertion order. Which of several equally
/// cheap merges is performed first can change the final partition but not its entropy.
#[derive(Debug, Clone, Default)]
pub struct GreedyMerge {
    options: GreedyOptions,
}

impl GreedyMerge {
    /// Initialize the optimizer with the given options.
    pub fn new(options: GreedyOptions) -> Self {
        GreedyMerge { options }
    }

    /// Partition the nodes of `n`.
    pub fn run(&mut self, n: &Network) -> Result<SimpleClustering> {
        Ok(self.run_dendrogram(n, &NeverCancel)?.0)
    }

    /// Partition the nodes of `n`, also returning the merges performed in order.
    pub fn run_dendrogram(&mut self, n: &Network, cancel: &impl Cancel) -> Result<(SimpleClustering, Vec<MergeStep>)> {
        let nodes = n.nodes();
        if nodes == 0 {
            return Err(Error::EmptyGraph);
        }

        let target = self.options.target_communities.unwrap_or(DEFAULT_TARGET_COMMUNITIES);
        if target < 1 || target > nodes {
            return Err(Error::InvalidTargetCommunities {
                requested: target,
                nodes,
            });
        }

        if n.total_volume() <= 0.0 {
            warn!("network has zero total volume; every node is left in its own community");
            return Ok((SimpleClustering::init_different_clusters(nodes), Vec::new()));
        }

        let mut state = MergeState::new(n);
        let mut steps = Vec::new();

        while state.stats.num_active() > target {
            cancel.check()?;
            if self.options.budget.merges_exhausted(steps.len()) {
                warn!("greedy merging stopped after {} merges", steps.len());
                break;
            }

            let Some(candidate) = state.pop_valid() else {
                debug!(
                    "no merge candidates left with {} communities; network is disconnected",
                    state.stats.num_active()
                );
                break;
            };

            let delta = candidate.delta.raw();
            if self.options.stop_on_no_gain && delta >= 0.0 {
                break;
            }

            let merged = state.merge(&candidate);
            steps.push(MergeStep {
                cluster1: candidate.c1,
                cluster2: candidate.c2,
                merged,
                delta,
                size: state.members[merged].len(),
            });
        }

        let clustering = state.clustering(nodes);
        info!(
            "greedy merging: {} nodes -> {} communities after {} merges, entropy {:.6}",
            nodes,
            clustering.num_clusters(),
            steps.len(),
            state.stats.total_entropy()
        );
        Ok((clustering, steps))
    }
}

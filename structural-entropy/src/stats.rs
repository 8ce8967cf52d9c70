use crate::objective::community_entropy;
use crate::{Clustering, Network};

/// Aggregates of one community that determine its entropy contribution.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CommunityRecord {
    /// Sum of the weighted degrees of the member nodes.
    pub volume: f64,
    /// Weight of the edges with exactly one endpoint in the community.
    pub cut: f64,
    /// Sum of `d * log2(d)` over the member nodes.
    pub dlog2d_sum: f64,
    /// Number of member nodes. A community with no members is inactive.
    pub size: usize,
}

impl CommunityRecord {
    /// Record of a community holding only `node`.
    pub fn singleton(network: &Network, node: usize) -> Self {
        CommunityRecord {
            volume: network.degree(node),
            cut: network.degree(node) - 2.0 * network.self_loop_weight(node),
            dlog2d_sum: network.weight(node),
            size: 1,
        }
    }

    /// Record of the union of two disjoint communities joined by `inter_weight`.
    pub fn merged(&self, other: &CommunityRecord, inter_weight: f64) -> Self {
        CommunityRecord {
            volume: self.volume + other.volume,
            cut: self.cut + other.cut - 2.0 * inter_weight,
            dlog2d_sum: self.dlog2d_sum + other.dlog2d_sum,
            size: self.size + other.size,
        }
    }

    /// True while the community has at least one member.
    pub fn is_active(&self) -> bool {
        self.size > 0
    }

    /// Entropy contribution of this community under total volume `total_volume`.
    pub fn entropy(&self, total_volume: f64) -> f64 {
        if !self.is_active() {
            return 0.0;
        }
        community_entropy(self.volume, self.cut, self.dlog2d_sum, total_volume)
    }
}

/// Per-community volume, cut and `d * log2(d)` sums for one optimizer run.
///
/// Community ids index directly into the store. Ids are never reused within a run:
/// a community that loses its last member, or is merged away, simply becomes inactive.
#[derive(Debug, Clone)]
pub struct CommunityStats {
    total_volume: f64,
    records: Vec<CommunityRecord>,
    num_active: usize,
}

impl CommunityStats {
    /// Statistics with every node of `network` in its own community; community `i` holds node `i`.
    pub fn singletons(network: &Network) -> Self {
        let records: Vec<_> = (0..network.nodes())
            .map(|i| CommunityRecord::singleton(network, i))
            .collect();

        CommunityStats {
            total_volume: network.total_volume(),
            num_active: records.len(),
            records,
        }
    }

    /// Statistics of an arbitrary clustering, computed from scratch.
    pub fn from_clustering(network: &Network, clustering: &impl Clustering) -> Self {
        let mut records = vec![CommunityRecord::default(); clustering.num_clusters()];

        for i in 0..network.nodes() {
            let c = clustering.get(i);
            let record = &mut records[c];
            record.volume += network.degree(i);
            record.dlog2d_sum += network.weight(i);
            record.size += 1;

            for (j, w) in network.neighbors(i) {
                if clustering.get(j) != c {
                    records[c].cut += w;
                }
            }
        }

        CommunityStats {
            total_volume: network.total_volume(),
            num_active: records.iter().filter(|r| r.is_active()).count(),
            records,
        }
    }

    /// Total volume `VOL` of the network, fixed for the run.
    pub fn total_volume(&self) -> f64 {
        self.total_volume
    }

    /// Record of community `c`.
    pub fn record(&self, c: usize) -> &CommunityRecord {
        &self.records[c]
    }

    /// Number of community ids ever allocated.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no community id has been allocated.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of communities with at least one member.
    pub fn num_active(&self) -> usize {
        self.num_active
    }

    /// Ids of the communities with at least one member, ascending.
    pub fn active_communities(&self) -> impl Iterator<Item = usize> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.is_active())
            .map(|(c, _)| c)
    }

    /// Entropy contribution of community `c`; zero for inactive or zero-volume communities.
    pub fn entropy_of(&self, c: usize) -> f64 {
        self.records[c].entropy(self.total_volume)
    }

    /// Entropy contribution `record` would have in this store.
    pub fn entropy_of_record(&self, record: &CommunityRecord) -> f64 {
        record.entropy(self.total_volume)
    }

    /// Sum of `entropy_of` over the active communities: the objective being minimized.
    pub fn total_entropy(&self) -> f64 {
        self.active_communities().map(|c| self.entropy_of(c)).sum()
    }

    /// Overwrite the record of an existing community, keeping the active count in sync.
    pub(crate) fn replace(&mut self, c: usize, record: CommunityRecord) {
        match (self.records[c].is_active(), record.is_active()) {
            (true, false) => self.num_active -= 1,
            (false, true) => self.num_active += 1,
            _ => {}
        }
        self.records[c] = record;
    }

    /// Allocate a new community id holding `record`.
    pub(crate) fn push(&mut self, record: CommunityRecord) -> usize {
        if record.is_active() {
            self.num_active += 1;
        }
        self.records.push(record);
        self.records.len() - 1
    }

    /// Deactivate community `c`, e.g. after it was merged into another.
    pub(crate) fn retire(&mut self, c: usize) {
        self.replace(c, CommunityRecord::default());
    }
}

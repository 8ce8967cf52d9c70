use crate::error::{Error, Result};
use crate::graph::{Edges, UnGraph};
use crate::Clustering;
use fxhash::FxHashMap;
use rayon::prelude::{IndexedParallelIterator, ParallelIterator};
use rayon::slice::ParallelSlice;
use std::collections::BTreeMap;
use std::hash::Hash;

/// Undirected graph with f64 node weights and f64 edge weights.
/// The node weight holds the sum of `d * log2(d)` over the original nodes a node stands for.
pub(crate) type Graph = UnGraph<f64, f64, u32>;

/// Weighted undirected network being partitioned.
///
/// A self-loop of weight `w` contributes `2w` to the degree of its node and never counts
/// towards a cut. Contraction folds intra-community edges into self-loops, so volumes and
/// total edge weight are preserved from level to level.
#[derive(Clone, Debug)]
pub struct Network {
    pub(crate) graph: Graph,
    degrees: Vec<f64>,
    self_loops: Vec<f64>,
}

/// Iterator over pairs of (adjacent node id, edge_weight) for all neighbors of a chosen node.
/// Self-loops are skipped.
pub struct NeighborAndWeightIter<'a> {
    edge_iter: Edges<'a, f64, u32>,
    home_node: usize,
}

impl Iterator for NeighborAndWeightIter<'_> {
    type Item = (usize, f64);

    fn next(&mut self) -> Option<Self::Item> {
        for edge_ref in self.edge_iter.by_ref() {
            debug_assert_eq!(edge_ref.source().usize(), self.home_node);
            if !edge_ref.is_self_loop() {
                return Some((edge_ref.target().usize(), *edge_ref.weight()));
            }
        }
        None
    }
}

impl Network {
    /// Wrap a graph, tabulating weighted degrees and self-loop weights.
    pub(crate) fn new_from_graph(graph: Graph) -> Network {
        let nodes = graph.node_count() as usize;
        let mut degrees = vec![0.0; nodes];
        let mut self_loops = vec![0.0; nodes];

        for (i, adjacent) in graph.edges.iter().enumerate() {
            for half in adjacent {
                if half.is_loop_of(i) {
                    self_loops[i] += half.weight;
                    degrees[i] += 2.0 * half.weight;
                } else {
                    degrees[i] += half.weight;
                }
            }
        }

        Network {
            graph,
            degrees,
            self_loops,
        }
    }

    /// Build a network over `n_nodes` nodes from `(source, target, weight)` triples.
    /// Repeated pairs are merged by summing their weights.
    pub fn from_edges<I: IntoIterator<Item = (usize, usize, f64)>>(n_nodes: usize, edges: I) -> Result<Network> {
        let mut builder = NetworkBuilder::new(n_nodes);
        for (source, target, weight) in edges {
            builder.add_edge(source, target, weight)?;
        }
        builder.build()
    }

    /// Number of nodes in the graph
    pub fn nodes(&self) -> usize {
        self.graph.node_count() as usize
    }

    /// Number of distinct undirected edges, self-loops included.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// The `d * log2(d)` mass carried by `node`, summed over the original nodes it represents.
    pub fn weight(&self, node: usize) -> f64 {
        self.graph.node_weight((node as u32).into()).copied().unwrap_or_default()
    }

    /// Weighted degree of `node`, counting its self-loop twice.
    pub fn degree(&self, node: usize) -> f64 {
        self.degrees[node]
    }

    /// Weight of the self-loop on `node`, zero if it has none.
    pub fn self_loop_weight(&self, node: usize) -> f64 {
        self.self_loops[node]
    }

    /// Iterate over edges connected to `node`
    fn edges(&'_ self, node: usize) -> Edges<'_, f64, u32> {
        self.graph.edges((node as u32).into())
    }

    /// Iterator over pairs of (adjacent node id, edge_weight) for all neighbors of `node`.
    pub fn neighbors(&'_ self, node: usize) -> NeighborAndWeightIter<'_> {
        NeighborAndWeightIter {
            edge_iter: self.edges(node),
            home_node: node,
        }
    }

    /// Sum of weighted degrees over all nodes, i.e. twice the total edge weight.
    pub fn total_volume(&self) -> f64 {
        self.degrees.iter().sum()
    }

    /// Get the total edge weight of the graph, counting each self-loop once.
    pub fn total_edge_weight(&self) -> f64 {
        self.graph
            .edge_references()
            .fold(0.0, |acc, edge| acc + *edge.weight())
    }

    /// Get the total edge weight of the graph, counting each self-loop once.
    /// Computed in parallel chunks that are reduced in a fixed order, so the result is deterministic.
    pub fn total_edge_weight_par(&self) -> f64 {
        let mut partial_sums = vec![];

        // every ordinary edge shows up in two adjacency lists, a self-loop in one,
        // so count loops twice and halve at the end.
        self.graph
            .edges
            .par_chunks(256)
            .enumerate()
            .map(|(chunk, node_chunk)| {
                node_chunk
                    .iter()
                    .enumerate()
                    .map(|(offset, adjacent)| {
                        let node = chunk * 256 + offset;
                        adjacent.iter().fold(0.0, |acc, half| {
                            if half.is_loop_of(node) {
                                acc + 2.0 * half.weight
                            } else {
                                acc + half.weight
                            }
                        })
                    })
                    .sum::<f64>()
            })
            .collect_into_vec(&mut partial_sums);

        partial_sums.iter().sum::<f64>() / 2.0
    }

    /// Creates a reduced (or aggregate) network based on a clustering.
    /// Each node in the reduced network corresponds to a cluster of nodes in
    /// the original network and carries the summed `d * log2(d)` mass of its members.
    /// Edges between two clusters are summed into one edge; edges inside a cluster,
    /// including existing self-loops, are summed into the cluster's self-loop.
    pub fn create_reduced_network(&self, clustering: &impl Clustering) -> Network {
        let num_clusters = clustering.num_clusters();
        let mut cluster_g = Graph::with_capacity(num_clusters);

        for i in 0..num_clusters {
            let ni = cluster_g.add_node(0.0);
            debug_assert_eq!(ni.usize(), i);
        }

        for n in self.graph.node_indices() {
            let cluster = clustering.get(n.usize()) as u32;
            if let Some(w) = cluster_g.node_weight_mut(cluster.into()) {
                *w += self.weight(n.usize());
            }
        }

        let mut edge_memo = FxHashMap::default();

        for e in self.graph.edge_references() {
            let c1 = clustering.get(e.source().usize()) as u32;
            let c2 = clustering.get(e.target().usize()) as u32;
            let key = if c1 <= c2 { (c1, c2) } else { (c2, c1) };
            *edge_memo.entry(key).or_insert(0.0) += *e.weight();
        }

        let mut reduced_edges: Vec<_> = edge_memo.into_iter().collect();
        reduced_edges.sort_unstable_by_key(|&(key, _)| key);

        for ((c1, c2), weight) in reduced_edges {
            cluster_g.add_edge(c1.into(), c2.into(), weight);
        }

        Network::new_from_graph(cluster_g)
    }
}

/// Accumulates weighted edges over a fixed node set and produces a `Network`.
pub struct NetworkBuilder {
    n_nodes: usize,
    edges: FxHashMap<(u32, u32), f64>,
}

impl NetworkBuilder {
    /// Start a network with `n_nodes` nodes and no edges.
    pub fn new(n_nodes: usize) -> Self {
        NetworkBuilder {
            n_nodes,
            edges: FxHashMap::default(),
        }
    }

    /// Add weight between `source` and `target`. Adding the same pair twice sums the weights.
    pub fn add_edge(&mut self, source: usize, target: usize, weight: f64) -> Result<()> {
        for node in [source, target] {
            if node >= self.n_nodes {
                return Err(Error::NodeOutOfRange {
                    node,
                    nodes: self.n_nodes,
                });
            }
        }
        if !weight.is_finite() || weight < 0.0 {
            return Err(Error::InvalidEdgeWeight { source, target, weight });
        }

        let (s, t) = (source as u32, target as u32);
        let key = if s <= t { (s, t) } else { (t, s) };
        *self.edges.entry(key).or_insert(0.0) += weight;
        Ok(())
    }

    /// Finish the network. Node weights are set to `d * log2(d)` of each node's degree.
    ///
    /// Fails if summing duplicate edges, degrees or the total volume overflows to infinity.
    pub fn build(self) -> Result<Network> {
        let mut graph = Graph::with_capacity(self.n_nodes);
        for _ in 0..self.n_nodes {
            graph.add_node(0.0);
        }

        let mut edges: Vec<_> = self.edges.into_iter().collect();
        edges.sort_unstable_by_key(|&(key, _)| key);
        for ((s, t), weight) in edges {
            if !weight.is_finite() {
                return Err(Error::InvalidEdgeWeight {
                    source: s as usize,
                    target: t as usize,
                    weight,
                });
            }
            graph.add_edge(s.into(), t.into(), weight);
        }

        let mut network = Network::new_from_graph(graph);
        let mut total_weight = 0.0;
        for i in 0..network.nodes() {
            let d = network.degree(i);
            let weight = dlog2d(d);
            if !d.is_finite() || !weight.is_finite() {
                return Err(Error::NonFiniteVolume { node: Some(i) });
            }
            total_weight += weight;
            if let Some(w) = network.graph.node_weight_mut((i as u32).into()) {
                *w = weight;
            }
        }

        if !network.total_volume().is_finite() || !total_weight.is_finite() {
            return Err(Error::NonFiniteVolume { node: None });
        }
        Ok(network)
    }
}

/// `d * log2(d)`, taken as zero for isolated nodes.
pub(crate) fn dlog2d(degree: f64) -> f64 {
    if degree > 0.0 {
        degree * degree.log2()
    } else {
        0.0
    }
}

/// A network whose nodes carry caller-supplied identifiers.
#[derive(Clone, Debug)]
pub struct LabeledNetwork<N> {
    network: Network,
    ids: Vec<N>,
}

impl<N: Clone + Ord> LabeledNetwork<N> {
    /// The underlying index-based network.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Node identifiers, in index order.
    pub fn ids(&self) -> &[N] {
        &self.ids
    }

    /// Convert an index-based clustering into a map from node identifier to community.
    pub fn partition_map(&self, clustering: &impl Clustering) -> Result<BTreeMap<N, usize>> {
        if clustering.nodes() != self.ids.len() {
            return Err(Error::LabelCountMismatch {
                labels: clustering.nodes(),
                nodes: self.ids.len(),
            });
        }
        Ok(self
            .ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), clustering.get(i)))
            .collect())
    }

    /// Convert a partition map into a clustering over node indices.
    /// The map must name every node; community identifiers may be arbitrary.
    pub fn clustering<C: Clustering>(&self, partition: &BTreeMap<N, usize>) -> Result<C> {
        let mut labels = Vec::with_capacity(self.ids.len());
        for id in &self.ids {
            match partition.get(id) {
                Some(&community) => labels.push(community),
                None => {
                    return Err(Error::LabelCountMismatch {
                        labels: partition.len(),
                        nodes: self.ids.len(),
                    })
                }
            }
        }
        if partition.len() != self.ids.len() {
            return Err(Error::LabelCountMismatch {
                labels: partition.len(),
                nodes: self.ids.len(),
            });
        }
        Ok(C::new_from_labels(&crate::clustering::compact_labels(&labels)))
    }
}

/// Builds a `LabeledNetwork`, assigning dense indices to identifiers in first-seen order.
pub struct LabeledNetworkBuilder<N> {
    index: FxHashMap<N, usize>,
    ids: Vec<N>,
    edges: Vec<(usize, usize, f64)>,
}

impl<N: Clone + Eq + Hash + Ord> LabeledNetworkBuilder<N> {
    /// An empty builder.
    pub fn new() -> Self {
        LabeledNetworkBuilder {
            index: FxHashMap::default(),
            ids: Vec::new(),
            edges: Vec::new(),
        }
    }

    /// Register `id` as a node, returning its index. Registering twice is a no-op.
    pub fn add_node(&mut self, id: N) -> usize {
        if let Some(&i) = self.index.get(&id) {
            return i;
        }
        let i = self.ids.len();
        self.index.insert(id.clone(), i);
        self.ids.push(id);
        i
    }

    /// Add an edge, registering unseen endpoints.
    pub fn add_edge(&mut self, source: N, target: N, weight: f64) {
        let s = self.add_node(source);
        let t = self.add_node(target);
        self.edges.push((s, t, weight));
    }

    /// Validate the edges and produce the network.
    pub fn build(self) -> Result<LabeledNetwork<N>> {
        let network = Network::from_edges(self.ids.len(), self.edges)?;
        Ok(LabeledNetwork { network, ids: self.ids })
    }
}

impl<N: Clone + Eq + Hash + Ord> Default for LabeledNetworkBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::SimpleClustering;
    use approx::assert_relative_eq;

    fn path_with_loop() -> Network {
        Network::from_edges(4, [(0, 1, 1.0), (1, 2, 2.0), (2, 3, 3.0), (3, 3, 0.5), (1, 0, 1.0)]).unwrap()
    }

    #[test]
    fn test_degrees() {
        let n = path_with_loop();
        assert_eq!(n.nodes(), 4);
        assert_eq!(n.edge_count(), 4);
        assert_eq!(n.degree(0), 2.0);
        assert_eq!(n.degree(1), 4.0);
        assert_eq!(n.degree(3), 4.0);
        assert_eq!(n.self_loop_weight(3), 0.5);
        assert_eq!(n.total_volume(), 2.0 * n.total_edge_weight());
        assert_relative_eq!(n.weight(1), 8.0);
        assert_eq!(n.neighbors(3).collect::<Vec<_>>(), vec![(2, 3.0)]);
    }

    #[test]
    fn test_rejects_bad_edges() {
        let mut b = NetworkBuilder::new(2);
        assert_eq!(
            b.add_edge(0, 2, 1.0),
            Err(Error::NodeOutOfRange { node: 2, nodes: 2 })
        );
        assert!(matches!(
            b.add_edge(0, 1, -1.0),
            Err(Error::InvalidEdgeWeight { source: 0, target: 1, .. })
        ));
        assert!(b.add_edge(0, 1, f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_overflowing_sums() {
        // each weight is finite, their sum is not
        assert!(matches!(
            Network::from_edges(3, [(0, 1, 1e308), (0, 1, 1e308), (1, 2, 1.0)]),
            Err(Error::InvalidEdgeWeight { source: 0, target: 1, .. })
        ));
        // finite degrees whose d * log2(d) overflows
        assert_eq!(
            Network::from_edges(2, [(0, 1, 1e307)]).map(|n| n.nodes()),
            Err(Error::NonFiniteVolume { node: Some(0) })
        );
        assert_eq!(
            Network::from_edges(2, [(0, 1, 1.5e305)]).map(|n| n.nodes()),
            Err(Error::NonFiniteVolume { node: None })
        );
    }

    #[test]
    fn test_reduced_network() {
        let n = path_with_loop();
        let c = SimpleClustering::new_from_labels(&[0, 0, 1, 1]);
        let r = n.create_reduced_network(&c);

        assert_eq!(r.nodes(), 2);
        assert_eq!(r.self_loop_weight(0), 2.0);
        assert_eq!(r.self_loop_weight(1), 3.5);
        assert_eq!(r.neighbors(0).collect::<Vec<_>>(), vec![(1, 2.0)]);
        assert_relative_eq!(r.total_edge_weight(), n.total_edge_weight());
        assert_relative_eq!(r.total_volume(), n.total_volume());
        assert_relative_eq!(r.degree(0), n.degree(0) + n.degree(1));
        assert_relative_eq!(r.weight(1), n.weight(2) + n.weight(3));
    }

    #[test]
    fn test_edge_weight_par() {
        let n = path_with_loop();
        assert_relative_eq!(n.total_edge_weight_par(), n.total_edge_weight());
        assert_relative_eq!(n.total_edge_weight(), 7.5);
    }

    #[test]
    fn test_labeled_network() {
        let mut b = LabeledNetworkBuilder::new();
        b.add_edge("a", "b", 1.0);
        b.add_edge("b", "c", 1.0);
        b.add_node("d");
        let ln = b.build().unwrap();

        assert_eq!(ln.ids(), &["a", "b", "c", "d"]);
        assert_eq!(ln.network().degree(1), 2.0);

        let c = SimpleClustering::new_from_labels(&[0, 0, 1, 2]);
        let map = ln.partition_map(&c).unwrap();
        assert_eq!(map["a"], 0);
        assert_eq!(map["d"], 2);

        let back: SimpleClustering = ln.clustering(&map).unwrap();
        assert_eq!(back.labels(), c.labels());

        let mut partial = map.clone();
        partial.remove("c");
        assert!(ln.clustering::<SimpleClustering>(&partial).is_err());
    }
}

use itertools::Itertools;
use std::collections::HashMap;

/// Trait representing a partition of the nodes of a network.
/// Each node is assigned a single integer community label.
pub trait Clustering: std::fmt::Debug {
    /// Initialize a fresh clustering with each node in it's own cluster
    fn init_different_clusters(num_nodes: usize) -> Self;

    /// Initialize a fresh clustering with all nodes in a single cluster
    fn init_same_cluster(num_nodes: usize) -> Self;

    /// Initialize the clustering with a known set of labels, compacting unused labels away
    fn new_from_labels(labels: &[usize]) -> Self;

    /// List the member nodes of each cluster
    fn nodes_per_cluster(&self) -> Vec<Vec<usize>>;

    /// Get the label of node `i`
    fn get(&self, i: usize) -> usize;

    /// Set the label of node 'i'. Note this must update the number of clusters
    fn set(&mut self, i: usize, cluster: usize);

    /// Total number of nodes
    fn nodes(&self) -> usize;

    /// Upper bound on the cluster labels in use. Equal to the number of
    /// distinct clusters once `remove_empty_clusters` has run.
    fn num_clusters(&self) -> usize;

    /// Reassign node labels, removing unused labels
    fn remove_empty_clusters(&mut self);

    /// Relabel every node with the label its current cluster received in `cluster_clusterings`,
    /// a clustering whose items are the clusters of `self`.
    fn merge_clusters<C: Clustering>(&mut self, cluster_clusterings: &C) {
        for i in 0..self.nodes() {
            self.set(i, cluster_clusterings.get(self.get(i)))
        }

        self.remove_empty_clusters();
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
/// A basic Vec-backed implementation of `Clustering`
pub struct SimpleClustering {
    labels: Vec<usize>,
    num_clusters: usize,
}

impl SimpleClustering {
    /// Community label of every node, in node order
    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    /// Number of nodes in each cluster
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut counts = vec![0; self.num_clusters];
        for &l in &self.labels {
            counts[l] += 1;
        }
        counts
    }
}

impl Clustering for SimpleClustering {
    fn init_different_clusters(num_nodes: usize) -> Self {
        SimpleClustering {
            labels: (0..num_nodes).collect(),
            num_clusters: num_nodes,
        }
    }

    fn init_same_cluster(num_nodes: usize) -> Self {
        SimpleClustering {
            labels: vec![0; num_nodes],
            num_clusters: usize::from(num_nodes > 0),
        }
    }

    fn new_from_labels(input_labels: &[usize]) -> Self {
        let num_clusters = input_labels.iter().max().map_or(0, |&m| m + 1);

        let mut r = SimpleClustering {
            labels: input_labels.to_vec(),
            num_clusters,
        };

        r.remove_empty_clusters();
        r
    }

    fn nodes_per_cluster(&self) -> Vec<Vec<usize>> {
        let mut cluster_lists = vec![Vec::new(); self.num_clusters()];

        for (node, &label) in self.labels.iter().enumerate() {
            cluster_lists[label].push(node)
        }

        cluster_lists
    }

    fn get(&self, node: usize) -> usize {
        self.labels[node]
    }

    fn set(&mut self, node: usize, label: usize) {
        self.labels[node] = label;
        if label >= self.num_clusters {
            self.num_clusters = label + 1;
        }
    }

    fn nodes(&self) -> usize {
        self.labels.len()
    }

    fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    fn remove_empty_clusters(&mut self) {
        let mut new_labels = vec![usize::MAX; self.num_clusters];
        for &l in &self.labels {
            new_labels[l] = 0;
        }

        let mut next = 0;
        for label in new_labels.iter_mut().filter(|l| **l == 0) {
            *label = next;
            next += 1;
        }

        for l in self.labels.iter_mut() {
            *l = new_labels[*l];
        }

        self.num_clusters = next;
    }
}

/// Map arbitrary community identifiers onto `0..k`, preserving their order.
pub(crate) fn compact_labels(labels: &[usize]) -> Vec<usize> {
    let mapping: HashMap<usize, usize> = labels
        .iter()
        .copied()
        .sorted_unstable()
        .dedup()
        .enumerate()
        .map(|(i, l)| (l, i))
        .collect();
    labels.iter().map(|l| mapping[l]).collect()
}

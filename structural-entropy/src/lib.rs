//! Two-dimensional structural entropy minimization for weighted undirected networks
#![deny(missing_docs)]

/// Data structure for storing a clustering of nodes
pub mod clustering;

/// Data structure for storing a weighted, undirected graph (aka network)
pub mod network;

/// Error type shared by all optimizers
pub mod error;

/// Work limits and cooperative cancellation
pub mod budget;

/// Structural entropy objective functions
pub mod objective;

/// Per-community statistics kept incrementally by the optimizers
pub mod stats;

/// Single-node moves between communities
pub mod local_moving;

/// Multi-level local moving optimizer
pub mod louvain;

/// Greedy agglomerative merge optimizer
pub mod greedy;

/// Brute-force reference solver for tiny networks
pub mod exhaustive;

/// Common interface over the optimizers
pub mod optimizer;

mod graph;

#[cfg(test)]
mod test;

pub use clustering::{Clustering, SimpleClustering};
pub use error::{Error, Result};
pub use greedy::{GreedyMerge, GreedyOptions};
pub use louvain::{Louvain, LouvainOptions};
pub use network::{LabeledNetwork, LabeledNetworkBuilder, Network, NetworkBuilder};
pub use optimizer::{Method, Optimizer};

/// Partition `network` with the multi-level optimizer using default options.
/// The number of communities is not fixed in advance.
pub fn run_local_search(network: &Network) -> Result<SimpleClustering> {
    Louvain::default().run(network)
}

/// Partition `network` by greedy merging down to `target_communities` communities
/// (one if `None`). Fewer merges happen if the network runs out of connected community pairs.
pub fn run_greedy_merge(network: &Network, target_communities: Option<usize>) -> Result<SimpleClustering> {
    GreedyMerge::new(GreedyOptions {
        target_communities,
        ..GreedyOptions::default()
    })
    .run(network)
}

/// Structural entropy of an arbitrary clustering of `network`, recomputed from scratch.
pub fn total_entropy(network: &Network, clustering: &impl Clustering) -> Result<f64> {
    if network.nodes() == 0 {
        return Err(Error::EmptyGraph);
    }
    if clustering.nodes() != network.nodes() {
        return Err(Error::LabelCountMismatch {
            labels: clustering.nodes(),
            nodes: network.nodes(),
        });
    }
    Ok(objective::structural_entropy(network, clustering))
}

trait ZeroVec {
    fn zero_len(&mut self, len: usize);
}

impl<T: Default> ZeroVec for Vec<T> {
    fn zero_len(&mut self, len: usize) {
        self.clear();
        self.resize_with(len, T::default)
    }
}

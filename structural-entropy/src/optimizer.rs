use crate::error::Result;
use crate::exhaustive::Exhaustive;
use crate::greedy::{GreedyMerge, GreedyOptions};
use crate::louvain::{Louvain, LouvainOptions};
use crate::{Network, SimpleClustering};

/// A structural entropy minimizer producing a flat partition of a network's nodes.
pub trait Optimizer {
    /// Partition the nodes of `network`.
    fn run(&mut self, network: &Network) -> Result<SimpleClustering>;
}

impl Optimizer for Louvain {
    fn run(&mut self, network: &Network) -> Result<SimpleClustering> {
        Louvain::run(self, network)
    }
}

impl Optimizer for GreedyMerge {
    fn run(&mut self, network: &Network) -> Result<SimpleClustering> {
        GreedyMerge::run(self, network)
    }
}

impl Optimizer for Exhaustive {
    fn run(&mut self, network: &Network) -> Result<SimpleClustering> {
        Ok(self.solve(network)?.0)
    }
}

/// Optimizer selection by value.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Method {
    /// Multi-level local moving.
    Louvain(LouvainOptions),
    /// Agglomerative merging.
    Greedy(GreedyOptions),
    /// Enumeration of every partition; tiny networks only.
    Exhaustive,
}

impl Method {
    /// Build the selected optimizer.
    pub fn optimizer(&self) -> Box<dyn Optimizer> {
        match *self {
            Method::Louvain(options) => Box::new(Louvain::new(options)),
            Method::Greedy(options) => Box::new(GreedyMerge::new(options)),
            Method::Exhaustive => Box::new(Exhaustive),
        }
    }

    /// Run the selected optimizer on `network`.
    pub fn run(&self, network: &Network) -> Result<SimpleClustering> {
        self.optimizer().run(network)
    }
}

impl Default for Method {
    fn default() -> Self {
        Method::Louvain(LouvainOptions::default())
    }
}

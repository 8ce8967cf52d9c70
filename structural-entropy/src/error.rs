use std::fmt::Display;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by the structural entropy optimizers.
///
/// All of these are precondition failures detected before optimization starts,
/// with the exception of `Cancelled`, which is raised between sweeps or merges.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The network has no nodes.
    EmptyGraph,

    /// The requested number of communities is outside `1..=nodes`.
    InvalidTargetCommunities {
        /// Requested community count.
        requested: usize,
        /// Number of nodes in the network.
        nodes: usize,
    },

    /// An edge weight was negative, NaN or infinite.
    InvalidEdgeWeight {
        /// First endpoint.
        source: usize,
        /// Second endpoint.
        target: usize,
        /// Offending weight.
        weight: f64,
    },

    /// An edge endpoint does not name a node of the network.
    NodeOutOfRange {
        /// Offending node index.
        node: usize,
        /// Number of nodes in the network.
        nodes: usize,
    },

    /// A clustering does not label every node of the network exactly once.
    LabelCountMismatch {
        /// Number of labelled nodes.
        labels: usize,
        /// Number of nodes in the network.
        nodes: usize,
    },

    /// The exhaustive solver was asked to enumerate partitions of a network that is too large.
    TooLargeForExhaustive {
        /// Number of nodes in the network.
        nodes: usize,
        /// Largest supported network.
        max: usize,
    },

    /// Summed edge weights overflow: the degree or `d * log2(d)` mass of `node`,
    /// or the total volume when `node` is `None`, is not finite.
    NonFiniteVolume {
        /// Offending node, if a single node overflows.
        node: Option<usize>,
    },

    /// The computation was cancelled by the caller.
    Cancelled,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::EmptyGraph => f.write_str("network has no nodes"),
            Error::InvalidTargetCommunities { requested, nodes } => {
                write!(f, "cannot reduce {nodes} nodes to {requested} communities")
            }
            Error::InvalidEdgeWeight { source, target, weight } => {
                write!(f, "edge ({source}, {target}) has invalid weight {weight}")
            }
            Error::NodeOutOfRange { node, nodes } => {
                write!(f, "node {node} is out of range for a network of {nodes} nodes")
            }
            Error::LabelCountMismatch { labels, nodes } => {
                write!(f, "clustering labels {labels} nodes but the network has {nodes}")
            }
            Error::TooLargeForExhaustive { nodes, max } => {
                write!(f, "exhaustive search supports at most {max} nodes, got {nodes}")
            }
            Error::NonFiniteVolume { node: Some(node) } => {
                write!(f, "weighted degree of node {node} is not finite")
            }
            Error::NonFiniteVolume { node: None } => f.write_str("total network volume is not finite"),
            Error::Cancelled => f.write_str("computation was cancelled"),
        }
    }
}

impl std::error::Error for Error {}

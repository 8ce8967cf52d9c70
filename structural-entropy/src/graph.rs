use num_traits::bounds::Bounded;
use num_traits::cast::AsPrimitive;
use num_traits::identities::{One, Zero};
use std::convert::{From, TryFrom};
use std::iter::Iterator;
use std::ops::{Add, AddAssign};
use std::slice::Iter;

pub trait IndexTrait:
    Add<Output = Self>
    + AddAssign
    + AsPrimitive<usize>
    + Bounded
    + Clone
    + Copy
    + One
    + PartialEq
    + PartialOrd
    + TryFrom<usize>
    + Zero
where
    Self: std::marker::Sized,
{
}

impl IndexTrait for usize {}
impl IndexTrait for u32 {}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd)]
pub struct Index<Ix>(Ix)
where
    Ix: IndexTrait;

impl<Ix> Index<Ix>
where
    Ix: IndexTrait,
{
    pub fn index(&self) -> Ix {
        self.0
    }

    pub fn usize(&self) -> usize {
        self.0.as_()
    }
}

impl<Ix> From<Ix> for Index<Ix>
where
    Ix: IndexTrait,
{
    fn from(ix: Ix) -> Self {
        Index(ix)
    }
}

/// Borrowed view of one undirected edge.
#[derive(Copy, Clone, Debug)]
pub struct Edge<W, NodeIx>
where
    W: Clone,
    NodeIx: IndexTrait,
{
    source: Index<NodeIx>,
    target: Index<NodeIx>,
    weight: W,
}

impl<W, NodeIx> Edge<W, NodeIx>
where
    W: Clone,
    NodeIx: IndexTrait,
{
    pub fn source(&self) -> Index<NodeIx> {
        self.source
    }
    pub fn target(&self) -> Index<NodeIx> {
        self.target
    }
    pub fn weight(&self) -> W {
        self.weight.clone()
    }
    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

#[derive(Copy, Clone, Debug)]
pub(crate) struct HalfEdge<W, NodeIx = usize>
where
    W: Clone,
    NodeIx: IndexTrait,
{
    target: Index<NodeIx>,
    pub(crate) weight: W,
}

impl<W, NodeIx> HalfEdge<W, NodeIx>
where
    W: Clone,
    NodeIx: IndexTrait,
{
    pub(crate) fn is_loop_of(&self, node: usize) -> bool {
        self.target.usize() == node
    }
}

/// Edges incident to a single node. A self-loop is visited once.
pub struct Edges<'a, W, NodeIx = usize>
where
    W: Clone,
    NodeIx: IndexTrait,
{
    source: Index<NodeIx>,
    iter: Iter<'a, HalfEdge<W, NodeIx>>,
}

impl<'a, W, NodeIx> Iterator for Edges<'a, W, NodeIx>
where
    W: Clone,
    NodeIx: IndexTrait,
{
    type Item = Edge<&'a W, NodeIx>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next().map(|HalfEdge { target, weight }| Edge {
            source: self.source,
            target: *target,
            weight,
        })
    }
}

/// Every undirected edge of the graph exactly once, reported from its lower endpoint.
pub struct EdgeReferences<'a, W, NodeIx = usize>
where
    W: Clone,
    NodeIx: IndexTrait,
{
    adjacency: &'a [Vec<HalfEdge<W, NodeIx>>],
    node: usize,
    position: usize,
}

impl<'a, W, NodeIx> Iterator for EdgeReferences<'a, W, NodeIx>
where
    W: Clone,
    NodeIx: IndexTrait,
    <NodeIx as TryFrom<usize>>::Error: std::fmt::Debug,
{
    type Item = Edge<&'a W, NodeIx>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.node < self.adjacency.len() {
            let list = &self.adjacency[self.node];
            while self.position < list.len() {
                let half = &list[self.position];
                self.position += 1;
                if half.target.usize() >= self.node {
                    return Some(Edge {
                        source: Index(NodeIx::try_from(self.node).unwrap()),
                        target: half.target,
                        weight: &half.weight,
                    });
                }
            }
            self.node += 1;
            self.position = 0;
        }
        None
    }
}

pub struct NodeIndices<Ix>
where
    Ix: IndexTrait,
{
    start: Ix,
    end: Ix,
}

impl<Ix> Iterator for NodeIndices<Ix>
where
    Ix: IndexTrait,
{
    type Item = Index<Ix>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.start < self.end {
            let ix = self.start;
            self.start += Ix::one();
            Some(Index(ix))
        } else {
            None
        }
    }
}

/// Adjacency-list undirected graph. Parallel edges are not merged here; callers
/// that need a simple graph accumulate weights before inserting.
#[derive(Clone, Debug)]
pub struct UnGraph<NodeW, EdgeW, NodeIx = usize>
where
    NodeW: Add<Output = NodeW> + AddAssign + Clone + Zero,
    EdgeW: Add<Output = EdgeW> + AddAssign + Clone + Zero,
    NodeIx: IndexTrait,
    <NodeIx as TryFrom<usize>>::Error: std::fmt::Debug,
{
    pub(crate) edges: Vec<Vec<HalfEdge<EdgeW, NodeIx>>>,
    node_weights: Vec<NodeW>,
    total_edges: usize,
    total_nodes: NodeIx,
}

impl<NodeW, EdgeW, NodeIx> UnGraph<NodeW, EdgeW, NodeIx>
where
    NodeW: Add<Output = NodeW> + AddAssign + Clone + Zero,
    EdgeW: Add<Output = EdgeW> + AddAssign + Clone + Zero,
    NodeIx: IndexTrait,
    <NodeIx as TryFrom<usize>>::Error: std::fmt::Debug,
{
    pub fn with_capacity(nodes: usize) -> Self {
        UnGraph {
            edges: Vec::with_capacity(nodes),
            node_weights: Vec::with_capacity(nodes),
            total_edges: 0,
            total_nodes: NodeIx::zero(),
        }
    }

    /// Insert an undirected edge. A self-loop is stored once in its node's list.
    pub fn add_edge(&mut self, source: Index<NodeIx>, target: Index<NodeIx>, weight: EdgeW) {
        if source == target {
            self.edges[source.usize()].push(HalfEdge { target, weight });
        } else {
            self.edges[source.usize()].push(HalfEdge {
                target,
                weight: weight.clone(),
            });
            self.edges[target.usize()].push(HalfEdge { target: source, weight });
        }
        self.total_edges += 1;
    }

    pub fn add_node(&mut self, weight: NodeW) -> Index<NodeIx> {
        let index = self.total_nodes;
        self.edges.push(vec![]);
        self.node_weights.push(weight);
        self.total_nodes += NodeIx::one();
        Index(index)
    }

    pub fn edge_count(&self) -> usize {
        self.total_edges
    }

    pub fn node_count(&self) -> NodeIx {
        self.total_nodes
    }

    pub fn node_weight(&self, ix: Index<NodeIx>) -> Option<&NodeW> {
        self.node_weights.get(ix.usize())
    }

    pub fn node_weight_mut(&mut self, ix: Index<NodeIx>) -> Option<&mut NodeW> {
        self.node_weights.get_mut(ix.usize())
    }

    pub fn edges(&self, source: Index<NodeIx>) -> Edges<EdgeW, NodeIx> {
        Edges {
            source,
            iter: self.edges[source.usize()].iter(),
        }
    }

    pub fn node_indices(&self) -> NodeIndices<NodeIx> {
        NodeIndices {
            start: NodeIx::zero(),
            end: self.total_nodes,
        }
    }

    pub fn edge_references(&self) -> EdgeReferences<EdgeW, NodeIx> {
        EdgeReferences {
            adjacency: &self.edges,
            node: 0,
            position: 0,
        }
    }
}

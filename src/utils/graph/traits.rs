//! Trait definitions for graph abstractions.
//!
//! The trait hierarchy is minimal and composable:
//!
//! - [`GraphBase`] - Core properties: node count and node iteration
//! - [`Successors`] - Forward edge traversal (outgoing edges)
//! - [`Predecessors`] - Backward edge traversal (incoming edges)
//! - [`RootedGraph`] - Graphs with a designated entry node
//!
//! All adjacency queries return iterators rather than collections.

use crate::utils::graph::NodeId;

/// Core graph properties.
pub trait GraphBase {
    /// Returns the number of nodes.
    fn node_count(&self) -> usize;

    /// Iterates over every node id.
    fn node_ids(&self) -> impl Iterator<Item = NodeId>;
}

/// Forward edge traversal.
pub trait Successors: GraphBase {
    /// Iterates over the targets of the outgoing edges of `node`.
    ///
    /// A node with two edges to the same target yields that target twice.
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// Backward edge traversal.
pub trait Predecessors: GraphBase {
    /// Iterates over the sources of the incoming edges of `node`.
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId>;
}

/// A graph with a designated entry node.
pub trait RootedGraph: Successors + Predecessors {
    /// Returns the entry node.
    fn entry(&self) -> NodeId;
}

#[cfg(test)]
mod tests {
    use super::*;

    // A minimal test graph implementation for trait testing
    struct TestGraph {
        node_count: usize,
        edges: Vec<(NodeId, NodeId)>,
        entry: NodeId,
    }

    impl GraphBase for TestGraph {
        fn node_count(&self) -> usize {
            self.node_count
        }

        fn node_ids(&self) -> impl Iterator<Item = NodeId> {
            (0..self.node_count).map(NodeId::new)
        }
    }

    impl Successors for TestGraph {
        fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
            self.edges
                .iter()
                .filter(move |(src, _)| *src == node)
                .map(|(_, dst)| *dst)
        }
    }

    impl Predecessors for TestGraph {
        fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
            self.edges
                .iter()
                .filter(move |(_, dst)| *dst == node)
                .map(|(src, _)| *src)
        }
    }

    impl RootedGraph for TestGraph {
        fn entry(&self) -> NodeId {
            self.entry
        }
    }

    #[test]
    fn test_adjacency() {
        let graph = TestGraph {
            node_count: 3,
            edges: vec![
                (NodeId::new(0), NodeId::new(1)),
                (NodeId::new(0), NodeId::new(2)),
                (NodeId::new(1), NodeId::new(2)),
            ],
            entry: NodeId::new(0),
        };

        assert_eq!(graph.node_ids().count(), 3);
        assert_eq!(graph.successors(NodeId::new(0)).count(), 2);
        assert_eq!(graph.predecessors(NodeId::new(2)).count(), 2);
        assert_eq!(graph.predecessors(NodeId::new(0)).count(), 0);
        assert_eq!(graph.entry(), NodeId::new(0));
    }
}

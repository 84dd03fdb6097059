//! Core database trait for graph storage
//!
//! This trait defines the read interface over stored nodes and edges. The
//! connection validator is written against it so it never needs the
//! concrete document type.

/// Core trait for graph databases
///
/// The associated types let a store expose its own node and edge structures.
pub trait Database {
    /// The node data type for this database
    type Node;

    /// The edge data type for this database
    type Edge;

    /// Get a node by ID
    fn get_node(&self, id: &str) -> Option<&Self::Node>;

    /// Get an edge by ID
    fn get_edge(&self, id: &str) -> Option<&Self::Edge>;

    /// Iterate over all nodes in insertion order
    fn nodes(&self) -> impl Iterator<Item = &Self::Node>;

    /// Iterate over all edges in insertion order
    fn edges(&self) -> impl Iterator<Item = &Self::Edge>;

    /// Clear all data from the database
    fn clear(&mut self);

    /// Get the number of nodes
    fn node_count(&self) -> usize;

    /// Get the number of edges
    fn edge_count(&self) -> usize;
}

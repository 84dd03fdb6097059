//! Graph document storage
//!
//! Stores canvas nodes and edges in insertion order, enforces id uniqueness,
//! and converts to and from the JSON document exchanged with the renderer.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, trace, warn};

use super::database::Database;
use super::error::{GraphError, GraphResult};
use super::grouping::MAX_GROUP_DEPTH;
use super::types::{Edge, Node};

/// Notification emitted for every applied change, drained by the renderer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    NodeAdded { id: String },
    NodeRemoved { id: String },
    NodeChanged { id: String },
    EdgeAdded { id: String },
    EdgeRemoved { id: String },
    EdgeChanged { id: String },
    VisibilityChanged { id: String, visible: bool },
    SelectionChanged,
    /// The whole document was replaced
    Reset,
}

/// Serialized form of a document: `{"nodes": [...], "edges": [...]}`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentData {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// In-memory graph document
///
/// Nodes are indexed by id with a separate order list, edges are kept in
/// insertion order. Visibility is session state and is never serialized.
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Nodes indexed by ID
    nodes: HashMap<String, Node>,
    /// Node IDs in insertion order (for deterministic iteration)
    node_order: Vec<String>,
    /// Edges in insertion order
    edges: Vec<Edge>,
    /// Nodes hidden by a collapsed ancestor
    pub(crate) hidden: HashSet<String>,
    /// Pending change notifications
    changes: Vec<ChangeEvent>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a node exists
    pub fn has_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Check if an edge exists
    pub fn has_edge(&self, id: &str) -> bool {
        self.edges.iter().any(|e| e.id == id)
    }

    /// Check if any cell (node or edge) uses this id
    pub fn contains(&self, id: &str) -> bool {
        self.has_node(id) || self.has_edge(id)
    }

    /// Position of a node in insertion order
    pub fn node_index(&self, id: &str) -> Option<usize> {
        self.node_order.iter().position(|n| n == id)
    }

    /// Position of an edge in insertion order
    pub fn edge_index(&self, id: &str) -> Option<usize> {
        self.edges.iter().position(|e| e.id == id)
    }

    /// Edges with either end attached to the node
    pub fn connected_edges(&self, node_id: &str) -> Vec<&Edge> {
        self.edges.iter().filter(|e| e.touches(node_id)).collect()
    }

    /// Edges running from `source` to `target`, ignoring ports
    pub fn edges_between(&self, source: &str, target: &str) -> Vec<&Edge> {
        self.edges
            .iter()
            .filter(|e| e.source.cell == source && e.target.cell == target)
            .collect()
    }

    /// Generate the next free id of the form `<prefix>_<n>`
    pub(crate) fn next_id(&self, prefix: &str, counter: &mut usize) -> String {
        loop {
            *counter += 1;
            let candidate = format!("{}_{}", prefix, counter);
            if !self.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Insert a node at a position in the order list
    pub(crate) fn insert_node_at(&mut self, node: Node, index: usize) -> GraphResult<()> {
        if self.contains(&node.id) {
            return Err(GraphError::invalid_spec(format!(
                "duplicate cell id '{}'",
                node.id
            )));
        }
        trace!(node_id = %node.id, shape = %node.shape, index, "Inserting node");
        let index = index.min(self.node_order.len());
        let id = node.id.clone();
        self.node_order.insert(index, id.clone());
        self.nodes.insert(id.clone(), node);
        self.changes.push(ChangeEvent::NodeAdded { id: id.clone() });
        self.refresh_subtree_visibility(&id);
        Ok(())
    }

    /// Remove a node, returning it with its former order position
    ///
    /// Does not touch edges or children; callers remove those first.
    pub(crate) fn remove_node(&mut self, id: &str) -> GraphResult<(Node, usize)> {
        let index = self.node_index(id).ok_or_else(|| GraphError::not_found(id))?;
        self.node_order.remove(index);
        let node = self
            .nodes
            .remove(id)
            .ok_or_else(|| GraphError::not_found(id))?;
        self.hidden.remove(id);
        trace!(node_id = %id, index, "Removed node");
        self.changes.push(ChangeEvent::NodeRemoved { id: id.to_string() });
        Ok((node, index))
    }

    /// Insert an edge at a position in the edge list
    pub(crate) fn insert_edge_at(&mut self, edge: Edge, index: usize) -> GraphResult<()> {
        if self.contains(&edge.id) {
            return Err(GraphError::invalid_spec(format!(
                "duplicate cell id '{}'",
                edge.id
            )));
        }
        trace!(
            edge_id = %edge.id,
            source = %edge.source,
            target = %edge.target,
            index,
            "Inserting edge"
        );
        let index = index.min(self.edges.len());
        self.changes.push(ChangeEvent::EdgeAdded {
            id: edge.id.clone(),
        });
        self.edges.insert(index, edge);
        Ok(())
    }

    /// Remove an edge, returning it with its former position
    pub(crate) fn remove_edge(&mut self, id: &str) -> GraphResult<(Edge, usize)> {
        let index = self.edge_index(id).ok_or_else(|| GraphError::not_found(id))?;
        let edge = self.edges.remove(index);
        trace!(edge_id = %id, index, "Removed edge");
        self.changes.push(ChangeEvent::EdgeRemoved { id: id.to_string() });
        Ok((edge, index))
    }

    /// Mutable access to a node; records a change notification
    pub(crate) fn node_mut(&mut self, id: &str) -> GraphResult<&mut Node> {
        let node = self.nodes.get_mut(id).ok_or_else(|| GraphError::not_found(id))?;
        self.changes.push(ChangeEvent::NodeChanged { id: id.to_string() });
        Ok(node)
    }

    /// Mutable access to an edge; records a change notification
    pub(crate) fn edge_mut(&mut self, id: &str) -> GraphResult<&mut Edge> {
        let edge = self
            .edges
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| GraphError::not_found(id))?;
        self.changes.push(ChangeEvent::EdgeChanged { id: id.to_string() });
        Ok(edge)
    }

    pub(crate) fn push_change(&mut self, event: ChangeEvent) {
        self.changes.push(event);
    }

    /// Drain pending change notifications
    pub fn take_changes(&mut self) -> Vec<ChangeEvent> {
        std::mem::take(&mut self.changes)
    }

    /// Check that an edge's endpoints reference existing nodes and ports
    pub fn check_edge(&self, edge: &Edge) -> GraphResult<()> {
        if edge.source.cell == edge.target.cell {
            return Err(GraphError::invalid_spec(format!(
                "edge '{}' connects node '{}' to itself",
                edge.id, edge.source.cell
            )));
        }
        for endpoint in [&edge.source, &edge.target] {
            let node = self
                .nodes
                .get(&endpoint.cell)
                .ok_or_else(|| GraphError::dangling(&edge.id, &endpoint.cell))?;
            if let Some(port) = &endpoint.port {
                if !node.has_port(port) {
                    return Err(GraphError::dangling(&edge.id, endpoint.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Snapshot the document in its serialized shape
    pub fn to_data(&self) -> DocumentData {
        DocumentData {
            nodes: self.nodes().cloned().collect(),
            edges: self.edges.clone(),
        }
    }

    /// Serialize to a JSON value
    pub fn to_json(&self) -> GraphResult<serde_json::Value> {
        Ok(serde_json::to_value(self.to_data())?)
    }

    /// Serialize to pretty-printed JSON text
    pub fn to_json_string(&self) -> GraphResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_data())?)
    }

    /// Build a document from serialized data, checking every invariant
    ///
    /// Nothing is constructed unless the whole input is valid.
    pub fn from_data(data: DocumentData) -> GraphResult<Self> {
        debug!(
            node_count = data.nodes.len(),
            edge_count = data.edges.len(),
            "Loading document"
        );

        let mut seen: HashSet<&str> = HashSet::new();
        for id in data
            .nodes
            .iter()
            .map(|n| n.id.as_str())
            .chain(data.edges.iter().map(|e| e.id.as_str()))
        {
            if id.is_empty() {
                return Err(GraphError::invalid_spec("cell id must not be empty"));
            }
            if !seen.insert(id) {
                warn!(cell_id = %id, "Duplicate id in document");
                return Err(GraphError::invalid_spec(format!("duplicate cell id '{}'", id)));
            }
        }

        if let Some(node) = data.nodes.iter().find(|n| n.id.contains(':')) {
            return Err(GraphError::invalid_spec(format!(
                "node id '{}' must not contain ':'",
                node.id
            )));
        }

        let by_id: HashMap<&str, &Node> = data.nodes.iter().map(|n| (n.id.as_str(), n)).collect();
        for node in &data.nodes {
            node.geometry().validate()?;
            let mut port_ids = HashSet::new();
            for port in &node.ports {
                if !port_ids.insert(port.id.as_str()) {
                    return Err(GraphError::invalid_spec(format!(
                        "node '{}' has duplicate port '{}'",
                        node.id, port.id
                    )));
                }
            }
            if let Some(parent) = &node.parent {
                let parent_node = by_id
                    .get(parent.as_str())
                    .ok_or_else(|| GraphError::dangling(&node.id, parent))?;
                if !parent_node.group {
                    return Err(GraphError::invalid_spec(format!(
                        "parent '{}' of node '{}' is not a group",
                        parent, node.id
                    )));
                }
            }
        }

        for node in &data.nodes {
            let mut chain: HashSet<&str> = HashSet::new();
            let mut current = node.parent.as_deref();
            while let Some(parent) = current {
                if parent == node.id || !chain.insert(parent) {
                    return Err(GraphError::cycle(&node.id, node.parent.as_deref().unwrap_or(parent)));
                }
                if chain.len() >= MAX_GROUP_DEPTH {
                    return Err(GraphError::invalid_spec(format!(
                        "node '{}' is nested deeper than the maximum group depth",
                        node.id
                    )));
                }
                current = by_id.get(parent).and_then(|p| p.parent.as_deref());
            }
        }

        let mut document = Document::new();
        for node in data.nodes {
            let id = node.id.clone();
            document.node_order.push(id.clone());
            document.nodes.insert(id, node);
        }
        for edge in &data.edges {
            document.check_edge(edge)?;
        }
        document.edges = data.edges;
        document.recompute_visibility();

        info!(
            node_count = document.node_count(),
            edge_count = document.edge_count(),
            "Document loaded"
        );
        Ok(document)
    }

    /// Parse and validate a JSON value
    pub fn from_json(value: serde_json::Value) -> GraphResult<Self> {
        let data: DocumentData = serde_json::from_value(value)?;
        Self::from_data(data)
    }

    /// Parse and validate JSON text
    pub fn from_json_str(text: &str) -> GraphResult<Self> {
        let data: DocumentData = serde_json::from_str(text)?;
        Self::from_data(data)
    }
}

impl PartialEq for Document {
    /// Compares content only; pending notifications are ignored
    fn eq(&self, other: &Self) -> bool {
        self.node_order == other.node_order
            && self.nodes == other.nodes
            && self.edges == other.edges
            && self.hidden == other.hidden
    }
}

impl Database for Document {
    type Node = Node;
    type Edge = Edge;

    fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    fn get_edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.node_order.iter().filter_map(|id| self.nodes.get(id))
    }

    fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter()
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.node_order.clear();
        self.edges.clear();
        self.hidden.clear();
        self.changes.push(ChangeEvent::Reset);
    }

    fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Endpoint, Port, PortSide, ShapeKind};
    use serde_json::json;

    fn rect(id: &str) -> Node {
        Node::new(id, ShapeKind::Rect)
    }

    #[test]
    fn test_insert_preserves_order() {
        let mut doc = Document::new();
        doc.insert_node_at(rect("b"), 0).unwrap();
        doc.insert_node_at(rect("a"), 0).unwrap();
        doc.insert_node_at(rect("c"), 99).unwrap();

        let ids: Vec<&str> = doc.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_ids_unique_across_nodes_and_edges() {
        let mut doc = Document::new();
        doc.insert_node_at(rect("a"), 0).unwrap();
        doc.insert_node_at(rect("b"), 1).unwrap();
        doc.insert_edge_at(Edge::new("e", Endpoint::node("a"), Endpoint::node("b")), 0)
            .unwrap();

        assert!(doc.insert_node_at(rect("e"), 2).is_err());
        assert!(doc
            .insert_edge_at(Edge::new("a", Endpoint::node("a"), Endpoint::node("b")), 0)
            .is_err());
    }

    #[test]
    fn test_next_id_skips_used() {
        let mut doc = Document::new();
        doc.insert_node_at(rect("node_1"), 0).unwrap();
        let mut counter = 0;
        assert_eq!(doc.next_id("node", &mut counter), "node_2");
        assert_eq!(doc.next_id("node", &mut counter), "node_3");
    }

    #[test]
    fn test_check_edge() {
        let mut doc = Document::new();
        let mut a = rect("a");
        a.ports = vec![Port::new("out", PortSide::Right)];
        doc.insert_node_at(a, 0).unwrap();
        doc.insert_node_at(rect("b"), 1).unwrap();

        let ok = Edge::new("e1", Endpoint::port("a", "out"), Endpoint::node("b"));
        assert!(doc.check_edge(&ok).is_ok());

        let self_loop = Edge::new("e2", Endpoint::node("a"), Endpoint::node("a"));
        assert!(matches!(doc.check_edge(&self_loop), Err(GraphError::InvalidSpec { .. })));

        let missing = Edge::new("e3", Endpoint::node("a"), Endpoint::node("z"));
        assert!(matches!(
            doc.check_edge(&missing),
            Err(GraphError::DanglingReference { .. })
        ));

        let bad_port = Edge::new("e4", Endpoint::port("a", "in"), Endpoint::node("b"));
        assert!(matches!(
            doc.check_edge(&bad_port),
            Err(GraphError::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_from_json_rejects_dangling_edge() {
        let result = Document::from_json(json!({
            "nodes": [{"id": "a", "shape": "flow-chart-rect",
                       "position": {"x": 0, "y": 0}, "size": {"width": 10, "height": 10}}],
            "edges": [{"id": "e", "source": {"cell": "a"}, "target": {"cell": "b"}}]
        }));
        assert!(matches!(result, Err(GraphError::DanglingReference { .. })));
    }

    #[test]
    fn test_from_json_rejects_parent_cycle() {
        let result = Document::from_json(json!({
            "nodes": [
                {"id": "g1", "shape": "group-node", "group": true, "parent": "g2",
                 "position": {"x": 0, "y": 0}, "size": {"width": 10, "height": 10}},
                {"id": "g2", "shape": "group-node", "group": true, "parent": "g1",
                 "position": {"x": 0, "y": 0}, "size": {"width": 10, "height": 10}}
            ]
        }));
        assert!(matches!(result, Err(GraphError::Cycle { .. })));
    }

    fn group_chain(len: usize) -> serde_json::Value {
        let nodes: Vec<serde_json::Value> = (0..len)
            .map(|i| {
                let mut node = json!({"id": format!("g{}", i), "shape": "group-node", "group": true});
                if i > 0 {
                    node["parent"] = json!(format!("g{}", i - 1));
                }
                node
            })
            .collect();
        json!({ "nodes": nodes })
    }

    #[test]
    fn test_from_json_rejects_excessive_nesting() {
        let result = Document::from_json(group_chain(MAX_GROUP_DEPTH + 5));
        assert!(matches!(result, Err(GraphError::InvalidSpec { .. })));

        let mut at_limit = group_chain(MAX_GROUP_DEPTH);
        at_limit["nodes"][0]["collapsed"] = json!(true);
        let doc = Document::from_json(at_limit).unwrap();
        assert_eq!(doc.hidden_count(), MAX_GROUP_DEPTH - 1);
    }

    #[test]
    fn test_from_json_rejects_colon_in_node_id() {
        let result = Document::from_json(json!({
            "nodes": [{"id": "a:top", "shape": "flow-chart-rect"}]
        }));
        assert!(matches!(result, Err(GraphError::InvalidSpec { .. })));
    }

    #[test]
    fn test_from_json_rejects_non_group_parent() {
        let result = Document::from_json(json!({
            "nodes": [
                {"id": "a", "shape": "flow-chart-rect",
                 "position": {"x": 0, "y": 0}, "size": {"width": 10, "height": 10}},
                {"id": "b", "shape": "flow-chart-rect", "parent": "a",
                 "position": {"x": 0, "y": 0}, "size": {"width": 10, "height": 10}}
            ]
        }));
        assert!(matches!(result, Err(GraphError::InvalidSpec { .. })));
    }

    #[test]
    fn test_from_json_rejects_unknown_shape() {
        let result = Document::from_json(json!({
            "nodes": [{"id": "a", "shape": "star",
                       "position": {"x": 0, "y": 0}, "size": {"width": 10, "height": 10}}]
        }));
        assert!(matches!(result, Err(GraphError::Json { .. })));
    }

    #[test]
    fn test_round_trip() {
        let mut doc = Document::new();
        let mut group = Node::new("g", ShapeKind::Group);
        group.collapsed = true;
        doc.insert_node_at(group, 0).unwrap();
        let mut child = rect("a");
        child.parent = Some("g".to_string());
        doc.insert_node_at(child, 1).unwrap();
        doc.insert_node_at(rect("b"), 2).unwrap();
        doc.insert_edge_at(Edge::new("e", Endpoint::node("a"), Endpoint::node("b")), 0)
            .unwrap();
        doc.take_changes();

        let restored = Document::from_json(doc.to_json().unwrap()).unwrap();
        assert_eq!(restored, doc);
        assert!(restored.hidden.contains("a"));
    }

    #[test]
    fn test_clear_emits_reset() {
        let mut doc = Document::new();
        doc.insert_node_at(rect("a"), 0).unwrap();
        doc.take_changes();
        doc.clear();
        assert_eq!(doc.node_count(), 0);
        assert_eq!(doc.take_changes(), vec![ChangeEvent::Reset]);
    }
}

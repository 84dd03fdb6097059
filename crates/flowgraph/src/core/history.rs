//! Reversible commands and the undo/redo history
//!
//! Every document mutation is expressed as a [`Command`] whose inverse is
//! known when it is built. [`History`] applies commands, keeps the undo and
//! redo stacks, and groups gestures into single atomic batches.

use tracing::{debug, info, trace, warn};

use super::document::Document;
use super::error::GraphResult;
use super::types::{Attrs, Edge, Geometry, Node};

/// Default number of undo steps kept
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// A single reversible mutation of the document
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Insert a node at a position in the node order
    InsertNode { node: Node, index: usize },
    /// Delete a node that currently sits at `index`
    DeleteNode { node: Node, index: usize },
    /// Insert an edge at a position in the edge list
    InsertEdge { edge: Edge, index: usize },
    /// Delete an edge that currently sits at `index`
    DeleteEdge { edge: Edge, index: usize },
    /// Move, resize or rotate a node
    SetGeometry {
        id: String,
        before: Geometry,
        after: Geometry,
    },
    /// Replace a node's attribute bag
    SetNodeAttrs {
        id: String,
        before: Attrs,
        after: Attrs,
    },
    /// Replace an edge's attribute bag
    SetEdgeAttrs {
        id: String,
        before: Attrs,
        after: Attrs,
    },
    /// Re-parent a node
    SetParent {
        id: String,
        before: Option<String>,
        after: Option<String>,
    },
    /// Collapse or expand a group
    SetCollapsed { id: String, before: bool, after: bool },
    /// Several commands applied and reverted as one
    Batch(Vec<Command>),
}

impl Command {
    /// The command that undoes this one
    pub fn inverse(&self) -> Command {
        match self {
            Command::InsertNode { node, index } => Command::DeleteNode {
                node: node.clone(),
                index: *index,
            },
            Command::DeleteNode { node, index } => Command::InsertNode {
                node: node.clone(),
                index: *index,
            },
            Command::InsertEdge { edge, index } => Command::DeleteEdge {
                edge: edge.clone(),
                index: *index,
            },
            Command::DeleteEdge { edge, index } => Command::InsertEdge {
                edge: edge.clone(),
                index: *index,
            },
            Command::SetGeometry { id, before, after } => Command::SetGeometry {
                id: id.clone(),
                before: *after,
                after: *before,
            },
            Command::SetNodeAttrs { id, before, after } => Command::SetNodeAttrs {
                id: id.clone(),
                before: after.clone(),
                after: before.clone(),
            },
            Command::SetEdgeAttrs { id, before, after } => Command::SetEdgeAttrs {
                id: id.clone(),
                before: after.clone(),
                after: before.clone(),
            },
            Command::SetParent { id, before, after } => Command::SetParent {
                id: id.clone(),
                before: after.clone(),
                after: before.clone(),
            },
            Command::SetCollapsed { id, before, after } => Command::SetCollapsed {
                id: id.clone(),
                before: *after,
                after: *before,
            },
            Command::Batch(commands) => {
                Command::Batch(commands.iter().rev().map(Command::inverse).collect())
            }
        }
    }

    /// Short name used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Command::InsertNode { .. } => "insert_node",
            Command::DeleteNode { .. } => "delete_node",
            Command::InsertEdge { .. } => "insert_edge",
            Command::DeleteEdge { .. } => "delete_edge",
            Command::SetGeometry { .. } => "set_geometry",
            Command::SetNodeAttrs { .. } => "set_node_attrs",
            Command::SetEdgeAttrs { .. } => "set_edge_attrs",
            Command::SetParent { .. } => "set_parent",
            Command::SetCollapsed { .. } => "set_collapsed",
            Command::Batch(_) => "batch",
        }
    }

    /// Returns true for a batch with nothing in it
    pub fn is_empty(&self) -> bool {
        match self {
            Command::Batch(commands) => commands.iter().all(Command::is_empty),
            _ => false,
        }
    }

    /// Apply the command to a document
    ///
    /// A batch either applies completely or is rolled back before the error
    /// is returned.
    pub fn apply(&self, doc: &mut Document) -> GraphResult<()> {
        trace!(command = self.label(), "Applying command");
        match self {
            Command::InsertNode { node, index } => doc.insert_node_at(node.clone(), *index),
            Command::DeleteNode { node, .. } => doc.remove_node(&node.id).map(|_| ()),
            Command::InsertEdge { edge, index } => doc.insert_edge_at(edge.clone(), *index),
            Command::DeleteEdge { edge, .. } => doc.remove_edge(&edge.id).map(|_| ()),
            Command::SetGeometry { id, after, .. } => {
                doc.node_mut(id)?.set_geometry(*after);
                Ok(())
            }
            Command::SetNodeAttrs { id, after, .. } => {
                doc.node_mut(id)?.attrs = after.clone();
                Ok(())
            }
            Command::SetEdgeAttrs { id, after, .. } => {
                doc.edge_mut(id)?.attrs = after.clone();
                Ok(())
            }
            Command::SetParent { id, after, .. } => {
                doc.node_mut(id)?.parent = after.clone();
                doc.refresh_subtree_visibility(id);
                Ok(())
            }
            Command::SetCollapsed { id, after, .. } => {
                doc.node_mut(id)?.collapsed = *after;
                doc.cascade_collapse(id);
                Ok(())
            }
            Command::Batch(commands) => {
                for (applied, command) in commands.iter().enumerate() {
                    if let Err(err) = command.apply(doc) {
                        warn!(error = %err, applied, "Batch failed, rolling back");
                        for done in commands[..applied].iter().rev() {
                            if let Err(rollback) = done.inverse().apply(doc) {
                                warn!(error = %rollback, "Batch rollback step failed");
                            }
                        }
                        return Err(err);
                    }
                }
                Ok(())
            }
        }
    }
}

/// Undo/redo history for a document
///
/// # Example
///
/// ```rust
/// use flowgraph::core::{Command, Document, History, Node, ShapeKind};
///
/// let mut doc = Document::new();
/// let mut history = History::new(100);
/// let node = Node::new("a", ShapeKind::Rect);
/// history.execute(&mut doc, Command::InsertNode { node, index: 0 }).unwrap();
/// assert!(history.undo(&mut doc).unwrap());
/// assert!(history.redo(&mut doc).unwrap());
/// ```
#[derive(Debug, Clone)]
pub struct History {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth; zero keeps everything
    limit: usize,
    /// Commands collected by an open gesture
    pending: Vec<Command>,
    /// Nesting depth of open gestures
    batch_depth: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// Create a new history with the given maximum undo depth
    pub fn new(limit: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            limit,
            pending: Vec::new(),
            batch_depth: 0,
        }
    }

    /// Apply a command and record it
    pub fn execute(&mut self, doc: &mut Document, command: Command) -> GraphResult<()> {
        if command.is_empty() {
            return Ok(());
        }
        command.apply(doc)?;
        debug!(command = command.label(), "Command executed");
        self.record(command);
        Ok(())
    }

    /// Record a command the caller has already applied
    pub(crate) fn push_applied(&mut self, command: Command) {
        if !command.is_empty() {
            debug!(command = command.label(), "Command recorded");
            self.record(command);
        }
    }

    fn record(&mut self, command: Command) {
        if self.batch_depth > 0 {
            self.pending.push(command);
            return;
        }
        self.undo_stack.push(command);
        self.redo_stack.clear();
        if self.limit > 0 && self.undo_stack.len() > self.limit {
            let excess = self.undo_stack.len() - self.limit;
            self.undo_stack.drain(..excess);
        }
    }

    /// Open a gesture; commands executed until the matching commit form one step
    pub fn begin_batch(&mut self) {
        self.batch_depth += 1;
        trace!(depth = self.batch_depth, "Batch opened");
    }

    /// Close a gesture, returning true if anything was recorded
    pub fn commit_batch(&mut self) -> bool {
        if self.batch_depth == 0 {
            return false;
        }
        self.batch_depth -= 1;
        if self.batch_depth > 0 {
            return false;
        }
        let mut commands = std::mem::take(&mut self.pending);
        let command = match commands.len() {
            0 => return false,
            1 => commands.remove(0),
            _ => Command::Batch(commands),
        };
        debug!(command = command.label(), "Batch committed");
        self.record(command);
        true
    }

    /// Abort an open gesture, reverting everything it applied
    pub fn cancel_batch(&mut self, doc: &mut Document) -> GraphResult<()> {
        if self.batch_depth == 0 {
            return Ok(());
        }
        self.batch_depth = 0;
        let commands = std::mem::take(&mut self.pending);
        debug!(reverted = commands.len(), "Batch cancelled");
        Command::Batch(commands).inverse().apply(doc)
    }

    /// Returns true while a gesture is open
    pub fn in_batch(&self) -> bool {
        self.batch_depth > 0
    }

    /// Undo the last command, returning true if an undo was performed
    ///
    /// An open gesture is cancelled instead.
    pub fn undo(&mut self, doc: &mut Document) -> GraphResult<bool> {
        if self.in_batch() {
            let had_work = !self.pending.is_empty();
            self.cancel_batch(doc)?;
            return Ok(had_work);
        }
        let Some(command) = self.undo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = command.inverse().apply(doc) {
            self.undo_stack.push(command);
            return Err(err);
        }
        info!(command = command.label(), remaining = self.undo_stack.len(), "Undo");
        self.redo_stack.push(command);
        Ok(true)
    }

    /// Redo the last undone command, returning true if a redo was performed
    pub fn redo(&mut self, doc: &mut Document) -> GraphResult<bool> {
        if self.in_batch() {
            return Ok(false);
        }
        let Some(command) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = command.apply(doc) {
            self.redo_stack.push(command);
            return Err(err);
        }
        info!(command = command.label(), remaining = self.redo_stack.len(), "Redo");
        self.undo_stack.push(command);
        Ok(true)
    }

    /// Returns true if there are commands to undo
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Returns true if there are commands to redo
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Clear all history, dropping any open gesture without reverting it
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.pending.clear();
        self.batch_depth = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::database::Database;
    use crate::core::types::{Point, ShapeKind};

    fn insert(id: &str, index: usize) -> Command {
        Command::InsertNode {
            node: Node::new(id, ShapeKind::Rect),
            index,
        }
    }

    #[test]
    fn test_undo_redo() {
        let mut doc = Document::new();
        let mut history = History::default();
        history.execute(&mut doc, insert("a", 0)).unwrap();
        assert!(history.can_undo());
        assert!(!history.can_redo());

        assert!(history.undo(&mut doc).unwrap());
        assert_eq!(doc.node_count(), 0);
        assert!(history.can_redo());

        assert!(history.redo(&mut doc).unwrap());
        assert_eq!(doc.node_count(), 1);
    }

    #[test]
    fn test_empty_stacks_are_noops() {
        let mut doc = Document::new();
        let mut history = History::default();
        assert!(!history.undo(&mut doc).unwrap());
        assert!(!history.redo(&mut doc).unwrap());
    }

    #[test]
    fn test_execute_clears_redo() {
        let mut doc = Document::new();
        let mut history = History::default();
        history.execute(&mut doc, insert("a", 0)).unwrap();
        history.undo(&mut doc).unwrap();
        history.execute(&mut doc, insert("b", 0)).unwrap();
        assert!(!history.can_redo());
    }

    #[test]
    fn test_limit_drops_oldest() {
        let mut doc = Document::new();
        let mut history = History::new(2);
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            history.execute(&mut doc, insert(id, i)).unwrap();
        }
        assert_eq!(history.undo_len(), 2);
        history.undo(&mut doc).unwrap();
        history.undo(&mut doc).unwrap();
        assert!(!history.undo(&mut doc).unwrap());
        assert!(doc.has_node("a"));
    }

    #[test]
    fn test_batch_is_one_step() {
        let mut doc = Document::new();
        let mut history = History::default();
        history.begin_batch();
        history.execute(&mut doc, insert("a", 0)).unwrap();
        history.execute(&mut doc, insert("b", 1)).unwrap();
        assert!(history.commit_batch());
        assert_eq!(history.undo_len(), 1);

        history.undo(&mut doc).unwrap();
        assert_eq!(doc.node_count(), 0);
    }

    #[test]
    fn test_cancel_batch_reverts() {
        let mut doc = Document::new();
        let mut history = History::default();
        history.execute(&mut doc, insert("a", 0)).unwrap();
        history.begin_batch();
        history
            .execute(
                &mut doc,
                Command::SetGeometry {
                    id: "a".into(),
                    before: Geometry::default(),
                    after: Geometry {
                        position: Point::new(40.0, 40.0),
                        ..Default::default()
                    },
                },
            )
            .unwrap();
        history.cancel_batch(&mut doc).unwrap();

        assert_eq!(doc.get_node("a").unwrap().position, Point::default());
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn test_failed_batch_rolls_back() {
        let mut doc = Document::new();
        let batch = Command::Batch(vec![insert("a", 0), insert("a", 1)]);
        assert!(batch.apply(&mut doc).is_err());
        assert_eq!(doc.node_count(), 0);
    }

    #[test]
    fn test_inverse_of_inverse() {
        let command = Command::Batch(vec![
            insert("a", 0),
            Command::SetCollapsed {
                id: "a".into(),
                before: false,
                after: true,
            },
        ]);
        assert_eq!(command.inverse().inverse(), command);
    }
}

//! Editor session
//!
//! The session owns everything an open canvas needs: the document, the
//! selection, the undo history, the shape catalog and the stencil palette.
//! Every mutation goes through here so it is validated, recorded as a
//! reversible command, and announced to the renderer.

use serde_json::Value;
use std::cmp::Reverse;
use std::collections::HashSet;
use tracing::{debug, info, span, warn, Level};

use super::config::EditorConfig;
use super::database::Database;
use super::document::{ChangeEvent, Document};
use super::error::{GraphError, GraphResult};
use super::grouping::MAX_GROUP_DEPTH;
use super::history::{Command, History};
use super::selection::{SelectMode, Selection};
use super::shapes::{default_edge_style, ShapeCatalog};
use super::stencil::StencilRegistry;
use super::types::{
    merge_attrs, set_text, Attrs, Edge, Endpoint, Geometry, Node, NodeSpec, Point, Size,
};
use super::validator::{check_connection, ConnectionRejection};

/// Commands applied so far by an in-progress session operation
struct Steps<'a> {
    doc: &'a mut Document,
    applied: Vec<Command>,
}

impl Steps<'_> {
    fn run(&mut self, command: Command) -> GraphResult<()> {
        command.apply(self.doc)?;
        self.applied.push(command);
        Ok(())
    }

    fn doc(&self) -> &Document {
        self.doc
    }
}

/// Snapshot held by copy/paste
#[derive(Debug, Clone, Default)]
struct Clipboard {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
}

/// A drag-to-connect gesture that has not been committed yet
///
/// Dropping it cancels the gesture; nothing is recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConnection {
    source: Endpoint,
}

impl PendingConnection {
    pub fn source(&self) -> &Endpoint {
        &self.source
    }

    /// Whether releasing over `target` would create an edge
    pub fn preview(&self, session: &EditorSession, target: &Endpoint) -> bool {
        session.validate_connection(&self.source, target)
    }
}

/// An open canvas: document, selection, history and palettes
#[derive(Debug)]
pub struct EditorSession {
    document: Document,
    selection: Selection,
    history: History,
    shapes: ShapeCatalog,
    stencils: StencilRegistry,
    config: EditorConfig,
    clipboard: Clipboard,
    node_counter: usize,
    edge_counter: usize,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorSession {
    /// Create a session with default configuration and palettes
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default())
    }

    /// Create a session with default palettes and the given configuration
    pub fn with_config(config: EditorConfig) -> Self {
        Self::with_parts(config, ShapeCatalog::with_defaults(), StencilRegistry::with_defaults())
    }

    /// Create a session from explicit parts
    pub fn with_parts(
        config: EditorConfig,
        shapes: ShapeCatalog,
        stencils: StencilRegistry,
    ) -> Self {
        Self {
            document: Document::new(),
            selection: Selection::new(),
            history: History::new(config.history_limit),
            shapes,
            stencils,
            config,
            clipboard: Clipboard::default(),
            node_counter: 0,
            edge_counter: 0,
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn shapes(&self) -> &ShapeCatalog {
        &self.shapes
    }

    pub fn stencils(&self) -> &StencilRegistry {
        &self.stencils
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Register an additional stencil template
    pub fn register_template(&mut self, name: impl Into<String>, spec: NodeSpec) -> GraphResult<()> {
        self.stencils.register(name, spec)
    }

    fn transact<T>(
        &mut self,
        operation: &str,
        f: impl FnOnce(&mut Steps<'_>) -> GraphResult<T>,
    ) -> GraphResult<T> {
        let mut steps = Steps {
            doc: &mut self.document,
            applied: Vec::new(),
        };
        let result = f(&mut steps);
        let mut applied = steps.applied;

        match result {
            Ok(value) => {
                let command = if applied.len() == 1 {
                    applied.remove(0)
                } else {
                    Command::Batch(applied)
                };
                self.history.push_applied(command);
                Ok(value)
            }
            Err(err) => {
                warn!(operation, error = %err, "Operation failed, rolling back");
                if let Err(rollback) = Command::Batch(applied).inverse().apply(&mut self.document) {
                    warn!(operation, error = %rollback, "Rollback failed");
                }
                Err(err)
            }
        }
    }

    fn prune_selection(&mut self) {
        let doc = &self.document;
        if self.selection.retain(|id| doc.contains(id)) {
            self.document.push_change(ChangeEvent::SelectionChanged);
        }
    }

    // ----- Document model -------------------------------------------------

    /// Create a node from a programmatic spec
    pub fn create_node(&mut self, spec: NodeSpec) -> GraphResult<Node> {
        let id = match &spec.id {
            Some(id) if id.trim().is_empty() => {
                return Err(GraphError::invalid_spec("node id must not be empty"))
            }
            Some(id) if self.document.contains(id) => {
                return Err(GraphError::invalid_spec(format!("duplicate cell id '{}'", id)))
            }
            Some(id) if id.contains(':') => {
                return Err(GraphError::invalid_spec(format!(
                    "node id '{}' must not contain ':'",
                    id
                )))
            }
            Some(id) => id.clone(),
            None => self.document.next_id("node", &mut self.node_counter),
        };
        let node = self.shapes.build_node(id, &spec)?;

        if let Some(parent) = &node.parent {
            if parent == &node.id {
                return Err(GraphError::cycle(&node.id, parent));
            }
            let parent_node = self
                .document
                .get_node(parent)
                .ok_or_else(|| GraphError::dangling(&node.id, parent))?;
            if !parent_node.group {
                return Err(GraphError::invalid_spec(format!(
                    "parent '{}' of node '{}' is not a group",
                    parent, node.id
                )));
            }
            if self.document.ancestors(parent).len() + 1 >= MAX_GROUP_DEPTH {
                return Err(GraphError::invalid_spec(format!(
                    "nesting '{}' under '{}' exceeds the maximum group depth",
                    node.id, parent
                )));
            }
        }

        let index = self.document.node_count();
        let created = node.clone();
        self.transact("create_node", |steps| {
            steps.run(Command::InsertNode { node, index })
        })?;
        debug!(node_id = %created.id, shape = %created.shape, "Node created");
        Ok(created)
    }

    /// Instantiate a stencil template onto the canvas
    pub fn create_node_from_template(
        &mut self,
        name: &str,
        overrides: &NodeSpec,
    ) -> GraphResult<Node> {
        let spec = self.stencils.instantiate(name, overrides)?;
        self.create_node(spec)
    }

    /// Connect two nodes with the default edge style
    pub fn create_edge(&mut self, source: Endpoint, target: Endpoint) -> GraphResult<Edge> {
        let id = self.document.next_id("edge", &mut self.edge_counter);
        let (router, attrs) = default_edge_style();
        let mut edge = Edge::new(id, source, target);
        edge.router = router;
        edge.attrs = attrs;
        self.add_edge(edge)
    }

    /// Insert a fully specified edge
    pub fn add_edge(&mut self, edge: Edge) -> GraphResult<Edge> {
        if edge.id.trim().is_empty() {
            return Err(GraphError::invalid_spec("edge id must not be empty"));
        }
        if self.document.contains(&edge.id) {
            return Err(GraphError::invalid_spec(format!(
                "duplicate cell id '{}'",
                edge.id
            )));
        }
        self.document.check_edge(&edge)?;

        let index = self.document.edge_count();
        let created = edge.clone();
        self.transact("create_edge", |steps| {
            steps.run(Command::InsertEdge { edge, index })
        })?;
        debug!(edge_id = %created.id, source = %created.source, target = %created.target, "Edge created");
        Ok(created)
    }

    /// Remove nodes and edges as one undoable step
    ///
    /// Edges attached to a removed node go with it. A removed group takes its
    /// descendants along only when `cascade` is set; otherwise they are
    /// detached and kept.
    pub fn remove_cells<S: AsRef<str>>(&mut self, ids: &[S], cascade: bool) -> GraphResult<Vec<String>> {
        let remove_span = span!(Level::DEBUG, "remove_cells", count = ids.len(), cascade);
        let _enter = remove_span.enter();

        let mut nodes: HashSet<String> = HashSet::new();
        let mut edges: HashSet<String> = HashSet::new();
        for id in ids {
            let id = id.as_ref();
            if self.document.has_node(id) {
                nodes.insert(id.to_string());
                if cascade {
                    nodes.extend(self.document.descendants(id));
                }
            } else if self.document.has_edge(id) {
                edges.insert(id.to_string());
            } else {
                return Err(GraphError::not_found(id));
            }
        }
        for edge in self.document.edges() {
            if nodes.contains(&edge.source.cell) || nodes.contains(&edge.target.cell) {
                edges.insert(edge.id.clone());
            }
        }

        // Fixed order keeps the recorded command deterministic.
        let edge_order: Vec<String> = self
            .document
            .edges()
            .filter(|e| edges.contains(&e.id))
            .map(|e| e.id.clone())
            .collect();
        let mut node_order: Vec<String> = self
            .document
            .nodes()
            .filter(|n| nodes.contains(&n.id))
            .map(|n| n.id.clone())
            .collect();
        node_order.reverse();
        // Deepest first, so undo re-inserts parents before their children.
        node_order.sort_by_key(|id| Reverse(self.document.ancestors(id).len()));
        let orphans: Vec<(String, Option<String>)> = self
            .document
            .nodes()
            .filter(|n| !nodes.contains(&n.id))
            .filter(|n| n.parent.as_ref().is_some_and(|p| nodes.contains(p)))
            .map(|n| (n.id.clone(), n.parent.clone()))
            .collect();

        self.transact("remove_cells", |steps| {
            for id in &edge_order {
                let (edge, index) = steps
                    .doc()
                    .get_edge(id)
                    .cloned()
                    .zip(steps.doc().edge_index(id))
                    .ok_or_else(|| GraphError::not_found(id))?;
                steps.run(Command::DeleteEdge { edge, index })?;
            }
            for (id, parent) in orphans {
                steps.run(Command::SetParent {
                    id,
                    before: parent,
                    after: None,
                })?;
            }
            for id in &node_order {
                let (node, index) = steps
                    .doc()
                    .get_node(id)
                    .cloned()
                    .zip(steps.doc().node_index(id))
                    .ok_or_else(|| GraphError::not_found(id))?;
                steps.run(Command::DeleteNode { node, index })?;
            }
            Ok(())
        })?;

        self.prune_selection();
        let removed: Vec<String> = node_order.into_iter().rev().chain(edge_order).collect();
        info!(removed = removed.len(), "Cells removed");
        Ok(removed)
    }

    /// Snapshot the document as JSON
    pub fn to_json(&self) -> GraphResult<Value> {
        self.document.to_json()
    }

    /// Snapshot the document as pretty-printed JSON text
    pub fn to_json_string(&self) -> GraphResult<String> {
        self.document.to_json_string()
    }

    /// Replace the document with one loaded from JSON
    ///
    /// On any error the session is left exactly as it was. A successful load
    /// clears the history and the selection.
    pub fn from_json(&mut self, value: Value) -> GraphResult<()> {
        let document = Document::from_json(value)?;
        self.replace_document(document)
    }

    /// Replace the document with one parsed from JSON text
    pub fn from_json_str(&mut self, text: &str) -> GraphResult<()> {
        let document = Document::from_json_str(text)?;
        self.replace_document(document)
    }

    fn replace_document(&mut self, mut document: Document) -> GraphResult<()> {
        if let Some(node) = document.nodes().find(|n| !self.shapes.contains(n.shape)) {
            return Err(GraphError::invalid_spec(format!(
                "node '{}' uses unregistered shape kind '{}'",
                node.id, node.shape
            )));
        }
        document.push_change(ChangeEvent::Reset);
        self.document = document;
        self.history.clear();
        self.selection.clear();
        self.node_counter = 0;
        self.edge_counter = 0;
        info!(
            node_count = self.document.node_count(),
            edge_count = self.document.edge_count(),
            "Session document replaced"
        );
        Ok(())
    }

    /// Drain change notifications for the renderer
    pub fn take_changes(&mut self) -> Vec<ChangeEvent> {
        self.document.take_changes()
    }

    // ----- Editing -------------------------------------------------------

    /// Move nodes by an offset; groups carry their descendants along
    pub fn move_cells<S: AsRef<str>>(&mut self, ids: &[S], dx: f64, dy: f64) -> GraphResult<()> {
        if !dx.is_finite() || !dy.is_finite() {
            return Err(GraphError::invalid_spec("move offset must be finite"));
        }
        let mut targets: Vec<String> = Vec::new();
        for id in ids {
            let id = id.as_ref();
            if self.document.has_edge(id) {
                continue;
            }
            if !self.document.has_node(id) {
                return Err(GraphError::not_found(id));
            }
            for candidate in std::iter::once(id.to_string()).chain(self.document.descendants(id)) {
                if !targets.contains(&candidate) {
                    targets.push(candidate);
                }
            }
        }

        let moves: Vec<Command> = targets
            .iter()
            .filter_map(|id| self.document.get_node(id))
            .map(|node| {
                let before = node.geometry();
                let mut after = before;
                after.position = before.position.translate(dx, dy);
                Command::SetGeometry {
                    id: node.id.clone(),
                    before,
                    after,
                }
            })
            .collect();

        debug!(moved = moves.len(), dx, dy, "Moving cells");
        self.transact("move_cells", |steps| {
            for command in moves {
                steps.run(command)?;
            }
            Ok(())
        })
    }

    /// Place a node at an absolute position
    pub fn set_position(&mut self, id: &str, position: Point) -> GraphResult<()> {
        let node = self.document.get_node(id).ok_or_else(|| GraphError::not_found(id))?;
        let current = node.position;
        self.move_cells(&[id], position.x - current.x, position.y - current.y)
    }

    /// Resize a node
    pub fn resize_node(&mut self, id: &str, size: Size) -> GraphResult<()> {
        self.update_geometry(id, |g| g.size = size)
    }

    /// Rotate a node to an absolute angle in degrees
    pub fn rotate_node(&mut self, id: &str, angle: f64) -> GraphResult<()> {
        self.update_geometry(id, |g| g.angle = angle)
    }

    fn update_geometry(
        &mut self,
        id: &str,
        change: impl FnOnce(&mut Geometry),
    ) -> GraphResult<()> {
        let node = self.document.get_node(id).ok_or_else(|| GraphError::not_found(id))?;
        let before = node.geometry();
        let mut after = before;
        change(&mut after);
        after.validate()?;
        if after == before {
            return Ok(());
        }
        let id = id.to_string();
        self.transact("set_geometry", |steps| {
            steps.run(Command::SetGeometry { id, before, after })
        })
    }

    /// Deep-merge an attribute patch into a node or edge
    pub fn set_attrs(&mut self, id: &str, patch: &Attrs) -> GraphResult<()> {
        let command = if let Some(node) = self.document.get_node(id) {
            let mut after = node.attrs.clone();
            merge_attrs(&mut after, patch);
            Command::SetNodeAttrs {
                id: id.to_string(),
                before: node.attrs.clone(),
                after,
            }
        } else if let Some(edge) = self.document.get_edge(id) {
            let mut after = edge.attrs.clone();
            merge_attrs(&mut after, patch);
            Command::SetEdgeAttrs {
                id: id.to_string(),
                before: edge.attrs.clone(),
                after,
            }
        } else {
            return Err(GraphError::not_found(id));
        };
        self.transact("set_attrs", |steps| steps.run(command))
    }

    /// Replace the display text of a node or edge
    pub fn set_text(&mut self, id: &str, text: &str) -> GraphResult<()> {
        let mut patch = Attrs::new();
        set_text(&mut patch, text);
        self.set_attrs(id, &patch)
    }

    // ----- Grouping ------------------------------------------------------

    /// Move a node into a group, or out of any group with `None`
    pub fn set_parent(&mut self, child: &str, parent: Option<&str>) -> GraphResult<()> {
        self.document.check_parent(child, parent)?;
        let before = self
            .document
            .get_node(child)
            .and_then(|n| n.parent.clone());
        let after = parent.map(str::to_string);
        if before == after {
            return Ok(());
        }
        let id = child.to_string();
        self.transact("set_parent", |steps| {
            steps.run(Command::SetParent { id, before, after })
        })
    }

    /// Collapse or expand a group
    pub fn set_collapsed(&mut self, group_id: &str, collapsed: bool) -> GraphResult<()> {
        let group = self
            .document
            .get_node(group_id)
            .ok_or_else(|| GraphError::not_found(group_id))?;
        if !group.group {
            return Err(GraphError::invalid_spec(format!(
                "node '{}' is not a group",
                group_id
            )));
        }
        let before = group.collapsed;
        if before == collapsed {
            return Ok(());
        }
        let id = group_id.to_string();
        self.transact("set_collapsed", |steps| {
            steps.run(Command::SetCollapsed {
                id,
                before,
                after: collapsed,
            })
        })?;
        info!(group_id, collapsed, "Group collapse toggled");
        Ok(())
    }

    /// Flip a group's collapsed flag, returning the new state
    pub fn toggle_collapse(&mut self, group_id: &str) -> GraphResult<bool> {
        let collapsed = self
            .document
            .get_node(group_id)
            .map(|n| n.collapsed)
            .ok_or_else(|| GraphError::not_found(group_id))?;
        self.set_collapsed(group_id, !collapsed)?;
        Ok(!collapsed)
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.document.is_visible(id)
    }

    // ----- Selection -----------------------------------------------------

    /// Update the selection; ids that do not exist are ignored
    pub fn select<S: AsRef<str>>(&mut self, ids: &[S], mode: SelectMode) {
        let known: Vec<String> = ids
            .iter()
            .map(|id| id.as_ref())
            .filter(|id| self.document.contains(id))
            .map(str::to_string)
            .collect();
        if self.selection.select(known, mode) {
            self.document.push_change(ChangeEvent::SelectionChanged);
        }
    }

    pub fn clear_selection(&mut self) {
        if self.selection.clear() {
            self.document.push_change(ChangeEvent::SelectionChanged);
        }
    }

    /// Selected ids in selection order
    pub fn selected(&self) -> &[String] {
        self.selection.ids()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    /// Remove every selected cell as one undoable step
    pub fn delete_selected(&mut self, cascade: bool) -> GraphResult<Vec<String>> {
        if self.selection.is_empty() {
            return Ok(Vec::new());
        }
        let ids = self.selection.ids().to_vec();
        self.remove_cells(&ids, cascade)
    }

    // ----- History -------------------------------------------------------

    pub fn undo(&mut self) -> GraphResult<bool> {
        let undone = self.history.undo(&mut self.document)?;
        self.prune_selection();
        Ok(undone)
    }

    pub fn redo(&mut self) -> GraphResult<bool> {
        let redone = self.history.redo(&mut self.document)?;
        self.prune_selection();
        Ok(redone)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Start a gesture; operations until `commit_gesture` undo as one step
    pub fn begin_gesture(&mut self) {
        self.history.begin_batch();
    }

    /// Finish a gesture, returning true if anything was recorded
    pub fn commit_gesture(&mut self) -> bool {
        self.history.commit_batch()
    }

    /// Abort a gesture, restoring the document to its state before it began
    pub fn cancel_gesture(&mut self) -> GraphResult<()> {
        self.history.cancel_batch(&mut self.document)?;
        self.prune_selection();
        Ok(())
    }

    // ----- Connections ---------------------------------------------------

    /// Check a proposed connection against the document and policy
    pub fn validate_connection(&self, source: &Endpoint, target: &Endpoint) -> bool {
        self.check_connection(source, target).is_ok()
    }

    /// Check a proposed connection, explaining a rejection
    pub fn check_connection(
        &self,
        source: &Endpoint,
        target: &Endpoint,
    ) -> Result<(), ConnectionRejection> {
        check_connection(&self.document, &self.config.connection, source, target)
    }

    /// Start dragging a connection out of a node or port
    pub fn begin_connection(&self, source: Endpoint) -> GraphResult<PendingConnection> {
        let node = self
            .document
            .get_node(&source.cell)
            .ok_or_else(|| GraphError::not_found(&source.cell))?;
        if let Some(port) = &source.port {
            if !node.has_port(port) {
                return Err(GraphError::dangling(&source.cell, source.to_string()));
            }
        }
        Ok(PendingConnection { source })
    }

    /// Whether releasing the pending connection over `target` would connect
    pub fn preview_connection(&self, pending: &PendingConnection, target: &Endpoint) -> bool {
        pending.preview(self, target)
    }

    /// Release the pending connection over `target`
    ///
    /// An illegal target cancels the gesture and returns `None`.
    pub fn complete_connection(
        &mut self,
        pending: PendingConnection,
        target: Endpoint,
    ) -> GraphResult<Option<Edge>> {
        if let Err(reason) = self.check_connection(&pending.source, &target) {
            debug!(source = %pending.source, %target, %reason, "Connection rejected");
            return Ok(None);
        }
        self.create_edge(pending.source, target).map(Some)
    }

    // ----- Clipboard -----------------------------------------------------

    /// Copy nodes (with their descendants) and the edges between them
    pub fn copy<S: AsRef<str>>(&mut self, ids: &[S]) -> usize {
        let mut picked: Vec<String> = Vec::new();
        for id in ids {
            let id = id.as_ref();
            if !self.document.has_node(id) {
                continue;
            }
            for candidate in std::iter::once(id.to_string()).chain(self.document.descendants(id)) {
                if !picked.contains(&candidate) {
                    picked.push(candidate);
                }
            }
        }
        let nodes: Vec<Node> = self
            .document
            .nodes()
            .filter(|n| picked.contains(&n.id))
            .cloned()
            .collect();
        let edges: Vec<Edge> = self
            .document
            .edges()
            .filter(|e| picked.contains(&e.source.cell) && picked.contains(&e.target.cell))
            .cloned()
            .collect();
        debug!(nodes = nodes.len(), edges = edges.len(), "Copied to clipboard");
        let copied = nodes.len();
        self.clipboard = Clipboard { nodes, edges };
        copied
    }

    /// Copy the current selection
    pub fn copy_selection(&mut self) -> usize {
        let ids = self.selection.ids().to_vec();
        self.copy(&ids)
    }

    pub fn clipboard_is_empty(&self) -> bool {
        self.clipboard.nodes.is_empty()
    }

    /// Paste the clipboard using the configured offset
    pub fn paste(&mut self) -> GraphResult<Vec<String>> {
        self.paste_with_offset(self.config.paste_offset)
    }

    /// Paste the clipboard with fresh ids, shifted by `offset` on both axes
    ///
    /// The pasted cells become the selection. Repeated pastes cascade.
    pub fn paste_with_offset(&mut self, offset: f64) -> GraphResult<Vec<String>> {
        if self.clipboard.nodes.is_empty() {
            return Ok(Vec::new());
        }
        if !offset.is_finite() {
            return Err(GraphError::invalid_spec("paste offset must be finite"));
        }

        let mut id_map: Vec<(String, String)> = Vec::new();
        for node in &self.clipboard.nodes {
            let fresh = self.document.next_id("node", &mut self.node_counter);
            id_map.push((node.id.clone(), fresh));
        }
        let lookup = |map: &[(String, String)], old: &str| {
            map.iter().find(|(from, _)| from == old).map(|(_, to)| to.clone())
        };

        let mut nodes = Vec::new();
        for node in &self.clipboard.nodes {
            let mut copy = node.clone();
            copy.id = lookup(&id_map, &node.id).unwrap_or_default();
            copy.position = node.position.translate(offset, offset);
            copy.parent = match &node.parent {
                Some(parent) => lookup(&id_map, parent).or_else(|| {
                    self.document
                        .get_node(parent)
                        .filter(|p| p.group)
                        .map(|p| p.id.clone())
                }),
                None => None,
            };
            nodes.push(copy);
        }

        let mut edges = Vec::new();
        for edge in &self.clipboard.edges {
            let mut copy = edge.clone();
            copy.id = self.document.next_id("edge", &mut self.edge_counter);
            copy.source.cell = lookup(&id_map, &edge.source.cell).unwrap_or_default();
            copy.target.cell = lookup(&id_map, &edge.target.cell).unwrap_or_default();
            edges.push(copy);
        }

        let node_base = self.document.node_count();
        let edge_base = self.document.edge_count();
        let mut pasted: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
        pasted.extend(edges.iter().map(|e| e.id.clone()));

        self.transact("paste", |steps| {
            for (i, node) in nodes.into_iter().enumerate() {
                steps.run(Command::InsertNode {
                    node,
                    index: node_base + i,
                })?;
            }
            // The original parent may have been nested deeper since the copy.
            for id in &pasted {
                if steps.doc().has_node(id) && steps.doc().ancestors(id).len() >= MAX_GROUP_DEPTH {
                    return Err(GraphError::invalid_spec(format!(
                        "pasting '{}' exceeds the maximum group depth",
                        id
                    )));
                }
            }
            for (i, edge) in edges.into_iter().enumerate() {
                steps.doc().check_edge(&edge)?;
                steps.run(Command::InsertEdge {
                    edge,
                    index: edge_base + i,
                })?;
            }
            Ok(())
        })?;

        for node in &mut self.clipboard.nodes {
            node.position = node.position.translate(offset, offset);
        }
        self.select(&pasted, SelectMode::Exclusive);
        info!(pasted = pasted.len(), "Clipboard pasted");
        Ok(pasted)
    }
}

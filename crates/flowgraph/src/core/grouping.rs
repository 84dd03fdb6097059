//! Group hierarchy and collapse visibility
//!
//! Parent links live on the child node. Every walk over the hierarchy is
//! iterative and bounded by [`MAX_GROUP_DEPTH`], so malformed input can never
//! recurse without end.

use std::collections::HashSet;
use tracing::{trace, warn};

use super::database::Database;
use super::document::{ChangeEvent, Document};
use super::error::{GraphError, GraphResult};

/// Deepest nesting the hierarchy walks will follow
pub const MAX_GROUP_DEPTH: usize = 256;

impl Document {
    /// Direct children of a node, in document order
    pub fn children(&self, id: &str) -> Vec<&str> {
        self.nodes()
            .filter(|n| n.parent.as_deref() == Some(id))
            .map(|n| n.id.as_str())
            .collect()
    }

    /// All transitive descendants, breadth first
    pub fn descendants(&self, id: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(id.to_string());
        let mut frontier = vec![id.to_string()];
        let mut depth = 0;

        while !frontier.is_empty() {
            if depth >= MAX_GROUP_DEPTH {
                warn!(group_id = %id, depth, "Group nesting exceeds depth bound");
                break;
            }
            let mut next = Vec::new();
            for parent in &frontier {
                for child in self.children(parent) {
                    if visited.insert(child.to_string()) {
                        result.push(child.to_string());
                        next.push(child.to_string());
                    }
                }
            }
            frontier = next;
            depth += 1;
        }
        result
    }

    /// Levels below a node; zero for a leaf
    pub fn subtree_height(&self, id: &str) -> usize {
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(id.to_string());
        let mut frontier = vec![id.to_string()];
        let mut height = 0;
        loop {
            let mut next = Vec::new();
            for parent in &frontier {
                for child in self.children(parent) {
                    if visited.insert(child.to_string()) {
                        next.push(child.to_string());
                    }
                }
            }
            if next.is_empty() || height >= MAX_GROUP_DEPTH {
                return height;
            }
            frontier = next;
            height += 1;
        }
    }

    /// Parent chain from the direct parent up to the root
    pub fn ancestors(&self, id: &str) -> Vec<String> {
        let mut result = Vec::new();
        let mut current = self.get_node(id).and_then(|n| n.parent.clone());
        while let Some(parent) = current {
            if result.len() >= MAX_GROUP_DEPTH || result.contains(&parent) {
                warn!(node_id = %id, "Parent chain exceeds depth bound");
                break;
            }
            current = self.get_node(&parent).and_then(|n| n.parent.clone());
            result.push(parent);
        }
        result
    }

    /// Check that `parent` can become the parent of `child`
    pub fn check_parent(&self, child: &str, parent: Option<&str>) -> GraphResult<()> {
        if !self.has_node(child) {
            return Err(GraphError::not_found(child));
        }
        let Some(parent) = parent else {
            return Ok(());
        };
        let parent_node = self
            .get_node(parent)
            .ok_or_else(|| GraphError::dangling(child, parent))?;
        if !parent_node.group {
            return Err(GraphError::invalid_spec(format!(
                "parent '{}' of node '{}' is not a group",
                parent, child
            )));
        }
        if parent == child || self.ancestors(parent).iter().any(|a| a == child) {
            return Err(GraphError::cycle(child, parent));
        }
        if self.ancestors(parent).len() + 1 + self.subtree_height(child) >= MAX_GROUP_DEPTH {
            return Err(GraphError::invalid_spec(format!(
                "nesting '{}' under '{}' exceeds the maximum group depth",
                child, parent
            )));
        }
        Ok(())
    }

    /// Returns true if the node exists and no ancestor is collapsed
    pub fn is_visible(&self, id: &str) -> bool {
        self.has_node(id) && !self.hidden.contains(id)
    }

    /// An edge is visible when both of its endpoints are
    pub fn is_edge_visible(&self, id: &str) -> bool {
        self.get_edge(id)
            .is_some_and(|e| self.is_visible(&e.source.cell) && self.is_visible(&e.target.cell))
    }

    /// Number of nodes currently hidden by collapsed groups
    pub fn hidden_count(&self) -> usize {
        self.hidden.len()
    }

    fn has_collapsed_ancestor(&self, id: &str) -> bool {
        self.ancestors(id)
            .iter()
            .any(|a| self.get_node(a).is_some_and(|n| n.collapsed))
    }

    fn set_visible(&mut self, id: &str, visible: bool) {
        let changed = if visible {
            self.hidden.remove(id)
        } else {
            self.hidden.insert(id.to_string())
        };
        if changed {
            trace!(node_id = %id, visible, "Visibility changed");
            self.push_change(ChangeEvent::VisibilityChanged {
                id: id.to_string(),
                visible,
            });
        }
    }

    /// Cascade a group's collapsed flag to its descendants
    ///
    /// Collapsing hides every descendant. Expanding shows descendants again,
    /// except those still under another collapsed group.
    pub(crate) fn cascade_collapse(&mut self, group_id: &str) {
        let Some(group) = self.get_node(group_id) else {
            return;
        };
        let hide = group.collapsed || self.hidden.contains(group_id);

        if hide {
            for id in self.descendants(group_id) {
                self.set_visible(&id, false);
            }
            return;
        }

        let mut stack = vec![(group_id.to_string(), 0usize)];
        let mut visited: HashSet<String> = HashSet::new();
        while let Some((current, depth)) = stack.pop() {
            if depth >= MAX_GROUP_DEPTH || !visited.insert(current.clone()) {
                continue;
            }
            let children: Vec<String> = self.children(&current).into_iter().map(String::from).collect();
            for child in children {
                self.set_visible(&child, true);
                if self.get_node(&child).is_some_and(|n| !n.collapsed) {
                    stack.push((child, depth + 1));
                } else {
                    for hidden in self.descendants(&child) {
                        self.set_visible(&hidden, false);
                    }
                }
            }
        }
    }

    /// Re-derive visibility for a node and everything below it
    pub(crate) fn refresh_subtree_visibility(&mut self, id: &str) {
        if !self.has_node(id) {
            return;
        }
        let visible = !self.has_collapsed_ancestor(id);
        self.set_visible(id, visible);
        self.cascade_collapse(id);
    }

    /// Re-derive visibility for the whole document from collapsed flags
    pub(crate) fn recompute_visibility(&mut self) {
        self.hidden.clear();
        let collapsed: Vec<String> = self
            .nodes()
            .filter(|n| n.collapsed)
            .map(|n| n.id.clone())
            .collect();
        for group in collapsed {
            for id in self.descendants(&group) {
                self.hidden.insert(id);
            }
        }
    }
}

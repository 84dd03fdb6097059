//! Flowgraph - state engine for flow-chart canvas editors
//!
//! Holds the graph document behind a drag-and-drop diagram editor: nodes,
//! edges and groups, every edit as an undoable command, selection,
//! collapsible groups, connection rules and a palette of node templates.
//! Drawing is left to the host; the engine reports what changed.
//!
//! # Quick Start
//!
//! ```rust
//! use flowgraph::prelude::*;
//!
//! let mut session = EditorSession::new();
//! let start = session
//!     .create_node_from_template("start", &NodeSpec::default().at(40.0, 40.0))
//!     .unwrap();
//! let step = session
//!     .create_node_from_template("process", &NodeSpec::default().at(40.0, 140.0))
//!     .unwrap();
//!
//! let source = Endpoint::port(&start.id, "bottom");
//! let target = Endpoint::port(&step.id, "top");
//! assert!(session.validate_connection(&source, &target));
//! session.create_edge(source, target).unwrap();
//!
//! session.undo().unwrap();
//! assert_eq!(session.document().edge_count(), 0);
//! ```
//!
//! # Persistence
//!
//! Documents serialize to a flat `{ "nodes": [...], "edges": [...] }` JSON
//! object:
//!
//! ```rust
//! use flowgraph::Database;
//!
//! let doc = flowgraph::load(r#"{"nodes": [{"id": "a", "shape": "flow-chart-rect"}]}"#).unwrap();
//! assert_eq!(doc.node_count(), 1);
//! ```

pub mod core;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub use core::*;

use anyhow::Context;
use std::path::Path;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        ChangeEvent, ConnectionPolicy, Database, Document, EditorConfig, EditorSession, Edge,
        Endpoint, GraphError, GraphResult, Node, NodeSpec, Point, Port, PortSide, SelectMode,
        ShapeKind, Size, StencilRegistry,
    };
}

/// Parse and validate a document from JSON text
///
/// # Example
/// ```rust
/// assert!(flowgraph::load(r#"{"nodes": [], "edges": [{"id": "e"}]}"#).is_err());
/// ```
pub fn load(json: &str) -> anyhow::Result<Document> {
    Ok(Document::from_json_str(json)?)
}

/// Read and validate a document file
pub fn load_file(path: impl AsRef<Path>) -> anyhow::Result<Document> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;
    Document::from_json_str(&text)
        .with_context(|| format!("Invalid document: {}", path.display()))
}

/// Open a session on a document file
pub fn open(path: impl AsRef<Path>, config: EditorConfig) -> anyhow::Result<EditorSession> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read document: {}", path.display()))?;
    let mut session = EditorSession::with_config(config);
    session
        .from_json_str(&text)
        .with_context(|| format!("Invalid document: {}", path.display()))?;
    Ok(session)
}

//! Editor operation scripts
//!
//! A script is a JSON array of operations replayed against a session, e.g.
//!
//! ```json
//! [
//!   {"op": "create", "template": "start", "id": "a", "x": 40, "y": 40},
//!   {"op": "create", "template": "process", "id": "b", "x": 40, "y": 140},
//!   {"op": "connect", "source": "a:bottom", "target": "b:top"},
//!   {"op": "undo"}
//! ]
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use flowgraph::{EditorSession, Endpoint, NodeSpec, SelectMode};

/// One replayable editor operation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScriptOp {
    /// Instantiate a palette template
    Create {
        template: String,
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        x: f64,
        #[serde(default)]
        y: f64,
        #[serde(default)]
        text: Option<String>,
        #[serde(default)]
        parent: Option<String>,
    },
    /// Connect two endpoints written as `node` or `node:port`
    Connect { source: String, target: String },
    Move { ids: Vec<String>, dx: f64, dy: f64 },
    Remove {
        ids: Vec<String>,
        #[serde(default)]
        cascade: bool,
    },
    SetText { id: String, text: String },
    SetParent {
        id: String,
        #[serde(default)]
        parent: Option<String>,
    },
    /// Flip a group between collapsed and expanded
    Collapse { id: String },
    Select {
        ids: Vec<String>,
        #[serde(default)]
        mode: Option<String>,
    },
    Copy { ids: Vec<String> },
    Paste,
    Undo,
    Redo,
}

/// Parse a script from JSON text
pub fn parse_script(text: &str) -> Result<Vec<ScriptOp>> {
    serde_json::from_str(text).context("Invalid operation script")
}

/// Replay operations in order, stopping at the first failure
///
/// Returns the number of operations applied.
pub fn run_script(session: &mut EditorSession, ops: &[ScriptOp]) -> Result<usize> {
    for (index, op) in ops.iter().enumerate() {
        debug!(index, ?op, "Applying script operation");
        apply(session, op).with_context(|| format!("Operation #{} failed", index + 1))?;
    }
    info!(operations = ops.len(), "Script applied");
    Ok(ops.len())
}

fn apply(session: &mut EditorSession, op: &ScriptOp) -> Result<()> {
    match op {
        ScriptOp::Create {
            template,
            id,
            x,
            y,
            text,
            parent,
        } => {
            let mut overrides = NodeSpec::default().at(*x, *y);
            overrides.id = id.clone();
            overrides.parent = parent.clone();
            if let Some(text) = text {
                overrides = overrides.with_text(text.as_str());
            }
            session.create_node_from_template(template, &overrides)?;
        }
        ScriptOp::Connect { source, target } => {
            let source: Endpoint = source.parse()?;
            let target: Endpoint = target.parse()?;
            if let Err(reason) = session.check_connection(&source, &target) {
                anyhow::bail!("Connection {} -> {} refused: {}", source, target, reason);
            }
            session.create_edge(source, target)?;
        }
        ScriptOp::Move { ids, dx, dy } => session.move_cells(ids, *dx, *dy)?,
        ScriptOp::Remove { ids, cascade } => {
            session.remove_cells(ids, *cascade)?;
        }
        ScriptOp::SetText { id, text } => session.set_text(id, text)?,
        ScriptOp::SetParent { id, parent } => session.set_parent(id, parent.as_deref())?,
        ScriptOp::Collapse { id } => {
            session.toggle_collapse(id)?;
        }
        ScriptOp::Select { ids, mode } => {
            let mode = match mode {
                Some(mode) => mode.parse().map_err(anyhow::Error::msg)?,
                None => SelectMode::Exclusive,
            };
            session.select(ids, mode);
        }
        ScriptOp::Copy { ids } => {
            session.copy(ids);
        }
        ScriptOp::Paste => {
            session.paste()?;
        }
        ScriptOp::Undo => {
            session.undo()?;
        }
        ScriptOp::Redo => {
            session.redo()?;
        }
    }
    Ok(())
}

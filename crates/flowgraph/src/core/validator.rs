//! Connection validation
//!
//! Decides whether a proposed edge between two endpoints is legal. The check
//! is a pure function of the stored graph and the two endpoints, so the
//! renderer can call it synchronously while the user drags a connection.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

use super::database::Database;
use super::types::{Edge, Endpoint, Node};

/// Rules applied on top of the structural checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionPolicy {
    /// Both ends must land on a port rather than the node body
    pub require_magnet: bool,
    /// Allow B->A when A->B already exists
    pub allow_reverse_duplicate: bool,
    /// Allow a second A->B between the same endpoints
    pub allow_duplicate: bool,
}

impl Default for ConnectionPolicy {
    fn default() -> Self {
        Self {
            require_magnet: true,
            allow_reverse_duplicate: true,
            allow_duplicate: true,
        }
    }
}

/// Why a proposed connection was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionRejection {
    SameNode { node: String },
    MissingNode { node: String },
    MissingPort { endpoint: String },
    MissingSourceMagnet,
    MissingTargetMagnet,
    Duplicate { existing: String },
    ReverseDuplicate { existing: String },
}

impl fmt::Display for ConnectionRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionRejection::SameNode { node } => {
                write!(f, "source and target are the same node '{}'", node)
            }
            ConnectionRejection::MissingNode { node } => write!(f, "node '{}' does not exist", node),
            ConnectionRejection::MissingPort { endpoint } => {
                write!(f, "port '{}' does not exist", endpoint)
            }
            ConnectionRejection::MissingSourceMagnet => write!(f, "source has no anchor port"),
            ConnectionRejection::MissingTargetMagnet => write!(f, "target has no anchor port"),
            ConnectionRejection::Duplicate { existing } => {
                write!(f, "edge '{}' already connects these endpoints", existing)
            }
            ConnectionRejection::ReverseDuplicate { existing } => {
                write!(f, "edge '{}' already connects these nodes in reverse", existing)
            }
        }
    }
}

/// Check a proposed connection, explaining any rejection
pub fn check_connection<D>(
    db: &D,
    policy: &ConnectionPolicy,
    source: &Endpoint,
    target: &Endpoint,
) -> Result<(), ConnectionRejection>
where
    D: Database<Node = Node, Edge = Edge>,
{
    if source.cell == target.cell {
        return Err(ConnectionRejection::SameNode {
            node: source.cell.clone(),
        });
    }

    for endpoint in [source, target] {
        let node = db
            .get_node(&endpoint.cell)
            .ok_or_else(|| ConnectionRejection::MissingNode {
                node: endpoint.cell.clone(),
            })?;
        if let Some(port) = &endpoint.port {
            if !node.has_port(port) {
                return Err(ConnectionRejection::MissingPort {
                    endpoint: endpoint.to_string(),
                });
            }
        }
    }

    if policy.require_magnet {
        if source.port.is_none() {
            return Err(ConnectionRejection::MissingSourceMagnet);
        }
        if target.port.is_none() {
            return Err(ConnectionRejection::MissingTargetMagnet);
        }
    }

    for edge in db.edges() {
        if !policy.allow_duplicate && &edge.source == source && &edge.target == target {
            return Err(ConnectionRejection::Duplicate {
                existing: edge.id.clone(),
            });
        }
        if !policy.allow_reverse_duplicate
            && edge.source.cell == target.cell
            && edge.target.cell == source.cell
        {
            return Err(ConnectionRejection::ReverseDuplicate {
                existing: edge.id.clone(),
            });
        }
    }

    Ok(())
}

/// Returns true if the connection is legal under the policy
pub fn validate_connection<D>(
    db: &D,
    policy: &ConnectionPolicy,
    source: &Endpoint,
    target: &Endpoint,
) -> bool
where
    D: Database<Node = Node, Edge = Edge>,
{
    let verdict = check_connection(db, policy, source, target);
    trace!(%source, %target, valid = verdict.is_ok(), "Validated connection");
    verdict.is_ok()
}

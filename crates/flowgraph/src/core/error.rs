//! Core error types for the graph engine
//!
//! Structural errors are surfaced to the caller and never repaired silently.

use thiserror::Error;

/// Errors raised by document, history, and registry operations
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Invalid spec: {message}")]
    InvalidSpec { message: String },

    #[error("Unknown template: {name}")]
    UnknownTemplate { name: String },

    #[error("Dangling reference: {from} refers to missing {missing}")]
    DanglingReference { from: String, missing: String },

    #[error("Cycle: making {parent} the parent of {node} would create a cycle")]
    Cycle { node: String, parent: String },

    #[error("Cell not found: {id}")]
    NotFound { id: String },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl GraphError {
    /// Create a new invalid spec error
    pub fn invalid_spec(message: impl Into<String>) -> Self {
        Self::InvalidSpec {
            message: message.into(),
        }
    }

    /// Create a new unknown template error
    pub fn unknown_template(name: impl Into<String>) -> Self {
        Self::UnknownTemplate { name: name.into() }
    }

    /// Create a new dangling reference error
    pub fn dangling(from: impl Into<String>, missing: impl Into<String>) -> Self {
        Self::DanglingReference {
            from: from.into(),
            missing: missing.into(),
        }
    }

    /// Create a new cycle error
    pub fn cycle(node: impl Into<String>, parent: impl Into<String>) -> Self {
        Self::Cycle {
            node: node.into(),
            parent: parent.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }
}

/// Result alias used throughout the core
pub type GraphResult<T> = std::result::Result<T, GraphError>;

//! Editor configuration
//!
//! Settings that shape engine behavior. They are plain serde data so a host
//! can keep them in a JSON file next to its other preferences.

use serde::{Deserialize, Serialize};

use super::error::GraphResult;
use super::history::DEFAULT_HISTORY_LIMIT;
use super::validator::ConnectionPolicy;

/// Engine configuration for an editor session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Maximum undo depth; zero keeps everything
    pub history_limit: usize,
    /// Rules for interactive connections
    pub connection: ConnectionPolicy,
    /// Offset applied to each paste, in canvas units
    pub paste_offset: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            connection: ConnectionPolicy::default(),
            paste_offset: 20.0,
        }
    }
}

impl EditorConfig {
    /// Parse a configuration from JSON text; missing keys take defaults
    pub fn from_json_str(text: &str) -> GraphResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Set the undo depth
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Set the connection policy
    pub fn with_connection(mut self, policy: ConnectionPolicy) -> Self {
        self.connection = policy;
        self
    }
}

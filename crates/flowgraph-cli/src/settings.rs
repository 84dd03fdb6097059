//! Persisted UI preferences
//!
//! Display options the editor front end remembers between runs. Updates are
//! merged key by key so a partial patch never resets the other settings.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Editor UI preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// Hide every panel except the canvas
    pub zen_mode: bool,
    /// Edit node text with the rich text editor
    pub open_node_rich_text: bool,
    /// Left button draws a selection box, right button pans
    pub use_left_key_selection_right_key_drag: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            zen_mode: false,
            open_node_rich_text: true,
            use_left_key_selection_right_key_drag: false,
        }
    }
}

impl UiSettings {
    /// Load settings from a file, or defaults if it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file '{}'", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Invalid settings file '{}'", path.display()))
    }

    /// Write settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)
            .with_context(|| format!("Failed to write settings file '{}'", path.display()))
    }

    /// Overlay the keys present in `patch`; unknown keys are an error
    pub fn merge(&mut self, patch: &Map<String, Value>) -> Result<()> {
        let mut current = match serde_json::to_value(&*self)? {
            Value::Object(map) => map,
            _ => return Err(anyhow!("settings did not serialize to an object")),
        };
        for (key, value) in patch {
            if !current.contains_key(key) {
                return Err(anyhow!("Unknown setting '{}'", key));
            }
            current.insert(key.clone(), value.clone());
        }
        *self = serde_json::from_value(Value::Object(current))
            .context("Setting has the wrong type")?;
        Ok(())
    }
}

/// Parse `key=value` assignments into a patch; values are JSON or bare strings
pub fn parse_assignments(assignments: &[String]) -> Result<Map<String, Value>> {
    let mut patch = Map::new();
    for assignment in assignments {
        let (key, raw) = assignment
            .split_once('=')
            .ok_or_else(|| anyhow!("Expected key=value, got '{}'", assignment))?;
        let value = serde_json::from_str(raw.trim())
            .unwrap_or_else(|_| Value::String(raw.trim().to_string()));
        patch.insert(key.trim().to_string(), value);
    }
    Ok(patch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_merge_is_partial() {
        let mut settings = UiSettings::default();
        let patch = parse_assignments(&["zen_mode=true".to_string()]).unwrap();
        settings.merge(&patch).unwrap();
        assert!(settings.zen_mode);
        assert!(settings.open_node_rich_text);
    }

    #[test]
    fn test_merge_rejects_unknown_and_mistyped() {
        let mut settings = UiSettings::default();
        let unknown = parse_assignments(&["theme=dark".to_string()]).unwrap();
        assert!(settings.merge(&unknown).is_err());

        let mistyped = parse_assignments(&["zen_mode=yes".to_string()]).unwrap();
        assert!(settings.merge(&mistyped).is_err());
        assert_eq!(settings, UiSettings::default());
    }

    #[test]
    fn test_bad_assignment() {
        assert!(parse_assignments(&["zen_mode".to_string()]).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        assert_eq!(UiSettings::load(&path).unwrap(), UiSettings::default());

        let settings = UiSettings {
            zen_mode: true,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        assert_eq!(UiSettings::load(&path).unwrap(), settings);
    }
}

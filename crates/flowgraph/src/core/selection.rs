//! Selection tracking
//!
//! The selection is transient session state: an ordered set of cell ids.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a `select` call combines with the current selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectMode {
    /// Replace the selection
    #[default]
    Exclusive,
    /// Add to the selection
    Additive,
    /// Flip membership of each id
    Toggle,
}

impl FromStr for SelectMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "exclusive" => Ok(SelectMode::Exclusive),
            "additive" => Ok(SelectMode::Additive),
            "toggle" => Ok(SelectMode::Toggle),
            _ => Err(format!("Unknown select mode: {}", s)),
        }
    }
}

impl fmt::Display for SelectMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectMode::Exclusive => write!(f, "exclusive"),
            SelectMode::Additive => write!(f, "additive"),
            SelectMode::Toggle => write!(f, "toggle"),
        }
    }
}

/// Currently selected cell ids, in the order they were selected
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a selection request; returns true if membership changed
    pub fn select<I, S>(&mut self, ids: I, mode: SelectMode) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let before = self.ids.clone();
        if mode == SelectMode::Exclusive {
            self.ids.clear();
        }
        for id in ids {
            let id = id.into();
            match (mode, self.position(&id)) {
                (SelectMode::Toggle, Some(index)) => {
                    self.ids.remove(index);
                }
                (_, None) => self.ids.push(id),
                (_, Some(_)) => {}
            }
        }
        self.ids != before
    }

    /// Remove ids from the selection; returns true if any were selected
    pub fn deselect<'a, I>(&mut self, ids: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        let before = self.ids.len();
        for id in ids {
            self.ids.retain(|s| s != id);
        }
        self.ids.len() != before
    }

    /// Keep only ids accepted by the predicate
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> bool {
        let before = self.ids.len();
        self.ids.retain(|id| keep(id));
        self.ids.len() != before
    }

    /// Empty the selection; returns true if it was non-empty
    pub fn clear(&mut self) -> bool {
        let changed = !self.ids.is_empty();
        self.ids.clear();
        changed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.position(id).is_some()
    }

    /// Selected ids, in selection order
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.ids.iter().position(|s| s == id)
    }
}

//! Persisted panel expansion.
//!
//! Each panel is keyed by the path formed from the titles of its panel
//! ancestors and its own title, joined with `/`. Titles are escaped so that
//! a title containing `/` cannot collide with a deeper path.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{InspectError, Result};

/// Stored state of one panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expansion {
    Expanded,
    Collapsed,
}

impl Expansion {
    pub fn from_expanded(expanded: bool) -> Self {
        if expanded { Self::Expanded } else { Self::Collapsed }
    }

    pub fn is_expanded(self) -> bool {
        self == Self::Expanded
    }
}

/// Map from panel path to its persisted expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelStates {
    states: BTreeMap<String, Expansion>,
}

impl PanelStates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Expansion> {
        self.states.get(path).copied()
    }

    pub fn set(&mut self, path: impl Into<String>, state: Expansion) {
        self.states.insert(path.into(), state);
    }

    pub fn remove(&mut self, path: &str) -> Option<Expansion> {
        self.states.remove(path)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Expansion)> {
        self.states.iter().map(|(path, state)| (path.as_str(), *state))
    }

    /// Serialize as a JSON object.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a JSON object produced by [`to_json`](Self::to_json).
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_json()?;
        std::fs::write(path, text).map_err(|e| InspectError::io(path, e))
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| InspectError::io(path, e))?;
        Self::from_json(&text)
    }
}

/// Escape a title for use as one path segment.
pub fn escape_title(title: &str) -> String {
    let mut escaped = String::with_capacity(title.len());
    for c in title.chars() {
        if c == '\\' || c == '/' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Join panel titles, outermost first, into a path key.
pub fn join_path<'a>(titles: impl IntoIterator<Item = &'a str>) -> String {
    titles
        .into_iter()
        .map(escape_title)
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path_escapes() {
        assert_eq!(join_path(["Mesh", "Material"]), "Mesh/Material");
        assert_eq!(join_path(["In/Out"]), "In\\/Out");
        assert_ne!(join_path(["a/b"]), join_path(["a", "b"]));
    }

    #[test]
    fn test_json_round_trip() {
        let mut states = PanelStates::new();
        states.set("Mesh", Expansion::Collapsed);
        states.set("Mesh/Material", Expansion::Expanded);

        let json = states.to_json().unwrap();
        assert!(json.contains("\"collapsed\""));
        assert_eq!(PanelStates::from_json(&json).unwrap(), states);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("panels.json");
        let mut states = PanelStates::new();
        states.set("Light", Expansion::Collapsed);
        states.save_json(&path).unwrap();

        let loaded = PanelStates::load_json(&path).unwrap();
        assert_eq!(loaded.get("Light"), Some(Expansion::Collapsed));
        assert_eq!(loaded.get("Camera"), None);
    }

    #[test]
    fn test_invalid_json() {
        let err = PanelStates::from_json("[1, 2]").unwrap_err();
        assert!(matches!(err, InspectError::Json(_)));
    }
}

//! Canvas configuration.
//!
//! Layout metrics and behaviour switches shared by every control of a
//! canvas. Loaded from TOML:
//!
//! ```
//! use horizon_inspect::CanvasConfig;
//!
//! let config = CanvasConfig::from_toml_str(r#"
//!     panels_expanded_by_default = false
//!
//!     [metrics]
//!     standard_width = 160
//! "#).unwrap();
//! assert_eq!(config.metrics.standard_width, 160);
//! assert_eq!(config.metrics.pad, 4);
//! assert_eq!(config.item_delimiter, '|');
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{InspectError, Result};

/// Shared layout metrics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    /// Width of a standard control.
    pub standard_width: u32,
    /// Height of a standard control row.
    pub standard_height: u32,
    /// Border around containers.
    pub border: u32,
    /// Gap between controls.
    pub pad: u32,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            standard_width: 120,
            standard_height: 20,
            border: 2,
            pad: 4,
        }
    }
}

/// Configuration of one canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    /// Layout metrics.
    pub metrics: Metrics,
    /// Separator between list items in text form.
    pub item_delimiter: char,
    /// Expansion of panels with no persisted state.
    pub panels_expanded_by_default: bool,
    /// History length of an undo queue created for the canvas.
    pub undo_limit: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            metrics: Metrics::default(),
            item_delimiter: horizon_inspect_core::ITEM_DELIMITER,
            panels_expanded_by_default: true,
            undo_limit: horizon_inspect_core::UndoQueue::DEFAULT_MAX_LEN,
        }
    }
}

impl CanvasConfig {
    /// Parse a configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a configuration from a TOML file.
    pub fn load_toml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| InspectError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save the configuration to a TOML file.
    pub fn save_toml(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let text = self.to_toml_string()?;
        std::fs::write(path, text).map_err(|e| InspectError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CanvasConfig::default();
        assert_eq!(config.metrics, Metrics::default());
        assert_eq!(config.item_delimiter, '|');
        assert!(config.panels_expanded_by_default);
        assert_eq!(config.undo_limit, 100);
    }

    #[test]
    fn test_partial_toml() {
        let config = CanvasConfig::from_toml_str("item_delimiter = ','\n[metrics]\nborder = 0\n").unwrap();
        assert_eq!(config.item_delimiter, ',');
        assert_eq!(config.metrics.border, 0);
        assert_eq!(config.metrics.standard_height, 20);
    }

    #[test]
    fn test_invalid_toml() {
        let err = CanvasConfig::from_toml_str("metrics = 3").unwrap_err();
        assert!(matches!(err, InspectError::Toml(_)));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canvas.toml");
        let mut config = CanvasConfig::default();
        config.metrics.pad = 9;
        config.panels_expanded_by_default = false;
        config.save_toml(&path).unwrap();

        assert_eq!(CanvasConfig::load_toml(&path).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = CanvasConfig::load_toml("/nonexistent/canvas.toml").unwrap_err();
        assert!(matches!(err, InspectError::Io { .. }));
    }
}

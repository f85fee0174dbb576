//! Overlay options with TOML preset support.
//!
//! Everything a user can tweak without touching the CSV (delimiters, the
//! column/condition selection, per-key scales, how structures are fetched)
//! lives here. Options serialize to/from TOML so a selection can be saved as
//! a named preset and reloaded later.

mod data;
mod scales;
mod selection;
mod viewer;

use std::path::Path;

pub use data::DataOptions;
use rustc_hash::FxHashMap;
pub use scales::{scale_table, ScaleOverride};
use schemars::JsonSchema;
pub use selection::SelectionOptions;
use serde::{Deserialize, Serialize};
pub use viewer::ViewerOptions;

use crate::aggregate::ColumnKey;
use crate::error::OverlayError;
use crate::scale::ScaleConfig;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only a `[selection]` table) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct OverlayOptions {
    /// CSV reading and validation.
    pub data: DataOptions,
    /// Selected columns and conditions.
    pub selection: SelectionOptions,
    /// Per-key scale overrides.
    #[schemars(skip)]
    pub scales: Vec<ScaleOverride>,
    /// Structure fetching and default color.
    pub viewer: ViewerOptions,
}

impl OverlayOptions {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(OverlayOptions)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// [`OverlayError::Io`] when the file cannot be read and
    /// [`OverlayError::OptionsParse`] when it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, OverlayError> {
        let content = std::fs::read_to_string(path).map_err(OverlayError::Io)?;
        Self::from_toml(&content)
    }

    /// Parse options from TOML text.
    ///
    /// # Errors
    ///
    /// [`OverlayError::OptionsParse`] when the text is not valid options
    /// TOML.
    pub fn from_toml(content: &str) -> Result<Self, OverlayError> {
        toml::from_str(content)
            .map_err(|e| OverlayError::OptionsParse(e.to_string()))
    }

    /// Save options to a TOML file (pretty-printed).
    ///
    /// # Errors
    ///
    /// [`OverlayError::OptionsParse`] when serialization fails and
    /// [`OverlayError::Io`] when the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), OverlayError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| OverlayError::OptionsParse(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(OverlayError::Io)?;
        }
        std::fs::write(path, content).map_err(OverlayError::Io)
    }

    /// List available preset names (TOML file stems) in a directory.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let mut names = Vec::new();
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) =
                        path.file_stem().and_then(|s| s.to_str())
                    {
                        names.push(stem.to_owned());
                    }
                }
            }
        }
        names.sort();
        names
    }

    /// Scale overrides as a side table keyed by column key.
    #[must_use]
    pub fn scale_configs(&self) -> FxHashMap<ColumnKey, ScaleConfig> {
        scale_table(&self.scales)
    }

    /// Set (or replace) the scale override for one key.
    pub fn set_scale(&mut self, key: &ColumnKey, scale: ScaleConfig) {
        match self.scales.iter_mut().find(|o| o.key() == *key) {
            Some(existing) => existing.scale = scale,
            None => self.scales.push(ScaleOverride {
                column: key.column.clone(),
                condition: key.condition.clone(),
                scale,
            }),
        }
    }
}

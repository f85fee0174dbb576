//! The narrow interface to an external structure viewer.
//!
//! The pipeline never touches viewer state directly. It hands the viewer
//! structure-load requests and finished [`ColoredElement`]s through
//! [`ViewerBinding`], and treats a `false` return as a partial failure to
//! report, not as an error.
//!
//! ```
//! # use residue_overlay::viewer::{structure_url, DEFAULT_URL_TEMPLATE};
//! assert_eq!(
//!     structure_url(DEFAULT_URL_TEMPLATE, "6XR8"),
//!     "https://www.ebi.ac.uk/pdbe/static/entry/6xr8_updated.cif"
//! );
//! ```

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::element::ColoredElement;
use crate::options::ViewerOptions;

/// Placeholder replaced by the lower-cased model id.
pub const MODEL_PLACEHOLDER: &str = "{model}";

/// PDBe updated mmCIF files.
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://www.ebi.ac.uk/pdbe/static/entry/{model}_updated.cif";

/// Assembly loaded for every structure.
pub const DEFAULT_ASSEMBLY_ID: &str = "1";

// ── Requests ─────────────────────────────────────────────────────────────

/// Structure file format handed to the viewer.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum StructureFormat {
    /// Text mmCIF.
    #[default]
    Mmcif,
    /// Binary CIF.
    Bcif,
    /// Legacy PDB.
    Pdb,
}

/// One structure to load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureRequest {
    /// Download URL.
    pub url: String,
    /// File format.
    pub format: StructureFormat,
    /// Assembly to show.
    pub assembly_id: String,
    /// Whether the payload is binary.
    pub is_binary: bool,
}

/// Substitute the lower-cased `model` into `template`.
#[must_use]
pub fn structure_url(template: &str, model: &str) -> String {
    template.replace(MODEL_PLACEHOLDER, &model.to_ascii_lowercase())
}

/// One request per model, in the given order.
#[must_use]
pub fn structure_requests(models: &[String], options: &ViewerOptions) -> Vec<StructureRequest> {
    models
        .iter()
        .map(|model| StructureRequest {
            url: structure_url(&options.url_template, model),
            format: options.format,
            assembly_id: options.assembly_id.clone(),
            is_binary: options.is_binary,
        })
        .collect()
}

// ── Binding ──────────────────────────────────────────────────────────────

/// Operations the pipeline needs from a viewer. Every call reports success
/// as a `bool`; `false` means the viewer is in a degraded state.
pub trait ViewerBinding {
    /// Replace the loaded structures.
    fn load_structures(&mut self, requests: &[StructureRequest]) -> bool;
    /// Install colored elements.
    fn register_elements(&mut self, elements: &[ColoredElement]) -> bool;
    /// Remove every installed element.
    fn clear_elements(&mut self) -> bool;
}

/// A viewer that only remembers what it was asked to show.
///
/// Used by the command-line report and handy as a stand-in wherever no
/// real viewer is attached.
#[derive(Debug, Clone, Default)]
pub struct RecordingViewer {
    structures: Vec<StructureRequest>,
    elements: Vec<ColoredElement>,
    calls: usize,
}

impl RecordingViewer {
    /// Structures from the last load.
    #[must_use]
    pub fn structures(&self) -> &[StructureRequest] {
        &self.structures
    }

    /// Currently registered elements.
    #[must_use]
    pub fn elements(&self) -> &[ColoredElement] {
        &self.elements
    }

    /// Number of binding calls received.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl ViewerBinding for RecordingViewer {
    fn load_structures(&mut self, requests: &[StructureRequest]) -> bool {
        self.calls += 1;
        self.structures = requests.to_vec();
        true
    }

    fn register_elements(&mut self, elements: &[ColoredElement]) -> bool {
        self.calls += 1;
        self.elements.extend_from_slice(elements);
        true
    }

    fn clear_elements(&mut self) -> bool {
        self.calls += 1;
        self.elements.clear();
        true
    }
}

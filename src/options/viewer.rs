use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::scale::{parse_hex, rgb_from_u32, Rgb, DEFAULT_GRAY};
use crate::viewer::{
    StructureFormat, DEFAULT_ASSEMBLY_ID, DEFAULT_URL_TEMPLATE,
};

/// How structures are fetched and uncolored residues drawn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[schemars(title = "Viewer", inline)]
#[serde(default)]
pub struct ViewerOptions {
    /// Structure URL with a `{model}` placeholder.
    #[schemars(title = "Structure URL Template")]
    pub url_template: String,
    /// Structure file format.
    #[schemars(title = "Format")]
    pub format: StructureFormat,
    /// Assembly to show.
    #[schemars(title = "Assembly")]
    pub assembly_id: String,
    /// Whether structure files are binary.
    #[schemars(title = "Binary")]
    pub is_binary: bool,
    /// Color for residues without data, `#rrggbb`.
    #[schemars(title = "Default Color")]
    pub default_color: String,
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_owned(),
            format: StructureFormat::default(),
            assembly_id: DEFAULT_ASSEMBLY_ID.to_owned(),
            is_binary: false,
            default_color: "#777777".to_owned(),
        }
    }
}

impl ViewerOptions {
    /// Parsed default color; gray when the configured text is not a hex
    /// color.
    #[must_use]
    pub fn default_rgb(&self) -> Rgb {
        parse_hex(&self.default_color).unwrap_or_else(|| {
            log::warn!(
                "invalid default color '{}', using #777777",
                self.default_color
            );
            rgb_from_u32(DEFAULT_GRAY)
        })
    }
}

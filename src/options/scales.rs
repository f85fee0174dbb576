use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::aggregate::ColumnKey;
use crate::scale::ScaleConfig;

/// Scale settings for one column key.
///
/// ```toml
/// [[scales]]
/// column = "max_mut_escape"
/// condition = "REGN10987"
/// scale_type = "diverging"
/// scheme = "PuOr"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScaleOverride {
    /// Metric column.
    pub column: String,
    /// Condition, if the override is condition-specific.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Scale for that key.
    #[serde(flatten)]
    pub scale: ScaleConfig,
}

impl ScaleOverride {
    /// The key this override applies to.
    #[must_use]
    pub fn key(&self) -> ColumnKey {
        ColumnKey {
            column: self.column.clone(),
            condition: self.condition.clone(),
        }
    }
}

/// Side table of scale configs keyed by column key. Later overrides for
/// the same key win.
#[must_use]
pub fn scale_table(overrides: &[ScaleOverride]) -> FxHashMap<ColumnKey, ScaleConfig> {
    overrides
        .iter()
        .map(|o| (o.key(), o.scale.clone()))
        .collect()
}

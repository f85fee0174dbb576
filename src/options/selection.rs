use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::aggregate::{column_keys, ColumnKey};

/// Which metric columns and conditions to overlay.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[schemars(title = "Selection", inline)]
#[serde(default)]
pub struct SelectionOptions {
    /// Metric columns.
    #[schemars(title = "Columns")]
    pub columns: Vec<String>,
    /// Conditions; every column is shown once per condition.
    #[schemars(title = "Conditions")]
    pub conditions: Vec<String>,
}

impl SelectionOptions {
    /// Column keys for the selection (columns × conditions).
    #[must_use]
    pub fn keys(&self) -> Vec<ColumnKey> {
        column_keys(&self.columns, &self.conditions)
    }
}

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ingest::Delimiters;

/// How uploaded CSV files are read and checked.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, JsonSchema,
)]
#[schemars(title = "Data", inline)]
#[serde(default)]
pub struct DataOptions {
    /// Delimiters for multi-model/multi-chain cells.
    #[schemars(title = "Delimiters")]
    pub delimiters: Delimiters,
    /// Columns required on top of `residue`, `chain` and `model`.
    #[schemars(title = "Extra Required Columns")]
    pub extra_required: Vec<String>,
}

impl DataOptions {
    /// Extra required columns as string slices, for the validator.
    #[must_use]
    pub fn extra_columns(&self) -> Vec<&str> {
        self.extra_required.iter().map(String::as_str).collect()
    }
}

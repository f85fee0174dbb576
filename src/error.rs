//! Crate-level error types.

use std::fmt;

/// Errors produced by the residue data pipeline.
///
/// Every variant carries enough context to fix the source CSV without
/// guesswork. Warnings (category overflow, unknown scale type) are not
/// errors; see [`ScaleWarning`](crate::scale::ScaleWarning).
#[derive(Debug)]
pub enum OverlayError {
    /// The CSV text is not well-formed.
    Parse(String),
    /// The CSV has a header but no data rows.
    EmptyData,
    /// A required or user-requested column is absent from the header.
    MissingColumn(String),
    /// A `model|chain|residue` identity repeats and there is no
    /// `condition` column to tell the rows apart.
    AmbiguousRow(String),
    /// A `model|condition|residue|chain` slot repeats and there is no
    /// `mutant` column to tell the rows apart.
    AmbiguousMutation(String),
    /// A row's `model` and `chain` fields split into different numbers of
    /// groups, so they cannot be paired index by index.
    MisalignedGroups {
        /// Where the mismatch was found: `row N` (1-based data row) during
        /// validation, `entry residue_chain_model` when building elements.
        at: String,
        /// Number of model groups.
        models: usize,
        /// Number of chain groups.
        chains: usize,
    },
    /// A column selection is malformed (empty column, empty condition, no
    /// selections at all).
    InvalidColumnConfig(String),
    /// No rows match the requested condition.
    NoData {
        /// Requested metric column.
        column: String,
        /// Requested condition, if any.
        condition: Option<String>,
    },
    /// More than one distinct value exists for a single residue key.
    Conflict {
        /// `residue_chain_model` key of the conflicting residue.
        key: String,
        /// Metric column being aggregated.
        column: String,
        /// Every distinct value found, in first-seen order.
        values: Vec<String>,
    },
    /// An element was requested without a name or without entries.
    MissingArgument(String),
    /// Element building was asked to work on an empty residue data map.
    EmptyResidueData,
    /// Generic I/O failure.
    Io(std::io::Error),
    /// TOML options parsing/serialization failure.
    OptionsParse(String),
    /// An error raised while processing one column key.
    Context {
        /// The `column[-condition]` key being processed.
        key: String,
        /// The underlying failure.
        source: Box<OverlayError>,
    },
}

impl OverlayError {
    /// Wrap this error with the column key that was being processed.
    #[must_use]
    pub fn with_key(self, key: impl Into<String>) -> Self {
        Self::Context {
            key: key.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through [`OverlayError::Context`].
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether this error belongs to the input validation family.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self.root(),
            Self::EmptyData
                | Self::MissingColumn(_)
                | Self::AmbiguousRow(_)
                | Self::AmbiguousMutation(_)
                | Self::MisalignedGroups { .. }
                | Self::InvalidColumnConfig(_)
        )
    }

    /// Whether this error belongs to the aggregation family.
    #[must_use]
    pub fn is_aggregation(&self) -> bool {
        matches!(self.root(), Self::NoData { .. } | Self::Conflict { .. })
    }
}

impl fmt::Display for OverlayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "failed to parse CSV: {msg}"),
            Self::EmptyData => write!(f, "CSV data is empty"),
            Self::MissingColumn(col) => {
                write!(f, "missing required column: {col}")
            }
            Self::AmbiguousRow(key) => write!(
                f,
                "duplicate model-chain-residue detected without a \
                 'condition' column: {key}"
            ),
            Self::AmbiguousMutation(key) => write!(
                f,
                "multiple entries detected for model-condition-residue-chain \
                 ({key}), but 'mutant' column is missing"
            ),
            Self::MisalignedGroups {
                at,
                models,
                chains,
            } => write!(
                f,
                "{at}: {models} model group(s) but {chains} chain \
                 group(s)"
            ),
            Self::InvalidColumnConfig(msg) => {
                write!(f, "invalid column selection: {msg}")
            }
            Self::NoData { column, condition } => match condition {
                Some(cond) => write!(
                    f,
                    "no data found for column '{column}' with condition \
                     '{cond}'"
                ),
                None => write!(f, "no data found for column '{column}'"),
            },
            Self::Conflict {
                key,
                column,
                values,
            } => write!(
                f,
                "conflict detected for residue-chain-model ({key}): multiple \
                 values for column '{column}': {}",
                values.join(", ")
            ),
            Self::MissingArgument(what) => {
                write!(f, "missing argument: {what}")
            }
            Self::EmptyResidueData => write!(f, "residue data is empty"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::OptionsParse(msg) => {
                write!(f, "options parse error: {msg}")
            }
            Self::Context { key, source } => {
                write!(f, "error processing {key}: {source}")
            }
        }
    }
}

impl std::error::Error for OverlayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Context { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for OverlayError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<csv::Error> for OverlayError {
    fn from(e: csv::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_message_lists_every_value() {
        let err = OverlayError::Conflict {
            key: "10_A_6XR8".to_owned(),
            column: "escape".to_owned(),
            values: vec!["0.5".to_owned(), "0.9".to_owned()],
        };
        let msg = err.to_string();
        assert!(msg.contains("10_A_6XR8"));
        assert!(msg.contains("0.5, 0.9"));
    }

    #[test]
    fn context_keeps_classification() {
        let err = OverlayError::NoData {
            column: "escape".to_owned(),
            condition: Some("REGN10987".to_owned()),
        }
        .with_key("escape-REGN10987");
        assert!(err.is_aggregation());
        assert!(!err.is_validation());
        assert!(err.to_string().starts_with("error processing escape-REGN10987"));
        assert!(matches!(err.root(), OverlayError::NoData { .. }));
    }

    #[test]
    fn validation_family() {
        assert!(OverlayError::MissingColumn("chain".to_owned()).is_validation());
        assert!(OverlayError::EmptyData.is_validation());
        assert!(!OverlayError::EmptyResidueData.is_validation());
    }
}

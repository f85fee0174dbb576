//! Numeric vs. categorical classification of a column's values.

use serde::{Deserialize, Serialize};

use crate::ingest::CellValue;

/// Above this many categories a categorical palette will visibly repeat.
pub const MAX_DISTINCT_CATEGORIES: usize = 10;

/// Kind of data held by a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Every value is a finite number.
    Numeric,
    /// At least one value is not a number.
    Categorical,
}

/// Result of [`detect_column_type`].
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnTypeInfo {
    /// Detected kind.
    pub kind: ColumnKind,
    /// Distinct non-null values, first-seen order.
    pub unique_values: Vec<CellValue>,
    /// Min/max when numeric and non-empty.
    pub range: Option<(f64, f64)>,
    /// Usability note, e.g. too many categories for distinct colors.
    pub warning: Option<String>,
}

/// Classify `values`, ignoring nulls.
///
/// A column with no values at all counts as numeric.
pub fn detect_column_type<'a, I>(values: I) -> ColumnTypeInfo
where
    I: IntoIterator<Item = Option<&'a CellValue>>,
{
    let mut unique_values: Vec<CellValue> = Vec::new();
    let mut numeric = true;
    let mut range: Option<(f64, f64)> = None;

    for value in values.into_iter().flatten() {
        match value.as_f64() {
            Some(n) => {
                range = Some(range.map_or((n, n), |(lo, hi)| (lo.min(n), hi.max(n))));
            }
            None => numeric = false,
        }
        if !unique_values.contains(value) {
            unique_values.push(value.clone());
        }
    }

    let kind = if numeric {
        ColumnKind::Numeric
    } else {
        ColumnKind::Categorical
    };
    let warning = (kind == ColumnKind::Categorical
        && unique_values.len() > MAX_DISTINCT_CATEGORIES)
        .then(|| {
            format!(
                "{} unique categories; colors may repeat",
                unique_values.len()
            )
        });

    ColumnTypeInfo {
        kind,
        unique_values,
        range: if numeric { range } else { None },
        warning,
    }
}

//! Structural validation of uploaded rows.
//!
//! Aggregation assumes one value per (residue, chain, model) key; these
//! checks turn violations of that assumption into explicit errors instead
//! of a silent last-value-wins.

use rustc_hash::FxHashSet;

use crate::aggregate::ColumnKey;
use crate::error::OverlayError;
use crate::ingest::{columns, CellValue, RowSet};

fn key_part(value: Option<&CellValue>) -> String {
    value.map(CellValue::key).unwrap_or_default()
}

/// Validate a parsed table.
///
/// Rules, checked in order:
/// 1. there is at least one data row;
/// 2. every name in `required` and `extra` is a header;
/// 3. a repeated `model|chain|residue` needs a `condition` column;
/// 4. a repeated `model|condition|residue|chain` needs a `mutant` column;
/// 5. each row's model groups line up with its chain groups.
///
/// # Errors
///
/// The first rule violated, as the matching [`OverlayError`] variant.
pub fn validate(
    rows: &RowSet,
    required: &[&str],
    extra: &[&str],
) -> Result<(), OverlayError> {
    if rows.is_empty() {
        return Err(OverlayError::EmptyData);
    }

    for col in required.iter().chain(extra) {
        if !rows.has_column(col) {
            return Err(OverlayError::MissingColumn((*col).to_owned()));
        }
    }

    let has_condition = rows.has_column(columns::CONDITION);
    let has_mutant = rows.has_column(columns::MUTANT);

    let mut seen = FxHashSet::default();
    for row in rows.rows() {
        let key = format!(
            "{}|{}|{}",
            key_part(rows.cell(row, columns::MODEL)),
            key_part(rows.cell(row, columns::CHAIN)),
            key_part(rows.cell(row, columns::RESIDUE)),
        );
        if !seen.insert(key.clone()) && !has_condition {
            return Err(OverlayError::AmbiguousRow(key));
        }
    }

    let mut seen = FxHashSet::default();
    for row in rows.rows() {
        let key = format!(
            "{}|{}|{}|{}",
            key_part(rows.cell(row, columns::MODEL)),
            key_part(rows.cell(row, columns::CONDITION)),
            key_part(rows.cell(row, columns::RESIDUE)),
            key_part(rows.cell(row, columns::CHAIN)),
        );
        if !seen.insert(key.clone()) && !has_mutant {
            return Err(OverlayError::AmbiguousMutation(key));
        }
    }

    for (i, row) in rows.rows().iter().enumerate() {
        if let (Some(models), Some(chains)) =
            (&row.parsed_models, &row.parsed_chains)
        {
            if models.group_count() != chains.group_count() {
                return Err(OverlayError::MisalignedGroups {
                    at: format!("row {}", i + 1),
                    models: models.group_count(),
                    chains: chains.group_count(),
                });
            }
        }
    }

    Ok(())
}

/// Validate with the standard `residue`, `chain`, `model` requirement.
///
/// # Errors
///
/// See [`validate`].
pub fn validate_default(rows: &RowSet) -> Result<(), OverlayError> {
    validate(rows, &columns::REQUIRED, &[])
}

/// Check a set of column selections against a table before aggregating.
///
/// # Errors
///
/// [`OverlayError::InvalidColumnConfig`] for an empty selection or blank
/// names, [`OverlayError::MissingColumn`] for a column not in the header.
pub fn validate_column_configs(
    rows: &RowSet,
    configs: &[ColumnKey],
) -> Result<(), OverlayError> {
    if rows.is_empty() {
        return Err(OverlayError::EmptyData);
    }
    if configs.is_empty() {
        return Err(OverlayError::InvalidColumnConfig(
            "at least one column must be selected".to_owned(),
        ));
    }
    for config in configs {
        if config.column.trim().is_empty() {
            return Err(OverlayError::InvalidColumnConfig(
                "column name must be a non-empty string".to_owned(),
            ));
        }
        if config
            .condition
            .as_deref()
            .is_some_and(|c| c.trim().is_empty())
        {
            return Err(OverlayError::InvalidColumnConfig(format!(
                "condition for column '{}' must be non-empty if provided",
                config.column
            )));
        }
        if !rows.has_column(&config.column) {
            return Err(OverlayError::MissingColumn(config.column.clone()));
        }
    }
    Ok(())
}

//! Residue aggregation: rows → one value per (residue, chain, model).
//!
//! For each requested [`ColumnKey`] the rows are filtered by condition,
//! rows without complete structural info (or without a value) are dropped,
//! and the rest are grouped by [`ResidueKey`]. A key that carries more than
//! one distinct value is a hard [`OverlayError::Conflict`]; there is no
//! automatic resolution. Output keeps the first-seen order of keys.

use std::fmt;

use rustc_hash::{FxHashMap, FxHashSet};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::column_type::{detect_column_type, ColumnKind};
use crate::error::OverlayError;
use crate::ingest::{columns, CellValue, DelimitedId, RawRow, RowSet};
use crate::validate::validate_column_configs;

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// A requested metric view: a column, optionally restricted to one
/// condition. This is the canonical key for residue data, scale configs and
/// colored elements.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    JsonSchema,
)]
pub struct ColumnKey {
    /// Metric column name.
    pub column: String,
    /// Condition filter, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl ColumnKey {
    /// Key for a whole column.
    #[must_use]
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            condition: None,
        }
    }

    /// Key for a column restricted to one condition.
    #[must_use]
    pub fn with_condition(
        column: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            condition: Some(condition.into()),
        }
    }

    /// Parse the `column[-condition]` form produced by `Display`. The
    /// first `-` separates the column from the condition.
    #[must_use]
    pub fn parse_name(name: &str) -> Self {
        match name.split_once('-') {
            Some((column, condition)) if !condition.is_empty() => {
                Self::with_condition(column, condition)
            }
            _ => Self::new(name.trim_end_matches('-')),
        }
    }

    /// Human-readable label: `column` or `column for condition`.
    #[must_use]
    pub fn label(&self) -> String {
        match &self.condition {
            Some(condition) => format!("{} for {condition}", self.column),
            None => self.column.clone(),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.condition {
            Some(condition) => write!(f, "{}-{condition}", self.column),
            None => f.write_str(&self.column),
        }
    }
}

/// Cross product of selected columns and conditions. With no conditions
/// each column is requested on its own.
#[must_use]
pub fn column_keys(columns: &[String], conditions: &[String]) -> Vec<ColumnKey> {
    if conditions.is_empty() {
        return columns.iter().map(ColumnKey::new).collect();
    }
    columns
        .iter()
        .flat_map(|column| {
            conditions
                .iter()
                .map(move |condition| ColumnKey::with_condition(column, condition))
        })
        .collect()
}

/// The unit of aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResidueKey {
    /// Residue number in canonical text form.
    pub residue: String,
    /// Raw (possibly delimited) chain field.
    pub chain: String,
    /// Raw (possibly delimited) model field.
    pub model: String,
}

impl fmt::Display for ResidueKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.residue, self.chain, self.model)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One aggregated value for one residue key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedEntry {
    /// Residue number as it appeared in the CSV.
    pub residue: CellValue,
    /// Raw chain field; may encode several chains.
    pub chain: String,
    /// Raw model field; may encode several models.
    pub model: String,
    /// The single authoritative value.
    pub value: CellValue,
}

/// Diagnostics gathered while aggregating one column key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateStats {
    /// Rows left after condition filtering.
    pub total: usize,
    /// Rows with complete structural info and a value.
    pub valid: usize,
    /// Rows dropped for a missing residue, chain or model.
    pub missing_structure: usize,
    /// Rows dropped for a missing value in the aggregated column.
    pub missing_value: usize,
    /// Distinct models covered, first-seen order.
    pub models: Vec<String>,
    /// Distinct chains covered, first-seen order.
    pub chains: Vec<String>,
    /// Number of distinct residue positions.
    pub residues: usize,
    /// Inferred kind of the aggregated column.
    pub kind: Option<ColumnKind>,
    /// Numeric min/max of the valid values, when numeric.
    pub range: Option<(f64, f64)>,
}

impl AggregateStats {
    fn log_summary(&self, key: &ColumnKey) {
        let pct = |n: usize| {
            if self.total == 0 {
                0.0
            } else {
                n as f64 / self.total as f64 * 100.0
            }
        };
        log::info!(
            "data summary for '{key}': {} of {} entries have structural \
             information ({:.1}%); {} model(s) [{}]; {} chain(s) [{}]; {} \
             unique residue position(s)",
            self.valid,
            self.total,
            pct(self.valid),
            self.models.len(),
            self.models.join(", "),
            self.chains.len(),
            self.chains.join(", "),
            self.residues,
        );
        if let Some((min, max)) = self.range {
            log::info!("value range for '{key}': {min} to {max}");
        }
        if self.missing_structure > 0 {
            log::warn!(
                "{} entries ({:.1}%) for '{key}' are missing structural \
                 information and will not be displayed on the structure",
                self.missing_structure,
                pct(self.missing_structure),
            );
        }
        if self.missing_value > 0 {
            log::warn!(
                "{} entries for '{key}' have no value and were skipped",
                self.missing_value
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

fn present(value: Option<&CellValue>) -> Option<&CellValue> {
    value.filter(|v| !v.is_blank())
}

fn push_unique(list: &mut Vec<String>, seen: &mut FxHashSet<String>, item: &str) {
    if !seen.contains(item) {
        let _ = seen.insert(item.to_owned());
        list.push(item.to_owned());
    }
}

fn matches_condition(rows: &RowSet, row: &RawRow, condition: Option<&str>) -> bool {
    condition.is_none_or(|wanted| {
        rows.cell(row, columns::CONDITION)
            .is_some_and(|c| c.key() == wanted)
    })
}

/// Aggregate one column (optionally for one condition) down to one entry
/// per residue key.
///
/// # Errors
///
/// [`OverlayError::NoData`] when no row matches `condition` and
/// [`OverlayError::Conflict`] when one residue key carries several values.
pub fn aggregate(
    rows: &RowSet,
    column: &str,
    condition: Option<&str>,
) -> Result<Vec<ProcessedEntry>, OverlayError> {
    aggregate_with_stats(rows, column, condition).map(|(entries, _)| entries)
}

/// [`aggregate`], also returning the diagnostics it logged.
///
/// # Errors
///
/// See [`aggregate`].
pub fn aggregate_with_stats(
    rows: &RowSet,
    column: &str,
    condition: Option<&str>,
) -> Result<(Vec<ProcessedEntry>, AggregateStats), OverlayError> {
    let key = ColumnKey {
        column: column.to_owned(),
        condition: condition.map(str::to_owned),
    };

    let filtered: Vec<&RawRow> = rows
        .rows()
        .iter()
        .filter(|row| matches_condition(rows, row, condition))
        .collect();
    if filtered.is_empty() {
        return Err(OverlayError::NoData {
            column: key.column,
            condition: key.condition,
        });
    }

    let value_idx = rows.column_index(column);
    let type_info = detect_column_type(
        filtered
            .iter()
            .map(|row| value_idx.and_then(|i| row.get(i))),
    );
    if let Some(warning) = &type_info.warning {
        log::warn!("column '{column}': {warning}");
    }

    let mut stats = AggregateStats {
        total: filtered.len(),
        kind: Some(type_info.kind),
        ..AggregateStats::default()
    };
    let mut seen_models = FxHashSet::default();
    let mut seen_chains = FxHashSet::default();
    let mut seen_residues = FxHashSet::default();

    // Insertion-ordered groups: index into `groups` by residue key.
    let mut index: FxHashMap<ResidueKey, usize> = FxHashMap::default();
    let mut groups: Vec<(ResidueKey, CellValue, Vec<CellValue>)> = Vec::new();

    for row in filtered {
        let residue = present(rows.cell(row, columns::RESIDUE));
        let chain = present(rows.cell(row, columns::CHAIN));
        let model = present(rows.cell(row, columns::MODEL));
        let (Some(residue), Some(chain), Some(model)) = (residue, chain, model)
        else {
            stats.missing_structure += 1;
            continue;
        };
        let Some(value) = value_idx.and_then(|i| row.get(i)) else {
            stats.missing_value += 1;
            continue;
        };
        stats.valid += 1;

        for m in row.parsed_models.iter().flat_map(DelimitedId::items) {
            push_unique(&mut stats.models, &mut seen_models, m);
        }
        for c in row.parsed_chains.iter().flat_map(DelimitedId::items) {
            push_unique(&mut stats.chains, &mut seen_chains, c);
        }
        if seen_residues.insert(residue.key()) {
            stats.residues += 1;
        }
        if type_info.kind == ColumnKind::Numeric {
            if let Some(n) = value.as_f64() {
                stats.range = Some(match stats.range {
                    Some((lo, hi)) => (lo.min(n), hi.max(n)),
                    None => (n, n),
                });
            }
        }

        let residue_key = ResidueKey {
            residue: residue.key(),
            chain: chain.key(),
            model: model.key(),
        };
        match index.get(&residue_key) {
            Some(&i) => {
                let values = &mut groups[i].2;
                if !values.contains(value) {
                    values.push(value.clone());
                }
            }
            None => {
                let _ = index.insert(residue_key.clone(), groups.len());
                groups.push((residue_key, residue.clone(), vec![value.clone()]));
            }
        }
    }

    stats.log_summary(&key);

    let mut entries = Vec::with_capacity(groups.len());
    for (residue_key, residue, mut values) in groups {
        if values.len() > 1 {
            return Err(OverlayError::Conflict {
                key: residue_key.to_string(),
                column: column.to_owned(),
                values: values.iter().map(CellValue::key).collect(),
            });
        }
        let Some(value) = values.pop() else {
            continue;
        };
        entries.push(ProcessedEntry {
            residue,
            chain: residue_key.chain,
            model: residue_key.model,
            value,
        });
    }

    Ok((entries, stats))
}

// ---------------------------------------------------------------------------
// Residue data map
// ---------------------------------------------------------------------------

/// Aggregated entries per column key, in request order.
///
/// Built fresh for every recomputation and never edited afterwards.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResidueDataMap {
    entries: Vec<(ColumnKey, Vec<ProcessedEntry>)>,
}

impl ResidueDataMap {
    /// Entries for one key.
    #[must_use]
    pub fn get(&self, key: &ColumnKey) -> Option<&[ProcessedEntry]> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_slice())
    }

    /// Keys in request order.
    pub fn keys(&self) -> impl Iterator<Item = &ColumnKey> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// `(key, entries)` pairs in request order.
    pub fn iter(&self) -> impl Iterator<Item = (&ColumnKey, &[ProcessedEntry])> {
        self.entries.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(ColumnKey, Vec<ProcessedEntry>)> for ResidueDataMap {
    fn from_iter<I: IntoIterator<Item = (ColumnKey, Vec<ProcessedEntry>)>>(
        iter: I,
    ) -> Self {
        let mut map = Self::default();
        for (key, entries) in iter {
            match map.entries.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = entries,
                None => map.entries.push((key, entries)),
            }
        }
        map
    }
}

/// Validate the selections and aggregate every one of them.
///
/// The first failing key aborts the whole run; its error is wrapped with
/// the key so the user knows which selection broke.
///
/// # Errors
///
/// Any [`validate_column_configs`] error, or the first aggregation error
/// wrapped in [`OverlayError::Context`].
pub fn process_residue_data(
    rows: &RowSet,
    configs: &[ColumnKey],
) -> Result<ResidueDataMap, OverlayError> {
    validate_column_configs(rows, configs)?;

    configs
        .iter()
        .map(|key| {
            aggregate(rows, &key.column, key.condition.as_deref())
                .map(|entries| (key.clone(), entries))
                .map_err(|e| e.with_key(key.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> RowSet {
        RowSet::parse(text).unwrap()
    }

    #[test]
    fn end_to_end_entries() {
        let rows = parse(
            "residue,chain,model,max_mut_escape\n\
             10,A,6XR8,0.5\n\
             11,A,6XR8,0.9\n",
        );
        let entries = aggregate(&rows, "max_mut_escape", None).unwrap();
        assert_eq!(
            entries,
            vec![
                ProcessedEntry {
                    residue: CellValue::Number(10.0),
                    chain: "A".to_owned(),
                    model: "6XR8".to_owned(),
                    value: CellValue::Number(0.5),
                },
                ProcessedEntry {
                    residue: CellValue::Number(11.0),
                    chain: "A".to_owned(),
                    model: "6XR8".to_owned(),
                    value: CellValue::Number(0.9),
                },
            ]
        );
    }

    #[test]
    fn conflicting_values_fail() {
        let rows = parse(
            "residue,chain,model,escape\n\
             10,A,6XR8,0.5\n\
             10,A,6XR8,0.7\n",
        );
        let err = aggregate(&rows, "escape", None).unwrap_err();
        assert!(matches!(
            err,
            OverlayError::Conflict { ref key, ref values, .. }
                if key == "10_A_6XR8" && values == &["0.5", "0.7"]
        ));
    }

    #[test]
    fn identical_values_collapse() {
        let rows = parse(
            "residue,chain,model,mutant,escape\n\
             10,A,6XR8,K,0.5\n\
             10,A,6XR8,E,0.5\n",
        );
        let entries = aggregate(&rows, "escape", None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, CellValue::Number(0.5));
    }

    #[test]
    fn output_keeps_first_seen_order() {
        let rows = parse(
            "residue,chain,model,condition,escape\n\
             30,A,6XR8,x,0.3\n\
             10,A,6XR8,x,0.1\n\
             30,A,6XR8,y,0.3\n\
             20,A,6XR8,x,0.2\n",
        );
        let entries = aggregate(&rows, "escape", None).unwrap();
        let residues: Vec<String> =
            entries.iter().map(|e| e.residue.key()).collect();
        assert_eq!(residues, vec!["30", "10", "20"]);
    }

    #[test]
    fn condition_filter() {
        let rows = parse(
            "residue,chain,model,condition,escape\n\
             10,A,6XR8,REGN10987,0.5\n\
             10,A,6XR8,LY-CoV016,0.1\n",
        );
        let entries = aggregate(&rows, "escape", Some("LY-CoV016")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].value, CellValue::Number(0.1));

        let err = aggregate(&rows, "escape", Some("S309")).unwrap_err();
        assert!(matches!(
            err,
            OverlayError::NoData { condition: Some(ref c), .. } if c == "S309"
        ));
    }

    #[test]
    fn rows_without_structure_are_dropped() {
        let rows = parse(
            "residue,chain,model,escape\n\
             10,A,6XR8,0.5\n\
             11,,6XR8,0.6\n\
             ,A,6XR8,0.7\n",
        );
        let (entries, stats) =
            aggregate_with_stats(&rows, "escape", None).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.valid, 1);
        assert_eq!(stats.missing_structure, 2);
        assert_eq!(stats.range, Some((0.5, 0.5)));
    }

    #[test]
    fn all_null_column_is_empty_not_an_error() {
        let rows = parse(
            "residue,chain,model,condition,escape,other\n\
             10,A,6XR8,x,,1\n\
             11,A,6XR8,x,,2\n",
        );
        let (entries, stats) =
            aggregate_with_stats(&rows, "escape", Some("x")).unwrap();
        assert!(entries.is_empty());
        assert_eq!(stats.missing_value, 2);
    }

    #[test]
    fn stats_cover_delimited_models_and_chains() {
        let rows = parse(
            "residue,chain,model,escape\n\
             10,A;B:C,6XR8:6XRA,0.5\n\
             11,A,6XR8,0.6\n",
        );
        let (_, stats) = aggregate_with_stats(&rows, "escape", None).unwrap();
        assert_eq!(stats.models, vec!["6XR8", "6XRA"]);
        assert_eq!(stats.chains, vec!["A", "B", "C"]);
        assert_eq!(stats.residues, 2);
        assert_eq!(stats.kind, Some(ColumnKind::Numeric));
    }

    #[test]
    fn numeric_looking_model_ids_survive() {
        let rows = parse(
            "residue,chain,model,escape\n\
             10,A,1E10,0.5\n",
        );
        let (entries, stats) = aggregate_with_stats(&rows, "escape", None).unwrap();
        assert_eq!(entries[0].model, "1E10");
        assert_eq!(stats.models, vec!["1E10"]);
        assert_eq!(
            crate::viewer::structure_url(crate::viewer::DEFAULT_URL_TEMPLATE, &entries[0].model),
            "https://www.ebi.ac.uk/pdbe/static/entry/1e10_updated.cif"
        );
    }

    #[test]
    fn column_key_display_and_parse() {
        let key = ColumnKey::with_condition("max_mut_escape", "REGN10987");
        assert_eq!(key.to_string(), "max_mut_escape-REGN10987");
        assert_eq!(ColumnKey::parse_name("max_mut_escape-REGN10987"), key);
        assert_eq!(key.label(), "max_mut_escape for REGN10987");
        assert_eq!(
            ColumnKey::parse_name("max_mut_escape"),
            ColumnKey::new("max_mut_escape")
        );
    }

    #[test]
    fn column_keys_cross_product() {
        let cols = vec!["a".to_owned(), "b".to_owned()];
        let conds = vec!["x".to_owned(), "y".to_owned()];
        let keys = column_keys(&cols, &conds);
        assert_eq!(keys.len(), 4);
        assert_eq!(keys[1], ColumnKey::with_condition("a", "y"));
        assert_eq!(column_keys(&cols, &[]), vec![ColumnKey::new("a"), ColumnKey::new("b")]);
    }

    #[test]
    fn process_wraps_errors_with_key() {
        let rows = parse(
            "residue,chain,model,condition,escape\n\
             10,A,6XR8,x,0.5\n",
        );
        let keys = vec![
            ColumnKey::with_condition("escape", "x"),
            ColumnKey::with_condition("escape", "y"),
        ];
        let err = process_residue_data(&rows, &keys).unwrap_err();
        assert!(err.to_string().starts_with("error processing escape-y"));
        assert!(err.is_aggregation());

        let map = process_residue_data(&rows, &keys[..1]).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&keys[0]).map(<[_]>::len), Some(1));
    }
}

//! CSV ingestion: raw text → typed rows with parsed model/chain groups.
//!
//! The header is kept once on the [`RowSet`]; each [`RawRow`] stores its
//! cells in header order. Cells are typed on the way in (numbers, text,
//! `None` for blanks) and the `model`/`chain` fields are additionally split
//! into [`DelimitedId`]s so downstream stages never re-parse them.

mod cell;
mod delimited;

pub use cell::CellValue;
pub use delimited::{DelimitedId, Delimiters};
use rustc_hash::FxHashSet;

use crate::error::OverlayError;

/// Well-known column names.
pub mod columns {
    /// Author residue number.
    pub const RESIDUE: &str = "residue";
    /// Chain identifier(s), possibly delimited.
    pub const CHAIN: &str = "chain";
    /// Model identifier(s), possibly delimited.
    pub const MODEL: &str = "model";
    /// Optional experimental condition (e.g. antibody name).
    pub const CONDITION: &str = "condition";
    /// Optional mutant discriminator.
    pub const MUTANT: &str = "mutant";

    /// Columns every upload must carry.
    pub const REQUIRED: [&str; 3] = [RESIDUE, CHAIN, MODEL];
    /// Identifier columns, kept as text even when they look numeric.
    pub const IDENTIFIERS: [&str; 2] = [CHAIN, MODEL];
    /// Columns that never hold metric values.
    pub const RESERVED: [&str; 5] = [RESIDUE, CHAIN, MODEL, CONDITION, MUTANT];
}

/// One CSV data line.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRow {
    values: Vec<Option<CellValue>>,
    /// `model` split into groups, when the row has a model.
    pub parsed_models: Option<DelimitedId>,
    /// `chain` split into groups, when the row has a chain.
    pub parsed_chains: Option<DelimitedId>,
}

impl RawRow {
    fn split_ids(
        &mut self,
        model_idx: Option<usize>,
        chain_idx: Option<usize>,
        delimiters: Delimiters,
    ) {
        let split = |idx: Option<usize>| {
            idx.and_then(|i| self.get(i))
                .map(|v| DelimitedId::parse(&v.key(), delimiters))
        };
        let models = split(model_idx);
        let chains = split(chain_idx);
        self.parsed_models = models;
        self.parsed_chains = chains;
    }

    /// Cell at a header index. Out-of-range and blank cells are `None`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&CellValue> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// All cells in header order.
    #[must_use]
    pub fn values(&self) -> &[Option<CellValue>] {
        &self.values
    }
}

/// A parsed CSV table: header plus typed rows.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowSet {
    headers: Vec<String>,
    rows: Vec<RawRow>,
    delimiters: Delimiters,
}

impl RowSet {
    /// Parse CSV text using the default `:` / `;` delimiters.
    ///
    /// # Errors
    ///
    /// [`OverlayError::Parse`] when the text is not well-formed CSV.
    pub fn parse(csv_text: &str) -> Result<Self, OverlayError> {
        Self::parse_with(csv_text, Delimiters::default())
    }

    /// Parse CSV text. The first line is the header; rows must all have the
    /// header's width.
    ///
    /// # Errors
    ///
    /// [`OverlayError::Parse`] on unterminated quotes, ragged rows or
    /// invalid UTF-8.
    pub fn parse_with(
        csv_text: &str,
        delimiters: Delimiters,
    ) -> Result<Self, OverlayError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(csv_text.as_bytes());

        let headers: Vec<String> =
            reader.headers()?.iter().map(str::to_owned).collect();
        let identifier: Vec<bool> = headers
            .iter()
            .map(|h| columns::IDENTIFIERS.contains(&h.as_str()))
            .collect();
        let model_idx = headers.iter().position(|h| h == columns::MODEL);
        let chain_idx = headers.iter().position(|h| h == columns::CHAIN);

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let values: Vec<Option<CellValue>> = record
                .iter()
                .zip(&identifier)
                .map(|(raw, &is_id)| {
                    if is_id {
                        CellValue::text(raw)
                    } else {
                        CellValue::infer(raw)
                    }
                })
                .collect();
            let mut row = RawRow {
                values,
                ..RawRow::default()
            };
            row.split_ids(model_idx, chain_idx, delimiters);
            rows.push(row);
        }

        log::debug!(
            "parsed {} row(s) with columns [{}]",
            rows.len(),
            headers.join(", ")
        );

        Ok(Self {
            headers,
            rows,
            delimiters,
        })
    }

    /// Re-split the `model`/`chain` fields with other delimiters. Cells are
    /// untouched.
    #[must_use]
    pub fn with_delimiters(mut self, delimiters: Delimiters) -> Self {
        if delimiters == self.delimiters {
            return self;
        }
        let model_idx = self.column_index(columns::MODEL);
        let chain_idx = self.column_index(columns::CHAIN);
        for row in &mut self.rows {
            row.split_ids(model_idx, chain_idx, delimiters);
        }
        self.delimiters = delimiters;
        self
    }

    /// Header names in file order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Data rows in file order.
    #[must_use]
    pub fn rows(&self) -> &[RawRow] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Delimiters the model/chain fields were split with.
    #[must_use]
    pub fn delimiters(&self) -> Delimiters {
        self.delimiters
    }

    /// Header index of a column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Whether the header contains `name`.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell of `row` in column `name`.
    #[must_use]
    pub fn cell<'a>(&self, row: &'a RawRow, name: &str) -> Option<&'a CellValue> {
        self.column_index(name).and_then(|i| row.get(i))
    }

    /// Distinct model identifiers, flattened from every row's model groups,
    /// in first-seen order.
    #[must_use]
    pub fn models(&self) -> Vec<String> {
        let mut seen = FxHashSet::default();
        let mut models = Vec::new();
        for model in self
            .rows
            .iter()
            .filter_map(|r| r.parsed_models.as_ref())
            .flat_map(DelimitedId::items)
        {
            if seen.insert(model) {
                models.push(model.to_owned());
            }
        }
        models
    }

    /// For each model, the chains annotated on it, pairing model group `i`
    /// with chain group `i`. Models and chains keep first-seen order.
    #[must_use]
    pub fn model_chain_map(&self) -> Vec<(String, Vec<String>)> {
        let mut mapping: Vec<(String, Vec<String>)> = Vec::new();
        for row in &self.rows {
            let (Some(models), Some(chains)) =
                (&row.parsed_models, &row.parsed_chains)
            else {
                continue;
            };
            let Some(pairs) = models.fan_out(chains) else {
                continue;
            };
            for (model, chain) in pairs {
                let pos = match mapping.iter().position(|(m, _)| m == model) {
                    Some(pos) => pos,
                    None => {
                        mapping.push((model.to_owned(), Vec::new()));
                        mapping.len() - 1
                    }
                };
                let model_chains = &mut mapping[pos].1;
                if !model_chains.iter().any(|c| c == chain) {
                    model_chains.push(chain.to_owned());
                }
            }
        }
        mapping
    }

    /// Distinct condition values in first-seen order. Empty when the table
    /// has no `condition` column.
    #[must_use]
    pub fn conditions(&self) -> Vec<String> {
        let Some(idx) = self.column_index(columns::CONDITION) else {
            return Vec::new();
        };
        let mut seen = FxHashSet::default();
        let mut conditions = Vec::new();
        for value in self.rows.iter().filter_map(|r| r.get(idx)) {
            let key = value.key();
            if seen.insert(key.clone()) {
                conditions.push(key);
            }
        }
        conditions
    }

    /// Whether rows carry a `mutant` discriminator column.
    #[must_use]
    pub fn has_mutations(&self) -> bool {
        self.has_column(columns::MUTANT)
    }

    /// User-defined metric columns: every header that is not a structural
    /// or disambiguating column.
    #[must_use]
    pub fn metric_columns(&self) -> Vec<String> {
        self.headers
            .iter()
            .filter(|h| !columns::RESERVED.contains(&h.as_str()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ESCAPE_CSV: &str = "\
residue,chain,model,condition,max_mut_escape
10,A,6XR8,REGN10987,0.5
11,A;B:C,6XR8:6XRA,REGN10987,0.9
12,B,6XRA,LY-CoV016,
";

    #[test]
    fn parses_header_and_typed_cells() {
        let rows = RowSet::parse(ESCAPE_CSV).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(
            rows.headers(),
            &["residue", "chain", "model", "condition", "max_mut_escape"]
        );
        let first = &rows.rows()[0];
        assert_eq!(rows.cell(first, "residue"), Some(&CellValue::Number(10.0)));
        assert_eq!(rows.cell(first, "model"), Some(&CellValue::from("6XR8")));
        assert_eq!(rows.cell(&rows.rows()[2], "max_mut_escape"), None);
    }

    #[test]
    fn splits_model_and_chain_fields() {
        let rows = RowSet::parse(ESCAPE_CSV).unwrap();
        let row = &rows.rows()[1];
        let models = row.parsed_models.as_ref().unwrap();
        let chains = row.parsed_chains.as_ref().unwrap();
        assert_eq!(models.group_count(), 2);
        assert_eq!(chains.groups(), &[vec!["A", "B"], vec!["C"]]);
    }

    #[test]
    fn store_getters() {
        let rows = RowSet::parse(ESCAPE_CSV).unwrap();
        assert_eq!(rows.models(), vec!["6XR8", "6XRA"]);
        assert_eq!(rows.conditions(), vec!["REGN10987", "LY-CoV016"]);
        assert!(!rows.has_mutations());
        assert_eq!(rows.metric_columns(), vec!["max_mut_escape"]);

        let map = rows.model_chain_map();
        assert_eq!(map[0].0, "6XR8");
        assert_eq!(map[0].1, vec!["A", "B"]);
        assert_eq!(map[1].0, "6XRA");
        assert_eq!(map[1].1, vec!["C", "B"]);
    }

    #[test]
    fn numeric_looking_ids_stay_text() {
        let rows = RowSet::parse("residue,chain,model,escape\n10,1,1E10,0.5\n").unwrap();
        let row = &rows.rows()[0];
        assert_eq!(rows.cell(row, "model"), Some(&CellValue::from("1E10")));
        assert_eq!(rows.cell(row, "chain"), Some(&CellValue::from("1")));
        assert_eq!(rows.cell(row, "residue"), Some(&CellValue::Number(10.0)));
        assert_eq!(rows.models(), vec!["1E10"]);
    }

    #[test]
    fn resplit_with_other_delimiters() {
        let rows = RowSet::parse("residue,chain,model\n10,A|B,6XR8|6XRA\n").unwrap();
        assert_eq!(rows.models(), vec!["6XR8|6XRA"]);
        let rows = rows.with_delimiters(Delimiters {
            primary: '|',
            secondary: ';',
        });
        assert_eq!(rows.models(), vec!["6XR8", "6XRA"]);
        assert_eq!(rows.delimiters().primary, '|');
        assert_eq!(rows.rows()[0].parsed_chains.as_ref().map(DelimitedId::group_count), Some(2));
    }

    #[test]
    fn ragged_rows_are_a_parse_error() {
        let err = RowSet::parse("residue,chain,model\n1,A\n").unwrap_err();
        assert!(matches!(err, OverlayError::Parse(_)));
    }

    #[test]
    fn quoted_fields_keep_delimiters() {
        let rows =
            RowSet::parse("residue,chain,model,note\n1,A,6XR8,\"a, b\"\n")
                .unwrap();
        assert_eq!(
            rows.cell(&rows.rows()[0], "note"),
            Some(&CellValue::from("a, b"))
        );
    }

    #[test]
    fn header_only_has_no_rows() {
        let rows = RowSet::parse("residue,chain,model\n").unwrap();
        assert!(rows.is_empty());
        assert!(rows.has_column("chain"));
    }
}

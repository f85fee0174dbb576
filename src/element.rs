//! Colored elements: a color scale plus a structural lookup, one per
//! column key.
//!
//! An element is passive data. The viewer asks it for a per-atom value map
//! of each loaded structure (through [`ResidueHierarchy`]) and colors every
//! mapped atom with [`ColoredElement::color_of`]; atoms left unmapped get
//! the element's default color.

use std::ops::Range;

use rustc_hash::FxHashMap;

use crate::aggregate::{ColumnKey, ProcessedEntry, ResidueDataMap};
use crate::column_type::detect_column_type;
use crate::error::OverlayError;
use crate::ingest::{CellValue, DelimitedId, Delimiters};
use crate::scale::{
    rgb_from_u32, rgb_to_hex, ColorScale, Rgb, ScaleConfig, ScaleWarning,
    DEFAULT_GRAY,
};

// ---------------------------------------------------------------------------
// Structural lookup
// ---------------------------------------------------------------------------

type ChainMap = FxHashMap<String, FxHashMap<String, CellValue>>;

/// model → chain → residue → value, with every delimited model/chain field
/// fanned out to the `(model, chain)` pairs it denotes.
///
/// Model ids are stored upper-cased so they match structure entry ids
/// regardless of how the CSV spelled them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructureLookup {
    models: FxHashMap<String, ChainMap>,
    model_order: Vec<String>,
    len: usize,
}

impl StructureLookup {
    /// Build from aggregated entries.
    ///
    /// # Errors
    ///
    /// [`OverlayError::MisalignedGroups`] when an entry's model and chain
    /// fields split into different numbers of groups.
    pub fn build(
        entries: &[ProcessedEntry],
        delimiters: Delimiters,
    ) -> Result<Self, OverlayError> {
        let mut lookup = Self::default();
        for entry in entries {
            let models = DelimitedId::parse(&entry.model, delimiters);
            let chains = DelimitedId::parse(&entry.chain, delimiters);
            let residue = entry.residue.key();
            let pairs = models.fan_out(&chains).ok_or_else(|| {
                OverlayError::MisalignedGroups {
                    at: format!("entry {residue}_{}_{}", entry.chain, entry.model),
                    models: models.group_count(),
                    chains: chains.group_count(),
                }
            })?;
            for (model, chain) in pairs {
                lookup.insert(model, chain, &residue, &entry.value);
            }
        }
        Ok(lookup)
    }

    fn insert(&mut self, model: &str, chain: &str, residue: &str, value: &CellValue) {
        let model = model.to_ascii_uppercase();
        if !self.models.contains_key(&model) {
            self.model_order.push(model.clone());
        }
        let residues = self
            .models
            .entry(model.clone())
            .or_default()
            .entry(chain.to_owned())
            .or_default();
        match residues.insert(residue.to_owned(), value.clone()) {
            None => self.len += 1,
            Some(previous) if previous != *value => log::warn!(
                "{model}/{chain}/{residue} bound twice; {previous} replaced by {value}"
            ),
            Some(_) => {}
        }
    }

    /// Value bound to one residue of one chain of one model.
    #[must_use]
    pub fn get(&self, model: &str, chain: &str, residue: &str) -> Option<&CellValue> {
        self.models
            .get(&model.to_ascii_uppercase())?
            .get(chain)?
            .get(residue)
    }

    /// Whether any value is bound to `model`.
    #[must_use]
    pub fn has_model(&self, model: &str) -> bool {
        self.models.contains_key(&model.to_ascii_uppercase())
    }

    /// Models covered, first-seen order.
    #[must_use]
    pub fn models(&self) -> &[String] {
        &self.model_order
    }

    /// `(chain, residue, value)` bindings of one model, sorted by chain then
    /// residue text for stable output.
    #[must_use]
    pub fn bindings(&self, model: &str) -> Vec<(&str, &str, &CellValue)> {
        let Some(chains) = self.models.get(&model.to_ascii_uppercase()) else {
            return Vec::new();
        };
        let mut out: Vec<(&str, &str, &CellValue)> = chains
            .iter()
            .flat_map(|(chain, residues)| {
                residues
                    .iter()
                    .map(move |(res, v)| (chain.as_str(), res.as_str(), v))
            })
            .collect();
        out.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(b.1)));
        out
    }

    /// Total number of `(model, chain, residue)` bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no bindings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// ---------------------------------------------------------------------------
// Structure view
// ---------------------------------------------------------------------------

/// Read-only view of one loaded structure: its residues in order, their
/// author chain/sequence ids and the atoms each one spans.
pub trait ResidueHierarchy {
    /// Entry id of the structure (e.g. `6XR8`).
    fn entry_id(&self) -> &str;
    /// Number of residues.
    fn residue_count(&self) -> usize;
    /// Author chain id of residue `r`.
    fn chain_id(&self, r: usize) -> &str;
    /// Author sequence id of residue `r`.
    fn seq_id(&self, r: usize) -> i32;
    /// Atom indices belonging to residue `r`.
    fn atom_range(&self, r: usize) -> Range<usize>;
}

#[derive(Debug, Clone, PartialEq)]
struct TableResidue {
    chain: String,
    seq_id: i32,
    atoms: Range<usize>,
}

/// In-memory [`ResidueHierarchy`], built residue by residue.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResidueTable {
    entry_id: String,
    residues: Vec<TableResidue>,
    atom_count: usize,
}

impl ResidueTable {
    /// Empty table for one entry.
    #[must_use]
    pub fn new(entry_id: impl Into<String>) -> Self {
        Self {
            entry_id: entry_id.into(),
            ..Self::default()
        }
    }

    /// Append a residue spanning the next `atoms` atom indices.
    pub fn push_residue(&mut self, chain: impl Into<String>, seq_id: i32, atoms: usize) {
        let start = self.atom_count;
        self.atom_count += atoms;
        self.residues.push(TableResidue {
            chain: chain.into(),
            seq_id,
            atoms: start..self.atom_count,
        });
    }

    /// Builder form of [`push_residue`](Self::push_residue).
    #[must_use]
    pub fn with_residue(mut self, chain: impl Into<String>, seq_id: i32, atoms: usize) -> Self {
        self.push_residue(chain, seq_id, atoms);
        self
    }

    /// Total number of atoms.
    #[must_use]
    pub fn atom_count(&self) -> usize {
        self.atom_count
    }
}

impl ResidueHierarchy for ResidueTable {
    fn entry_id(&self) -> &str {
        &self.entry_id
    }

    fn residue_count(&self) -> usize {
        self.residues.len()
    }

    fn chain_id(&self, r: usize) -> &str {
        self.residues.get(r).map_or("", |res| res.chain.as_str())
    }

    fn seq_id(&self, r: usize) -> i32 {
        self.residues.get(r).map_or(0, |res| res.seq_id)
    }

    fn atom_range(&self, r: usize) -> Range<usize> {
        self.residues.get(r).map_or(0..0, |res| res.atoms.clone())
    }
}

// ---------------------------------------------------------------------------
// Element
// ---------------------------------------------------------------------------

/// Input to [`build_element`].
#[derive(Debug, Clone)]
pub struct ElementRequest<'a> {
    /// `column[-condition]` name.
    pub name: &'a str,
    /// Structured key. Parsed from `name` when absent, which splits at the
    /// first `-`.
    pub key: Option<ColumnKey>,
    /// Aggregated entries for that key.
    pub entries: &'a [ProcessedEntry],
    /// Scale config; the factory default for the detected column kind when
    /// absent.
    pub scale_config: Option<ScaleConfig>,
    /// Color for atoms without data.
    pub default_color: Rgb,
    /// Delimiters used to split model/chain fields.
    pub delimiters: Delimiters,
}

impl<'a> ElementRequest<'a> {
    /// Request with the default gray, default delimiters and the factory
    /// default scale.
    #[must_use]
    pub fn new(name: &'a str, entries: &'a [ProcessedEntry]) -> Self {
        Self {
            name,
            key: None,
            entries,
            scale_config: None,
            default_color: rgb_from_u32(DEFAULT_GRAY),
            delimiters: Delimiters::default(),
        }
    }
}

/// A color scale bound to a structural lookup, ready for the viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ColoredElement {
    key: ColumnKey,
    label: String,
    name: String,
    scale: ColorScale,
    lookup: StructureLookup,
    default_color: Rgb,
}

impl ColoredElement {
    /// Human-readable label (`column` or `column for condition`).
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Unique name (`column[-condition]`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Structured key.
    #[must_use]
    pub fn key(&self) -> &ColumnKey {
        &self.key
    }

    /// The color scale.
    #[must_use]
    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    /// The structural lookup.
    #[must_use]
    pub fn lookup(&self) -> &StructureLookup {
        &self.lookup
    }

    /// Color for atoms without data.
    #[must_use]
    pub fn default_color(&self) -> Rgb {
        self.default_color
    }

    /// Per-atom values for one structure. Residues without a binding are
    /// left out.
    #[must_use]
    pub fn atom_values(&self, structure: &dyn ResidueHierarchy) -> FxHashMap<usize, CellValue> {
        let mut values = FxHashMap::default();
        let model = structure.entry_id();
        if !self.lookup.has_model(model) {
            return values;
        }
        for r in 0..structure.residue_count() {
            let residue = structure.seq_id(r).to_string();
            let Some(value) = self.lookup.get(model, structure.chain_id(r), &residue)
            else {
                continue;
            };
            for atom in structure.atom_range(r) {
                let _ = values.insert(atom, value.clone());
            }
        }
        values
    }

    /// Color for one value.
    #[must_use]
    pub fn color_of(&self, value: &CellValue) -> Rgb {
        self.scale.color(value)
    }

    /// Color for one value as `#rrggbb`.
    #[must_use]
    pub fn hex_of(&self, value: &CellValue) -> String {
        self.scale.hex(value)
    }

    /// Color for one atom of a per-atom value map, falling back to the
    /// default color.
    #[must_use]
    pub fn atom_color(&self, values: &FxHashMap<usize, CellValue>, atom: usize) -> Rgb {
        values
            .get(&atom)
            .map_or(self.default_color, |v| self.color_of(v))
    }

    /// Hover label for one value.
    #[must_use]
    pub fn value_label(&self, value: &CellValue) -> String {
        format!("{}: {value}", self.label)
    }

    /// Warnings raised while building the scale.
    #[must_use]
    pub fn warnings(&self) -> &[ScaleWarning] {
        self.scale.warnings()
    }

    /// Default color as `#rrggbb`.
    #[must_use]
    pub fn default_hex(&self) -> String {
        rgb_to_hex(self.default_color)
    }
}

/// Build one colored element.
///
/// # Errors
///
/// [`OverlayError::MissingArgument`] for an empty name or no entries, and
/// a keyed [`OverlayError::MisalignedGroups`] from the structural lookup.
pub fn build_element(request: ElementRequest<'_>) -> Result<ColoredElement, OverlayError> {
    if request.name.is_empty() {
        return Err(OverlayError::MissingArgument("element name".to_owned()));
    }
    if request.entries.is_empty() {
        return Err(OverlayError::MissingArgument(format!(
            "entries for element '{}'",
            request.name
        )));
    }

    let key = request
        .key
        .unwrap_or_else(|| ColumnKey::parse_name(request.name));
    let config = request.scale_config.unwrap_or_else(|| {
        let kind = detect_column_type(request.entries.iter().map(|e| Some(&e.value))).kind;
        ScaleConfig::default_for(kind)
    });
    let scale = ColorScale::for_entries(request.entries, &config);
    let lookup = StructureLookup::build(request.entries, request.delimiters)
        .map_err(|e| e.with_key(request.name))?;

    log::debug!(
        "built element '{}' ({} scale, {}): {} binding(s) over {} model(s)",
        request.name,
        scale.scale_type(),
        scale.scheme(),
        lookup.len(),
        lookup.models().len(),
    );

    Ok(ColoredElement {
        label: key.label(),
        name: request.name.to_owned(),
        key,
        scale,
        lookup,
        default_color: request.default_color,
    })
}

/// Build one element per key of `data`, using the matching scale config or
/// the factory default.
///
/// # Errors
///
/// [`OverlayError::EmptyResidueData`] for an empty map, or the first
/// [`build_element`] error.
pub fn build_many_elements(
    data: &ResidueDataMap,
    scale_configs: &FxHashMap<ColumnKey, ScaleConfig>,
    default_color: Rgb,
    delimiters: Delimiters,
) -> Result<Vec<ColoredElement>, OverlayError> {
    if data.is_empty() {
        return Err(OverlayError::EmptyResidueData);
    }
    data.iter()
        .map(|(key, entries)| {
            let name = key.to_string();
            build_element(ElementRequest {
                name: &name,
                key: Some(key.clone()),
                entries,
                scale_config: scale_configs.get(key).cloned(),
                default_color,
                delimiters,
            })
        })
        .collect()
}

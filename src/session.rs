//! The reactive store around the pipeline.
//!
//! An [`OverlaySession`] owns the current options, the uploaded dataset and
//! the last committed [`Overlay`]. Inputs bump a generation counter only when
//! their value actually changes; [`OverlaySession::refresh`] recomputes only
//! when a counter moved past the last run, so repeated or redundant triggers
//! never rebuild anything. The viewer is borrowed per call and never stored.

use std::fmt;

use crate::aggregate::{process_residue_data, ColumnKey, ResidueDataMap};
use crate::element::{build_many_elements, ColoredElement};
use crate::error::OverlayError;
use crate::ingest::{columns, RowSet};
use crate::options::OverlayOptions;
use crate::scale::ScaleConfig;
use crate::validate::validate;
use crate::viewer::{structure_requests, ViewerBinding};

// ── Status ───────────────────────────────────────────────────────────────

/// Outcome class of the last session action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusKind {
    /// Nothing has happened yet.
    #[default]
    Idle,
    /// The last action succeeded.
    Success,
    /// The last action succeeded but the viewer or a scale reported a
    /// problem.
    Degraded,
    /// The last action failed.
    Error,
}

/// User-facing status line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Status {
    /// Outcome class.
    pub kind: StatusKind,
    /// Human-readable message.
    pub message: String,
}

impl Status {
    fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// ── Overlay ──────────────────────────────────────────────────────────────

/// One committed pipeline result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Overlay {
    /// Aggregated entries per key.
    pub residue_data: ResidueDataMap,
    /// One element per key, in key order.
    pub elements: Vec<ColoredElement>,
    /// Scale warnings, prefixed with the element name.
    pub warnings: Vec<String>,
}

impl Overlay {
    fn build(rows: &RowSet, options: &OverlayOptions) -> Result<Self, OverlayError> {
        let keys = options.selection.keys();
        if keys.is_empty() {
            return Ok(Self::default());
        }
        let residue_data = process_residue_data(rows, &keys)?;
        let elements = build_many_elements(
            &residue_data,
            &options.scale_configs(),
            options.viewer.default_rgb(),
            rows.delimiters(),
        )?;
        let warnings = elements
            .iter()
            .flat_map(|e| e.warnings().iter().map(move |w| format!("{}: {w}", e.name())))
            .collect();
        Ok(Self {
            residue_data,
            elements,
            warnings,
        })
    }
}

// ── Session ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct Dataset {
    name: String,
    rows: RowSet,
}

/// Generations of the inputs a run was computed from.
type Stamp = (u64, u64);

/// Store for one user's overlay: options, dataset, status and the last
/// committed result.
#[derive(Debug, Default)]
pub struct OverlaySession {
    options: OverlayOptions,
    dataset: Option<Dataset>,
    status: Status,
    overlay: Option<Overlay>,
    data_generation: u64,
    config_generation: u64,
    last_run: Option<Stamp>,
    loaded_data: Option<u64>,
}

impl OverlaySession {
    /// Empty session with the given options.
    #[must_use]
    pub fn new(options: OverlayOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Current options.
    #[must_use]
    pub fn options(&self) -> &OverlayOptions {
        &self.options
    }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// Last committed overlay, if any.
    #[must_use]
    pub fn overlay(&self) -> Option<&Overlay> {
        self.overlay.as_ref()
    }

    /// Currently loaded dataset.
    #[must_use]
    pub fn rows(&self) -> Option<&RowSet> {
        self.dataset.as_ref().map(|d| &d.rows)
    }

    /// Name of the currently loaded dataset.
    #[must_use]
    pub fn dataset_name(&self) -> Option<&str> {
        self.dataset.as_ref().map(|d| d.name.as_str())
    }

    /// Whether an input changed since the last recomputation.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.last_run != Some(self.stamp())
    }

    fn stamp(&self) -> Stamp {
        (self.data_generation, self.config_generation)
    }

    /// Parse and validate a new upload.
    ///
    /// A failed upload replaces whatever was loaded before: the dataset and
    /// the committed overlay are cleared and the error becomes the status.
    ///
    /// # Errors
    ///
    /// Any parse or validation error for `csv_text`.
    pub fn upload(&mut self, name: &str, csv_text: &str) -> Result<(), OverlayError> {
        let parsed = RowSet::parse_with(csv_text, self.options.data.delimiters).and_then(|rows| {
            validate(&rows, &columns::REQUIRED, &self.options.data.extra_columns())?;
            Ok(rows)
        });
        match parsed {
            Ok(rows) => {
                self.status = Status::new(
                    StatusKind::Success,
                    format!("loaded {} row(s) from {name}", rows.len()),
                );
                log::info!("{}", self.status);
                if self.rows() == Some(&rows) {
                    return Ok(());
                }
                self.dataset = Some(Dataset {
                    name: name.to_owned(),
                    rows,
                });
                self.data_generation += 1;
                Ok(())
            }
            Err(err) => {
                self.status = Status::new(StatusKind::Error, format!("{name}: {err}"));
                log::error!("{}", self.status);
                self.dataset = None;
                self.overlay = None;
                self.data_generation += 1;
                Err(err)
            }
        }
    }

    /// Select metric columns. Returns whether the selection changed.
    pub fn set_columns(&mut self, columns: Vec<String>) -> bool {
        if self.options.selection.columns == columns {
            return false;
        }
        self.options.selection.columns = columns;
        self.config_generation += 1;
        true
    }

    /// Select conditions. Returns whether the selection changed.
    pub fn set_conditions(&mut self, conditions: Vec<String>) -> bool {
        if self.options.selection.conditions == conditions {
            return false;
        }
        self.options.selection.conditions = conditions;
        self.config_generation += 1;
        true
    }

    /// Set the scale for one key. Returns whether it changed.
    pub fn set_scale_config(&mut self, key: &ColumnKey, scale: ScaleConfig) -> bool {
        if self.options.scale_configs().get(key) == Some(&scale) {
            return false;
        }
        self.options.set_scale(key, scale);
        self.config_generation += 1;
        true
    }

    /// Replace all options. Returns whether anything changed.
    ///
    /// New delimiters re-split the loaded dataset's `model`/`chain` fields,
    /// which counts as a data change.
    pub fn set_options(&mut self, options: OverlayOptions) -> bool {
        if self.options == options {
            return false;
        }
        let delimiters = options.data.delimiters;
        if let Some(dataset) = self.dataset.take() {
            if dataset.rows.delimiters() != delimiters {
                self.data_generation += 1;
            }
            self.dataset = Some(Dataset {
                rows: dataset.rows.with_delimiters(delimiters),
                ..dataset
            });
        }
        self.options = options;
        self.config_generation += 1;
        true
    }

    /// Recompute if any input changed and push the result to `viewer`.
    ///
    /// Structures are reloaded only when the dataset changed. Elements are
    /// always cleared and re-registered. A `false` from the viewer turns
    /// the status into [`StatusKind::Degraded`]. A failed recomputation
    /// records the error but keeps the last committed overlay on screen.
    ///
    /// Returns whether a recomputation ran.
    pub fn refresh(&mut self, viewer: &mut impl ViewerBinding) -> bool {
        if !self.is_dirty() {
            return false;
        }
        let stamp = self.stamp();
        self.last_run = Some(stamp);

        let Some(dataset) = &self.dataset else {
            if !viewer.clear_elements() {
                log::warn!("viewer failed to clear elements");
            }
            self.loaded_data = None;
            return true;
        };

        let overlay = match Overlay::build(&dataset.rows, &self.options) {
            Ok(overlay) => overlay,
            Err(err) => {
                self.status = Status::new(StatusKind::Error, err.to_string());
                log::error!("{}: {err}", dataset.name);
                return true;
            }
        };

        let mut problems = Vec::new();
        if self.loaded_data != Some(stamp.0) {
            let requests = structure_requests(&dataset.rows.models(), &self.options.viewer);
            log::info!("loading {} structure(s)", requests.len());
            if viewer.load_structures(&requests) {
                self.loaded_data = Some(stamp.0);
            } else {
                problems.push("viewer failed to load structures".to_owned());
            }
        }
        if !viewer.clear_elements() {
            problems.push("viewer failed to clear elements".to_owned());
        }
        if !overlay.elements.is_empty() && !viewer.register_elements(&overlay.elements) {
            problems.push("viewer failed to register elements".to_owned());
        }
        for problem in &problems {
            log::warn!("{problem}");
        }
        problems.extend(overlay.warnings.iter().cloned());

        self.status = if problems.is_empty() {
            Status::new(
                StatusKind::Success,
                format!("showing {} element(s)", overlay.elements.len()),
            )
        } else {
            Status::new(StatusKind::Degraded, problems.join("; "))
        };
        self.overlay = Some(overlay);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::CellValue;
    use crate::viewer::StructureRequest;

    #[derive(Default)]
    struct MockViewer {
        loads: Vec<Vec<StructureRequest>>,
        registered: Vec<String>,
        clears: usize,
        fail_register: bool,
    }

    impl ViewerBinding for MockViewer {
        fn load_structures(&mut self, requests: &[StructureRequest]) -> bool {
            self.loads.push(requests.to_vec());
            true
        }

        fn register_elements(&mut self, elements: &[ColoredElement]) -> bool {
            self.registered = elements.iter().map(|e| e.name().to_owned()).collect();
            !self.fail_register
        }

        fn clear_elements(&mut self) -> bool {
            self.clears += 1;
            self.registered.clear();
            true
        }
    }

    const CSV: &str = "\
residue,chain,model,condition,escape
10,A,6XR8,REGN10987,0.5
11,A,6XR8,REGN10987,0.9
10,A,6XR8,S309,0.1
";

    fn session() -> OverlaySession {
        let mut session = OverlaySession::default();
        session.upload("escape.csv", CSV).unwrap();
        let _ = session.set_columns(vec!["escape".to_owned()]);
        let _ = session.set_conditions(vec!["REGN10987".to_owned()]);
        session
    }

    #[test]
    fn refresh_loads_then_registers() {
        let mut session = session();
        let mut viewer = MockViewer::default();
        assert!(session.refresh(&mut viewer));
        assert_eq!(viewer.loads.len(), 1);
        assert_eq!(
            viewer.loads[0][0].url,
            "https://www.ebi.ac.uk/pdbe/static/entry/6xr8_updated.cif"
        );
        assert_eq!(viewer.registered, vec!["escape-REGN10987"]);
        assert_eq!(session.status().kind, StatusKind::Success);
        assert_eq!(session.overlay().unwrap().elements.len(), 1);
    }

    #[test]
    fn unchanged_inputs_do_not_recompute() {
        let mut session = session();
        let mut viewer = MockViewer::default();
        assert!(session.refresh(&mut viewer));
        assert!(!session.set_columns(vec!["escape".to_owned()]));
        session.upload("escape.csv", CSV).unwrap();
        assert!(!session.is_dirty());
        assert!(!session.refresh(&mut viewer));
        assert_eq!(viewer.clears, 1);
    }

    #[test]
    fn config_change_skips_structure_reload() {
        let mut session = session();
        let mut viewer = MockViewer::default();
        assert!(session.refresh(&mut viewer));
        let key = ColumnKey::with_condition("escape", "REGN10987");
        assert!(session.set_scale_config(&key, ScaleConfig::diverging()));
        assert!(!session.set_scale_config(&key, ScaleConfig::diverging()));
        assert!(session.refresh(&mut viewer));
        assert_eq!(viewer.loads.len(), 1);
        assert_eq!(viewer.clears, 2);
    }

    #[test]
    fn failed_recompute_keeps_last_overlay() {
        let mut session = session();
        let mut viewer = MockViewer::default();
        assert!(session.refresh(&mut viewer));
        let _ = session.set_conditions(vec!["LY-CoV016".to_owned()]);
        assert!(session.refresh(&mut viewer));
        assert_eq!(session.status().kind, StatusKind::Error);
        assert!(session.status().message.contains("LY-CoV016"));
        assert_eq!(
            session.overlay().unwrap().elements[0].name(),
            "escape-REGN10987"
        );
    }

    #[test]
    fn failed_upload_clears_dataset() {
        let mut session = session();
        let mut viewer = MockViewer::default();
        assert!(session.refresh(&mut viewer));
        let err = session
            .upload("bad.csv", "residue,model\n10,6XR8\n")
            .unwrap_err();
        assert!(matches!(err, OverlayError::MissingColumn(ref c) if c == "chain"));
        assert!(session.rows().is_none());
        assert!(session.overlay().is_none());
        assert_eq!(session.status().kind, StatusKind::Error);
        assert!(session.refresh(&mut viewer));
        assert!(viewer.registered.is_empty());
    }

    #[test]
    fn viewer_failure_is_degraded_not_error() {
        let mut session = session();
        let mut viewer = MockViewer {
            fail_register: true,
            ..MockViewer::default()
        };
        assert!(session.refresh(&mut viewer));
        assert_eq!(session.status().kind, StatusKind::Degraded);
        assert!(session.overlay().is_some());
    }

    #[test]
    fn delimiter_change_resplits_dataset() {
        let mut session = OverlaySession::default();
        session
            .upload("multi.csv", "residue,chain,model,escape\n10,A:B,6XR8:6XRA,0.5\n")
            .unwrap();
        let _ = session.set_columns(vec!["escape".to_owned()]);
        let mut viewer = MockViewer::default();
        assert!(session.refresh(&mut viewer));
        assert_eq!(viewer.loads[0].len(), 2);

        let mut options = session.options().clone();
        options.data.delimiters.primary = '|';
        assert!(session.set_options(options));
        assert!(session.refresh(&mut viewer));
        assert_eq!(session.status().kind, StatusKind::Success);
        assert_eq!(viewer.loads.len(), 2);
        assert_eq!(viewer.loads[1].len(), 1);
        let lookup = session.overlay().unwrap().elements[0].lookup();
        assert_eq!(lookup.models(), &["6XR8:6XRA"]);
        assert_eq!(lookup.get("6XR8:6XRA", "A:B", "10"), Some(&CellValue::Number(0.5)));
    }

    #[test]
    fn empty_selection_commits_empty_overlay() {
        let mut session = OverlaySession::default();
        session.upload("escape.csv", CSV).unwrap();
        let mut viewer = MockViewer::default();
        assert!(session.refresh(&mut viewer));
        assert_eq!(viewer.loads.len(), 1);
        assert!(session.overlay().unwrap().elements.is_empty());
        assert_eq!(session.dataset_name(), Some("escape.csv"));
    }
}

// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Per-residue experimental data overlays for 3D protein structures.
//!
//! A CSV of per-residue measurements (antibody escape scores, conservation,
//! binding sites, ...) is parsed, checked for structural integrity, reduced
//! to one value per (residue, chain, model) and turned into colored
//! elements a structure viewer can paint onto its atoms.
//!
//! # Key entry points
//!
//! - [`ingest::RowSet`] - parsed CSV with delimited model/chain fields
//! - [`validate::validate`] - required columns and duplicate detection
//! - [`aggregate::process_residue_data`] - one value per residue key, per
//!   [`aggregate::ColumnKey`]
//! - [`scale::ColorScale`] - sequential, diverging and categorical scales
//! - [`element::build_many_elements`] - colored elements for the viewer
//! - [`session::OverlaySession`] - the store that recomputes on change and
//!   drives a [`viewer::ViewerBinding`]
//! - [`options::OverlayOptions`] - TOML presets for all of the above
//!
//! # Pipeline
//!
//! ```
//! use residue_overlay::aggregate::{process_residue_data, ColumnKey};
//! use residue_overlay::element::build_many_elements;
//! use residue_overlay::ingest::{Delimiters, RowSet};
//! use residue_overlay::scale::{rgb_from_u32, DEFAULT_GRAY};
//! use residue_overlay::validate::validate_default;
//!
//! let rows = RowSet::parse(
//!     "residue,chain,model,max_mut_escape\n10,A,6XR8,0.5\n11,A,6XR8,0.9\n",
//! )?;
//! validate_default(&rows)?;
//! let data = process_residue_data(&rows, &[ColumnKey::new("max_mut_escape")])?;
//! let elements = build_many_elements(
//!     &data,
//!     &Default::default(),
//!     rgb_from_u32(DEFAULT_GRAY),
//!     Delimiters::default(),
//! )?;
//! assert_eq!(elements[0].lookup().len(), 2);
//! # Ok::<(), residue_overlay::error::OverlayError>(())
//! ```

pub mod aggregate;
pub mod column_type;
pub mod element;
pub mod error;
pub mod ingest;
pub mod options;
pub mod scale;
pub mod session;
pub mod validate;
pub mod viewer;

pub use aggregate::{ColumnKey, ProcessedEntry, ResidueDataMap};
pub use element::ColoredElement;
pub use error::OverlayError;
pub use options::OverlayOptions;
pub use session::OverlaySession;

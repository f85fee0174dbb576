//! Value → color mapping for aggregated residue data.
//!
//! Three scale types are supported:
//! - **Sequential**: continuous low → high over `[min, max]` (default
//!   `viridis`).
//! - **Diverging**: continuous around a midpoint over `[min, mid, max]`
//!   (default `RdBu`, midpoint 0).
//! - **Categorical**: each distinct value gets a palette swatch (default
//!   `tableau10`); palettes repeat cyclically when there are more values
//!   than swatches, and values outside the domain get the unknown color.
//!
//! Scale problems are display preferences, not data-integrity failures, so
//! they never error: they fall back and record a [`ScaleWarning`].

mod color;
pub mod schemes;

use std::fmt;

pub use color::{
    parse_hex, rgb_from_u32, rgb_to_hex, ColorRamp, Rgb, DEFAULT_GRAY,
};
use serde::{Deserialize, Serialize};

use crate::aggregate::ProcessedEntry;
use crate::column_type::{detect_column_type, ColumnKind};
use crate::ingest::CellValue;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Requested scale type. Unrecognized names are kept so the factory can
/// warn about them and fall back to sequential.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ScaleType {
    /// Continuous low → high.
    #[default]
    Sequential,
    /// Continuous around a midpoint.
    Diverging,
    /// Discrete value → swatch.
    Categorical,
    /// Anything else; treated as sequential with a warning.
    Other(String),
}

impl From<String> for ScaleType {
    fn from(name: String) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "sequential" => Self::Sequential,
            "diverging" => Self::Diverging,
            "categorical" => Self::Categorical,
            _ => Self::Other(name),
        }
    }
}

impl From<&str> for ScaleType {
    fn from(name: &str) -> Self {
        Self::from(name.to_owned())
    }
}

impl From<ScaleType> for String {
    fn from(kind: ScaleType) -> Self {
        kind.to_string()
    }
}

impl fmt::Display for ScaleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequential => f.write_str("sequential"),
            Self::Diverging => f.write_str("diverging"),
            Self::Categorical => f.write_str("categorical"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// How one column key is colored. Every field is optional in TOML.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Scale type.
    pub scale_type: ScaleType,
    /// Scheme name; the scale type's default when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Explicit domain: `[min, max]` (sequential), `[min, mid, max]`
    /// (diverging) or the category list (categorical).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Vec<CellValue>>,
    /// Traverse the scale high → low.
    pub reverse: bool,
    /// Diverging midpoint; 0 when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub midpoint: Option<f64>,
    /// Color for values outside a categorical domain (or non-numeric values
    /// on a continuous scale), as `#rrggbb`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unknown_color: Option<String>,
}

impl ScaleConfig {
    /// Default sequential scale (`viridis`).
    #[must_use]
    pub fn sequential() -> Self {
        Self::default()
    }

    /// Default diverging scale (`RdBu`, midpoint 0).
    #[must_use]
    pub fn diverging() -> Self {
        Self {
            scale_type: ScaleType::Diverging,
            ..Self::default()
        }
    }

    /// Default categorical scale (`tableau10`).
    #[must_use]
    pub fn categorical() -> Self {
        Self {
            scale_type: ScaleType::Categorical,
            ..Self::default()
        }
    }

    /// Factory default for a detected column kind.
    #[must_use]
    pub fn default_for(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Numeric => Self::sequential(),
            ColumnKind::Categorical => Self::categorical(),
        }
    }

    /// Same config with a named scheme.
    #[must_use]
    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = Some(scheme.into());
        self
    }
}

// ---------------------------------------------------------------------------
// Warnings
// ---------------------------------------------------------------------------

/// Non-fatal problems found while building a scale.
#[derive(Debug, Clone, PartialEq)]
pub enum ScaleWarning {
    /// The scale type was not recognized; sequential was used.
    UnknownScaleType(String),
    /// The scheme was not found for this scale type.
    UnknownScheme {
        /// Requested scheme.
        scheme: String,
        /// Scheme used instead.
        fallback: &'static str,
    },
    /// More categories than palette swatches; swatches repeat.
    CategoryOverflow {
        /// Number of categories.
        categories: usize,
        /// Number of swatches in the palette.
        palette: usize,
    },
    /// The configured domain has the wrong shape and was ignored.
    InvalidDomain(String),
    /// A continuous scale received no numeric values.
    NoNumericValues,
    /// The configured unknown color could not be parsed.
    InvalidUnknownColor(String),
}

impl fmt::Display for ScaleWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownScaleType(name) => write!(
                f,
                "unknown scale type: {name}, falling back to sequential"
            ),
            Self::UnknownScheme { scheme, fallback } => {
                write!(f, "unknown color scheme: {scheme}, using {fallback}")
            }
            Self::CategoryOverflow {
                categories,
                palette,
            } => write!(
                f,
                "the number of categories ({categories}) exceeds the number \
                 of colors in the color scheme ({palette})"
            ),
            Self::InvalidDomain(why) => {
                write!(f, "ignoring configured domain: {why}")
            }
            Self::NoNumericValues => write!(
                f,
                "no numeric values for a continuous scale; every value uses \
                 the unknown color"
            ),
            Self::InvalidUnknownColor(text) => {
                write!(f, "invalid unknown color '{text}', using #777777")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Scale
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
enum ScaleKind {
    Sequential {
        ramp: ColorRamp,
        domain: Option<[f64; 2]>,
    },
    Diverging {
        ramp: ColorRamp,
        domain: Option<[f64; 3]>,
    },
    Categorical {
        domain: Vec<CellValue>,
        palette: Vec<Rgb>,
    },
}

/// A built value → color mapping. Pure: the same value always yields the
/// same color.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    kind: ScaleKind,
    scheme: &'static str,
    unknown: Rgb,
    warnings: Vec<ScaleWarning>,
}

fn numeric_values(values: &[CellValue]) -> Vec<f64> {
    values.iter().filter_map(CellValue::as_f64).collect()
}

fn extent(nums: &[f64]) -> Option<(f64, f64)> {
    nums.iter().fold(None, |acc, &n| match acc {
        Some((lo, hi)) => Some((f64::min(lo, n), f64::max(hi, n))),
        None => Some((n, n)),
    })
}

impl ColorScale {
    /// Build a scale over aggregated entries (their `value` fields).
    #[must_use]
    pub fn for_entries(entries: &[ProcessedEntry], config: &ScaleConfig) -> Self {
        let values: Vec<CellValue> =
            entries.iter().map(|e| e.value.clone()).collect();
        Self::build(&values, config)
    }

    /// Build a scale over raw values.
    #[must_use]
    pub fn build(values: &[CellValue], config: &ScaleConfig) -> Self {
        let mut warnings = Vec::new();

        let scale_type = match &config.scale_type {
            ScaleType::Other(name) => {
                warnings.push(ScaleWarning::UnknownScaleType(name.clone()));
                ScaleType::Sequential
            }
            known => known.clone(),
        };

        let default_scheme = schemes::default_scheme(&scale_type);
        let (scheme, colors) = match config.scheme.as_deref() {
            None => (default_scheme, None),
            Some(name) => match schemes::lookup(&scale_type, name) {
                Some(colors) => (
                    schemes::available_schemes(&scale_type)
                        .into_iter()
                        .find(|n| n.eq_ignore_ascii_case(name))
                        .unwrap_or(default_scheme),
                    Some(colors),
                ),
                None => {
                    warnings.push(ScaleWarning::UnknownScheme {
                        scheme: name.to_owned(),
                        fallback: default_scheme,
                    });
                    (default_scheme, None)
                }
            },
        };
        let colors = colors
            .or_else(|| schemes::lookup(&scale_type, default_scheme))
            .unwrap_or(&[]);

        let unknown = match config.unknown_color.as_deref() {
            None => rgb_from_u32(DEFAULT_GRAY),
            Some(text) => parse_hex(text).unwrap_or_else(|| {
                warnings.push(ScaleWarning::InvalidUnknownColor(text.to_owned()));
                rgb_from_u32(DEFAULT_GRAY)
            }),
        };

        let kind = match scale_type {
            ScaleType::Diverging => {
                Self::diverging(values, config, colors, &mut warnings)
            }
            ScaleType::Categorical => {
                Self::categorical(values, config, colors, &mut warnings)
            }
            ScaleType::Sequential | ScaleType::Other(_) => {
                Self::sequential(values, config, colors, &mut warnings)
            }
        };

        for warning in &warnings {
            log::warn!("{warning}");
        }

        Self {
            kind,
            scheme,
            unknown,
            warnings,
        }
    }

    fn sequential(
        values: &[CellValue],
        config: &ScaleConfig,
        colors: &[u32],
        warnings: &mut Vec<ScaleWarning>,
    ) -> ScaleKind {
        let configured = config.domain.as_deref().map(numeric_values);
        let domain = match configured {
            Some(d) if d.len() >= 2 => Some([d[0], d[d.len() - 1]]),
            other => {
                if other.is_some() {
                    warnings.push(ScaleWarning::InvalidDomain(
                        "sequential scales need at least two numbers".to_owned(),
                    ));
                }
                extent(&numeric_values(values)).map(|(lo, hi)| [lo, hi])
            }
        };
        if domain.is_none() {
            warnings.push(ScaleWarning::NoNumericValues);
        }
        ScaleKind::Sequential {
            ramp: ColorRamp::from_hex(colors),
            domain: domain.map(|[a, b]| if config.reverse { [b, a] } else { [a, b] }),
        }
    }

    fn diverging(
        values: &[CellValue],
        config: &ScaleConfig,
        colors: &[u32],
        warnings: &mut Vec<ScaleWarning>,
    ) -> ScaleKind {
        let midpoint = config.midpoint.unwrap_or(0.0);
        let configured = config.domain.as_deref().map(numeric_values);
        let domain = match configured.as_deref() {
            Some(&[lo, mid, hi]) => Some([lo, mid, hi]),
            Some(&[lo, hi]) => Some([lo, midpoint, hi]),
            other => {
                if other.is_some() {
                    warnings.push(ScaleWarning::InvalidDomain(
                        "diverging scales need two or three numbers".to_owned(),
                    ));
                }
                extent(&numeric_values(values)).map(|(lo, hi)| [lo, midpoint, hi])
            }
        };
        if domain.is_none() {
            warnings.push(ScaleWarning::NoNumericValues);
        }
        ScaleKind::Diverging {
            ramp: ColorRamp::from_hex(colors),
            domain: domain.map(|[a, m, b]| if config.reverse { [b, m, a] } else { [a, m, b] }),
        }
    }

    fn categorical(
        values: &[CellValue],
        config: &ScaleConfig,
        colors: &[u32],
        warnings: &mut Vec<ScaleWarning>,
    ) -> ScaleKind {
        let domain = config.domain.clone().unwrap_or_else(|| {
            detect_column_type(values.iter().map(Some)).unique_values
        });
        if domain.len() > colors.len() {
            warnings.push(ScaleWarning::CategoryOverflow {
                categories: domain.len(),
                palette: colors.len(),
            });
        }
        ScaleKind::Categorical {
            domain,
            palette: colors.iter().map(|&c| rgb_from_u32(c)).collect(),
        }
    }

    /// Color for `value`.
    #[must_use]
    pub fn color(&self, value: &CellValue) -> Rgb {
        match &self.kind {
            ScaleKind::Sequential { ramp, domain } => {
                let (Some([x0, x1]), Some(x)) = (*domain, value.as_f64()) else {
                    return self.unknown;
                };
                let t = if x0 == x1 { 0.0 } else { (x - x0) / (x1 - x0) };
                ramp.sample(t as f32)
            }
            ScaleKind::Diverging { ramp, domain } => {
                let (Some([x0, x1, x2]), Some(x)) = (*domain, value.as_f64())
                else {
                    return self.unknown;
                };
                let s = if x1 < x0 { -1.0 } else { 1.0 };
                let k10 = if x0 == x1 { 0.0 } else { 0.5 / (x1 - x0) };
                let k21 = if x1 == x2 { 0.0 } else { 0.5 / (x2 - x1) };
                let k = if s * x < s * x1 { k10 } else { k21 };
                ramp.sample((0.5 + (x - x1) * k) as f32)
            }
            ScaleKind::Categorical { domain, palette } => {
                let key = value.key();
                domain
                    .iter()
                    .position(|d| d.key() == key)
                    .and_then(|i| palette.get(i % palette.len().max(1)))
                    .copied()
                    .unwrap_or(self.unknown)
            }
        }
    }

    /// Color for `value` as `#rrggbb`.
    #[must_use]
    pub fn hex(&self, value: &CellValue) -> String {
        rgb_to_hex(self.color(value))
    }

    /// Resolved scale type (after any fallback).
    #[must_use]
    pub fn scale_type(&self) -> ScaleType {
        match self.kind {
            ScaleKind::Sequential { .. } => ScaleType::Sequential,
            ScaleKind::Diverging { .. } => ScaleType::Diverging,
            ScaleKind::Categorical { .. } => ScaleType::Categorical,
        }
    }

    /// Resolved scheme name (after any fallback).
    #[must_use]
    pub fn scheme(&self) -> &'static str {
        self.scheme
    }

    /// Color used for values the scale cannot place.
    #[must_use]
    pub fn unknown_color(&self) -> Rgb {
        self.unknown
    }

    /// Warnings recorded while building.
    #[must_use]
    pub fn warnings(&self) -> &[ScaleWarning] {
        &self.warnings
    }
}

/// Build a scale for aggregated entries.
#[must_use]
pub fn build_scale(entries: &[ProcessedEntry], config: &ScaleConfig) -> ColorScale {
    ColorScale::for_entries(entries, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nums(values: &[f64]) -> Vec<CellValue> {
        values.iter().map(|&n| CellValue::Number(n)).collect()
    }

    fn ramp_end(name: &str, kind: &ScaleType, t: f32) -> Rgb {
        ColorRamp::from_hex(schemes::lookup(kind, name).unwrap()).sample(t)
    }

    #[test]
    fn sequential_spans_min_to_max() {
        let scale = ColorScale::build(&nums(&[0.5, 0.9, 0.7]), &ScaleConfig::sequential());
        let seq = ScaleType::Sequential;
        assert_eq!(scale.color(&CellValue::Number(0.5)), ramp_end("viridis", &seq, 0.0));
        assert_eq!(scale.color(&CellValue::Number(0.9)), ramp_end("viridis", &seq, 1.0));
        assert_eq!(scale.hex(&CellValue::Number(0.5)), "#440154");
        assert_eq!(scale.hex(&CellValue::Number(0.9)), "#fde725");
        assert!(scale.warnings().is_empty());
    }

    #[test]
    fn sequential_reverse_and_custom_domain() {
        let config = ScaleConfig {
            domain: Some(nums(&[0.0, 1.0])),
            reverse: true,
            ..ScaleConfig::sequential()
        };
        let scale = ColorScale::build(&nums(&[0.5]), &config);
        assert_eq!(scale.hex(&CellValue::Number(0.0)), "#fde725");
        assert_eq!(scale.hex(&CellValue::Number(1.0)), "#440154");
        // out of domain clamps
        assert_eq!(scale.hex(&CellValue::Number(5.0)), "#440154");
    }

    #[test]
    fn sequential_text_maps_to_unknown() {
        let scale = ColorScale::build(&nums(&[1.0, 2.0]), &ScaleConfig::sequential());
        assert_eq!(scale.hex(&CellValue::from("buried")), "#777777");
    }

    #[test]
    fn degenerate_domain_maps_to_low_end() {
        let scale = ColorScale::build(&nums(&[0.3, 0.3]), &ScaleConfig::sequential());
        assert_eq!(scale.hex(&CellValue::Number(0.3)), "#440154");
    }

    #[test]
    fn diverging_anchors_midpoint() {
        let scale = ColorScale::build(&nums(&[-2.0, 1.0, 4.0]), &ScaleConfig::diverging());
        let div = ScaleType::Diverging;
        assert_eq!(scale.color(&CellValue::Number(-2.0)), ramp_end("RdBu", &div, 0.0));
        assert_eq!(scale.color(&CellValue::Number(0.0)), ramp_end("RdBu", &div, 0.5));
        assert_eq!(scale.color(&CellValue::Number(4.0)), ramp_end("RdBu", &div, 1.0));
        assert_eq!(scale.hex(&CellValue::Number(0.0)), "#f7f7f7");
    }

    #[test]
    fn diverging_reverse() {
        let config = ScaleConfig {
            reverse: true,
            ..ScaleConfig::diverging()
        };
        let scale = ColorScale::build(&nums(&[-1.0, 1.0]), &config);
        assert_eq!(scale.hex(&CellValue::Number(1.0)), "#67001f");
        assert_eq!(scale.hex(&CellValue::Number(-1.0)), "#053061");
    }

    #[test]
    fn categorical_cycles_with_warning() {
        let values: Vec<CellValue> =
            (0..12).map(|i| CellValue::from(format!("c{i}"))).collect();
        let scale = ColorScale::build(
            &values,
            &ScaleConfig::categorical().with_scheme("dark2"),
        );
        assert_eq!(scale.color(&values[8]), scale.color(&values[0]));
        assert_ne!(scale.color(&values[1]), scale.color(&values[0]));
        assert_eq!(
            scale.warnings(),
            &[ScaleWarning::CategoryOverflow {
                categories: 12,
                palette: 8
            }]
        );
    }

    #[test]
    fn categorical_unknown_value() {
        let values = vec![CellValue::from("core"), CellValue::from("rim")];
        let config = ScaleConfig {
            unknown_color: Some("#000000".to_owned()),
            ..ScaleConfig::categorical()
        };
        let scale = ColorScale::build(&values, &config);
        assert_eq!(scale.hex(&CellValue::from("core")), "#4e79a7");
        assert_eq!(scale.hex(&CellValue::from("rim")), "#f28e2c");
        assert_eq!(scale.hex(&CellValue::from("support")), "#000000");
    }

    #[test]
    fn unknown_scale_type_falls_back() {
        let config = ScaleConfig {
            scale_type: ScaleType::from("logarithmic"),
            ..ScaleConfig::default()
        };
        let scale = ColorScale::build(&nums(&[0.0, 1.0]), &config);
        assert_eq!(scale.scale_type(), ScaleType::Sequential);
        assert!(matches!(
            scale.warnings(),
            [ScaleWarning::UnknownScaleType(name)] if name == "logarithmic"
        ));
    }

    #[test]
    fn unknown_scheme_falls_back() {
        let scale = ColorScale::build(
            &nums(&[0.0, 1.0]),
            &ScaleConfig::sequential().with_scheme("rainbow"),
        );
        assert_eq!(scale.scheme(), "viridis");
        assert_eq!(scale.warnings().len(), 1);
    }

    #[test]
    fn deterministic() {
        let values = nums(&[0.1, 0.4, 0.8]);
        let a = ColorScale::build(&values, &ScaleConfig::sequential().with_scheme("magma"));
        let b = ColorScale::build(&values, &ScaleConfig::sequential().with_scheme("Magma"));
        assert_eq!(a, b);
        assert_eq!(a.scheme(), "magma");
    }

    #[test]
    fn scale_type_names() {
        assert_eq!(ScaleType::from("Diverging"), ScaleType::Diverging);
        assert_eq!(String::from(ScaleType::Categorical), "categorical");
        let parsed: ScaleConfig =
            toml::from_str("scale_type = \"categorical\"\nscheme = \"set2\"").unwrap();
        assert_eq!(parsed.scale_type, ScaleType::Categorical);
    }
}

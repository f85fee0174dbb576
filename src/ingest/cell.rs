use std::fmt;

use serde::{Deserialize, Serialize};

/// A typed CSV cell. Empty cells are represented as `None` by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// A finite number.
    Number(f64),
    /// Anything that does not parse as a finite number.
    Text(String),
}

impl CellValue {
    /// Infer the type of a raw cell. Blank cells become `None`, finite
    /// numeric text becomes [`CellValue::Number`], the rest stays text.
    #[must_use]
    pub fn infer(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Some(Self::Number(n)),
            _ => Some(Self::Text(trimmed.to_owned())),
        }
    }

    /// Keep a raw cell as text. Blank cells become `None`. Used for
    /// identifier columns, where `1E10` is a PDB id and not a number.
    #[must_use]
    pub fn text(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        (!trimmed.is_empty()).then(|| Self::Text(trimmed.to_owned()))
    }

    /// Numeric view of this value, if it is (or parses as) a finite number.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Canonical text form, used for keys and comparisons across types.
    #[must_use]
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Whether this is blank text.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_numbers_text_and_blanks() {
        assert_eq!(CellValue::infer("0.5"), Some(CellValue::Number(0.5)));
        assert_eq!(CellValue::infer(" 10 "), Some(CellValue::Number(10.0)));
        assert_eq!(CellValue::infer("6XR8"), Some(CellValue::from("6XR8")));
        assert_eq!(CellValue::infer("   "), None);
        assert_eq!(CellValue::infer(""), None);
    }

    #[test]
    fn non_finite_stays_text() {
        assert_eq!(CellValue::infer("NaN"), Some(CellValue::from("NaN")));
        assert_eq!(CellValue::infer("inf"), Some(CellValue::from("inf")));
    }

    #[test]
    fn identifiers_stay_text() {
        assert_eq!(CellValue::text(" 1E10 "), Some(CellValue::from("1E10")));
        assert_eq!(CellValue::text(""), None);
        assert_eq!(CellValue::text("1E10").map(|v| v.key()), Some("1E10".to_owned()));
    }

    #[test]
    fn integral_numbers_key_without_fraction() {
        assert_eq!(CellValue::Number(10.0).key(), "10");
        assert_eq!(CellValue::Number(0.25).key(), "0.25");
    }
}

//! Two-level delimited identifiers (`"6XR8:6XRA"`, `"A;B:C;D"`).
//!
//! The primary delimiter separates groups (one per model), the secondary
//! delimiter separates items inside a group (the chains of that model).
//! A row's `model` and `chain` fields pair up group by group.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Delimiter pair used to split multi-valued identifier cells.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema,
)]
#[serde(default)]
pub struct Delimiters {
    /// Separates groups (typically models).
    pub primary: char,
    /// Separates items within a group (typically chains).
    pub secondary: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            primary: ':',
            secondary: ';',
        }
    }
}

/// An ordered sequence of groups, each an ordered sequence of identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DelimitedId {
    groups: Vec<Vec<String>>,
}

impl DelimitedId {
    /// Split `text` into groups and items. Items are trimmed; empty items
    /// are kept so group shapes survive, but [`Self::fan_out`] skips them.
    #[must_use]
    pub fn parse(text: &str, delimiters: Delimiters) -> Self {
        let groups = text
            .split(delimiters.primary)
            .map(|group| {
                group
                    .split(delimiters.secondary)
                    .map(|item| item.trim().to_owned())
                    .collect()
            })
            .collect();
        Self { groups }
    }

    /// The parsed groups, in source order.
    #[must_use]
    pub fn groups(&self) -> &[Vec<String>] {
        &self.groups
    }

    /// Number of groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// All non-empty items, flattened across groups.
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .flatten()
            .map(String::as_str)
            .filter(|item| !item.is_empty())
    }

    /// Pair each item of group `i` here with each item of group `i` in
    /// `inner`.
    ///
    /// For models `"6XR8:6XRA"` and chains `"A;B:C;D"` this yields
    /// `(6XR8, A), (6XR8, B), (6XRA, C), (6XRA, D)`. Returns `None` when
    /// the group counts differ.
    #[must_use]
    pub fn fan_out<'a>(
        &'a self,
        inner: &'a DelimitedId,
    ) -> Option<Vec<(&'a str, &'a str)>> {
        if self.groups.len() != inner.groups.len() {
            return None;
        }
        let mut pairs = Vec::new();
        for (outer_group, inner_group) in self.groups.iter().zip(&inner.groups)
        {
            for outer in outer_group.iter().filter(|s| !s.is_empty()) {
                for item in inner_group.iter().filter(|s| !s.is_empty()) {
                    pairs.push((outer.as_str(), item.as_str()));
                }
            }
        }
        Some(pairs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_models_and_chains() {
        let models = DelimitedId::parse("6XR8:6XRA", Delimiters::default());
        let chains = DelimitedId::parse("A;B:C;D", Delimiters::default());
        assert_eq!(models.groups(), &[vec!["6XR8"], vec!["6XRA"]]);
        assert_eq!(chains.groups(), &[vec!["A", "B"], vec!["C", "D"]]);
    }

    #[test]
    fn fan_out_pairs_aligned_groups() {
        let models = DelimitedId::parse("6XR8:6XRA", Delimiters::default());
        let chains = DelimitedId::parse("A;B:C;D", Delimiters::default());
        let pairs = models.fan_out(&chains).unwrap();
        assert_eq!(
            pairs,
            vec![
                ("6XR8", "A"),
                ("6XR8", "B"),
                ("6XRA", "C"),
                ("6XRA", "D")
            ]
        );
    }

    #[test]
    fn fan_out_rejects_mismatched_groups() {
        let models = DelimitedId::parse("6XR8:6XRA", Delimiters::default());
        let chains = DelimitedId::parse("A;B", Delimiters::default());
        assert!(models.fan_out(&chains).is_none());
    }

    #[test]
    fn items_are_trimmed_and_flattened() {
        let chains = DelimitedId::parse(" A ; B : C ", Delimiters::default());
        assert_eq!(chains.items().collect::<Vec<_>>(), vec!["A", "B", "C"]);
    }

    #[test]
    fn custom_delimiters() {
        let delimiters = Delimiters {
            primary: '|',
            secondary: ',',
        };
        let chains = DelimitedId::parse("A,B|C", delimiters);
        assert_eq!(chains.group_count(), 2);
        assert_eq!(chains.groups()[0], vec!["A", "B"]);
    }
}

//! Values collected from input, checklist and slider blocks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field values accumulated across the whole flow, keyed by `fieldName`.
pub type CollectedData = BTreeMap<String, FieldValue>;

/// A single collected value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Free text from an input block or a single checklist choice.
    Text(String),
    /// Multiple checklist selections.
    List(Vec<String>),
    /// Numeric value from a slider.
    Number(f64),
}

impl FieldValue {
    /// Whether the value counts as "not provided" for a required input.
    ///
    /// Whitespace-only strings and empty lists are blank. Numbers never are.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(text) => text.trim().is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Number(_) => false,
        }
    }

    /// Number of selected entries when used as a checklist value.
    #[must_use]
    pub fn selection_count(&self) -> usize {
        match self {
            Self::List(items) => items.len(),
            Self::Text(_) | Self::Number(_) => 1,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(value: Vec<&str>) -> Self {
        Self::List(value.into_iter().map(str::to_string).collect())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

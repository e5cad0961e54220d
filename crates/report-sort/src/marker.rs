//! Marker vocabulary and typed marker descriptors.
//!
//! A report declares its structure through marker tokens in each element's
//! class list:
//!
//! | Marker                         | Meaning                                   |
//! |--------------------------------|-------------------------------------------|
//! | `sort-head-<id>`               | Header for column `<id>`                  |
//! | `sort-row[-<index>]`           | Raw row, `<index>` is its slot in a group |
//! | `sort-column-<id>`             | Cell belonging to column `<id>`           |
//! | `sort-data[-<type>]`           | Element holding a value of `<type>`       |
//!
//! The scanner parses each element's markers once into a [`NodeMarkers`]
//! descriptor so nothing downstream has to look at class strings again.

use serde::Deserialize;

use crate::model::ValueType;

/// Marker prefixes recognized by the scanner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct MarkerVocabulary {
    /// Header prefix, followed by the column id.
    pub header: String,
    /// Row prefix, optionally followed by `-<index>`.
    pub row: String,
    /// Column prefix, followed by the column id.
    pub column: String,
    /// Data prefix, optionally followed by `-<type>`.
    pub data: String,
}

impl Default for MarkerVocabulary {
    fn default() -> Self {
        Self {
            header: "sort-head-".to_string(),
            row: "sort-row".to_string(),
            column: "sort-column-".to_string(),
            data: "sort-data".to_string(),
        }
    }
}

impl MarkerVocabulary {
    /// Parse every marker on an element into a descriptor.
    ///
    /// When an element carries the same kind of marker more than once, the
    /// first token wins.
    pub fn describe<S: AsRef<str>>(&self, classes: &[S]) -> NodeMarkers {
        let mut markers = NodeMarkers::default();
        for class in classes {
            let class = class.as_ref();
            if markers.header.is_none() {
                if let Some(id) = class.strip_prefix(self.header.as_str()) {
                    markers.header = Some(id.to_string());
                    continue;
                }
            }
            if markers.column.is_none() {
                if let Some(id) = class.strip_prefix(self.column.as_str()) {
                    markers.column = Some(id.to_string());
                    continue;
                }
            }
            if markers.row.is_none() {
                if let Some(suffix) = class.strip_prefix(self.row.as_str()) {
                    markers.row = Some(parse_row_index(suffix));
                    continue;
                }
            }
            if markers.data.is_none() {
                if let Some(suffix) = class.strip_prefix(self.data.as_str()) {
                    let suffix = suffix.strip_prefix('-').unwrap_or(suffix);
                    markers.data = Some(ValueType::from_suffix(suffix));
                }
            }
        }
        markers
    }
}

/// Group slot index of a row marker suffix.
///
/// A missing or unparseable suffix is slot 1. Leading digits are used when
/// the suffix has trailing garbage.
fn parse_row_index(suffix: &str) -> u32 {
    let suffix = suffix.strip_prefix('-').unwrap_or(suffix);
    let digits: String = suffix.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().unwrap_or(1)
}

/// Typed view of one element's markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeMarkers {
    /// Column id of a header marker.
    pub header: Option<String>,
    /// Group slot index of a row marker.
    pub row: Option<u32>,
    /// Column id of a column marker.
    pub column: Option<String>,
    /// Declared type of a data marker.
    pub data: Option<ValueType>,
}

impl NodeMarkers {
    /// Whether the element carries no recognized marker.
    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.row.is_none() && self.column.is_none() && self.data.is_none()
    }
}

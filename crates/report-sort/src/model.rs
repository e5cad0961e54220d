//! In-memory report model built by the scanner.
//!
//! The model owns handles to host elements between scans. The engine
//! reorders [`RowGroup`]s in place and the binder writes that order back
//! into the host tree; neither creates nor drops element handles.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::Error;

/// Default date pattern for `date` columns without an explicit format.
pub const DEFAULT_DATE_FORMAT: &str = "DD/MM/YYYY";

/// Sort direction, plus the unset state used by affordances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Not sorted by this column.
    None,
    /// Ascending.
    #[default]
    Asc,
    /// Descending: the ascending order reversed.
    Desc,
}

impl Direction {
    /// The state an affordance moves to when activated.
    ///
    /// `None` goes to `default`, and the two sort directions toggle.
    pub fn next(self, default: Direction) -> Direction {
        match self {
            Direction::None => default,
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }

    /// The lowercase name used in host attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::None => "none",
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Direction::None),
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            _ => Err(Error::UnknownDirection(s.to_string())),
        }
    }
}

/// Declared type of a data marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    /// Case-insensitive, whitespace-insensitive text.
    #[default]
    Text,
    /// Floating point number, tolerant of `,` `%` and currency symbols.
    Number,
    /// Date with an optional explicit pattern.
    Date(Option<String>),
}

impl ValueType {
    /// Parse the suffix that follows the data marker prefix.
    ///
    /// `""` and `"text"` are text, `"number"` is a number, anything starting
    /// with `"date"` is a date whose pattern is whatever follows the first
    /// `-`, with `_` standing for a space. Unknown suffixes fall back to text.
    pub fn from_suffix(suffix: &str) -> Self {
        let suffix = suffix.trim();
        if suffix.eq_ignore_ascii_case("number") {
            return ValueType::Number;
        }
        if suffix.get(..4).is_some_and(|head| head.eq_ignore_ascii_case("date")) {
            let pattern = suffix
                .split_once('-')
                .map(|(_, pattern)| pattern.replace('_', " "))
                .filter(|pattern| !pattern.is_empty());
            return ValueType::Date(pattern);
        }
        ValueType::Text
    }

    /// Resolve the pattern for a date type, falling back to `default`.
    pub fn date_pattern<'a>(&'a self, default: &'a str) -> Option<&'a str> {
        match self {
            ValueType::Date(Some(pattern)) => Some(pattern),
            ValueType::Date(None) => Some(default),
            _ => None,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Text => f.write_str("text"),
            ValueType::Number => f.write_str("number"),
            ValueType::Date(None) => f.write_str("date"),
            ValueType::Date(Some(pattern)) => write!(f, "date-{pattern}"),
        }
    }
}

/// One discovered header marker.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderColumn<N> {
    /// The header element.
    pub element: N,
    /// The affordance element attached under the header.
    pub affordance: N,
    /// Column id taken from the marker suffix. May be empty.
    pub id: String,
    /// Current direction of this column's affordance.
    pub order: Direction,
}

/// Position of a separator relative to its group's data row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparatorPosition {
    /// Encountered before the data row.
    Pre,
    /// Encountered after the data row.
    Post,
}

/// A raw row in a group that carries no column markers.
#[derive(Debug, Clone, PartialEq)]
pub struct SeparatorRow<N> {
    pub element: N,
    pub position: SeparatorPosition,
}

/// A sortable cell of a data row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowColumn<N> {
    pub element: N,
    /// Matches a [`HeaderColumn::id`] to take part in sorting.
    pub id: String,
    /// Normalized value; multiple data markers are joined with `", "`.
    pub value: String,
    pub value_type: ValueType,
}

/// The row of a group that carries column markers.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRow<N> {
    pub element: N,
    pub columns: Vec<RowColumn<N>>,
}

impl<N> DataRow<N> {
    /// Find the first column with the given id.
    pub fn column(&self, id: &str) -> Option<&RowColumn<N>> {
        self.columns.iter().find(|c| c.id == id)
    }
}

/// N consecutive raw rows that move together when sorting.
#[derive(Debug, Clone, PartialEq)]
pub struct RowGroup<N> {
    /// Position among groups at scan time.
    pub group_id: usize,
    pub data_row: Option<DataRow<N>>,
    /// Separators in their original relative order.
    pub separators: Vec<SeparatorRow<N>>,
}

impl<N: Copy> RowGroup<N> {
    /// Look up a column of this group's data row.
    pub fn column(&self, id: &str) -> Option<&RowColumn<N>> {
        self.data_row.as_ref().and_then(|row| row.column(id))
    }

    /// All raw row elements of the group in render order: pre separators,
    /// the data row, then post separators.
    pub fn elements(&self) -> Vec<N> {
        let mut out = Vec::with_capacity(self.separators.len() + 1);
        out.extend(self.separators_at(SeparatorPosition::Pre));
        out.extend(self.data_row.as_ref().map(|row| row.element));
        out.extend(self.separators_at(SeparatorPosition::Post));
        out
    }

    /// Separators at the given position, in original order.
    pub fn separators_at(&self, position: SeparatorPosition) -> impl Iterator<Item = N> + '_ {
        self.separators
            .iter()
            .filter(move |s| s.position == position)
            .map(|s| s.element)
    }
}

/// Headers and row groups discovered under one root.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportModel<N> {
    /// Headers in processing order (reverse of document order).
    pub headers: Vec<HeaderColumn<N>>,
    pub groups: Vec<RowGroup<N>>,
    /// Raw rows per group.
    pub group_span: usize,
}

impl<N> Default for ReportModel<N> {
    fn default() -> Self {
        Self {
            headers: Vec::new(),
            groups: Vec::new(),
            group_span: 1,
        }
    }
}

impl<N: Copy + PartialEq> ReportModel<N> {
    /// Whether nothing sortable was found.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty() && self.groups.is_empty()
    }

    /// Find a header by column id.
    pub fn header(&self, id: &str) -> Option<&HeaderColumn<N>> {
        self.headers.iter().find(|h| h.id == id)
    }

    /// Find the header owning an affordance or header element.
    pub fn header_for_element(&self, element: N) -> Option<&HeaderColumn<N>> {
        self.headers
            .iter()
            .find(|h| h.affordance == element || h.element == element)
    }

    /// Whether any group's data row has a column with this id.
    pub fn has_column(&self, id: &str) -> bool {
        self.groups.iter().any(|g| g.column(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_transitions() {
        assert_eq!(Direction::None.next(Direction::Asc), Direction::Asc);
        assert_eq!(Direction::None.next(Direction::Desc), Direction::Desc);
        assert_eq!(Direction::Asc.next(Direction::Desc), Direction::Desc);
        assert_eq!(Direction::Desc.next(Direction::Asc), Direction::Asc);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("ASC".parse::<Direction>().unwrap(), Direction::Asc);
        assert_eq!(" desc ".parse::<Direction>().unwrap(), Direction::Desc);
        assert!("sideways".parse::<Direction>().is_err());
    }

    #[test]
    fn test_value_type_suffixes() {
        assert_eq!(ValueType::from_suffix(""), ValueType::Text);
        assert_eq!(ValueType::from_suffix("text"), ValueType::Text);
        assert_eq!(ValueType::from_suffix("number"), ValueType::Number);
        assert_eq!(ValueType::from_suffix("date"), ValueType::Date(None));
        assert_eq!(
            ValueType::from_suffix("date-DD/MM/YYYY_HH:mm"),
            ValueType::Date(Some("DD/MM/YYYY HH:mm".to_string()))
        );
        assert_eq!(ValueType::from_suffix("currency"), ValueType::Text);
    }

    #[test]
    fn test_date_pattern_resolution() {
        assert_eq!(ValueType::Date(None).date_pattern("YYYY"), Some("YYYY"));
        assert_eq!(
            ValueType::Date(Some("MM-DD".into())).date_pattern("YYYY"),
            Some("MM-DD")
        );
        assert_eq!(ValueType::Number.date_pattern("YYYY"), None);
    }

    #[test]
    fn test_group_elements_render_order() {
        let group = RowGroup {
            group_id: 0,
            data_row: Some(DataRow {
                element: 2u32,
                columns: Vec::new(),
            }),
            separators: vec![
                SeparatorRow { element: 1, position: SeparatorPosition::Pre },
                SeparatorRow { element: 3, position: SeparatorPosition::Post },
                SeparatorRow { element: 0, position: SeparatorPosition::Pre },
            ],
        };
        assert_eq!(group.elements(), vec![1, 0, 2, 3]);
    }
}

//! Type-aware row group sorting.
//!
//! The engine orders [`RowGroup`]s by one column. Each comparison resolves a
//! type for its two operands: numbers compare numerically and dates
//! chronologically, and whenever either operand fails to parse the pair
//! falls back to text. The fallback only applies to that one comparison.
//!
//! Descending order is the ascending order reversed, so runs of equal keys
//! come out reversed as well.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::NaiveDateTime;
use report_sort_core::logging::targets;

use crate::date_format::DatePattern;
use crate::model::{DEFAULT_DATE_FORMAT, Direction, RowColumn, RowGroup, ValueType};
use crate::normalize::parse_number;

/// Sorts row groups by a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortEngine {
    date_format: String,
}

impl Default for SortEngine {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMAT)
    }
}

impl SortEngine {
    /// Create an engine using `date_format` for dates without a pattern.
    pub fn new(date_format: impl Into<String>) -> Self {
        Self {
            date_format: date_format.into(),
        }
    }

    /// Default date pattern.
    pub fn date_format(&self) -> &str {
        &self.date_format
    }

    /// Sort `groups` by `column` and return the new order.
    ///
    /// Unknown columns return the input unchanged. `Direction::None` sorts
    /// ascending.
    pub fn sort<N: Copy>(
        &self,
        mut groups: Vec<RowGroup<N>>,
        column: &str,
        direction: Direction,
    ) -> Vec<RowGroup<N>> {
        self.sort_in_place(&mut groups, column, direction);
        groups
    }

    /// Sort `groups` in place.
    ///
    /// Returns `false` without touching `groups` when no group's data row
    /// has `column`.
    #[tracing::instrument(skip(self, groups), target = "report_sort::engine", level = "debug")]
    pub fn sort_in_place<N: Copy>(
        &self,
        groups: &mut Vec<RowGroup<N>>,
        column: &str,
        direction: Direction,
    ) -> bool {
        if !groups.iter().any(|group| group.column(column).is_some()) {
            tracing::debug!(target: targets::ENGINE, column, "No data for column, order unchanged");
            return false;
        }

        let mut patterns = PatternCache::default();
        let keys: Vec<Option<SortKey>> = groups
            .iter()
            .map(|group| {
                group
                    .column(column)
                    .map(|col| self.key(&col.value, &col.value_type, &mut patterns))
            })
            .collect();

        let mut order = stable_order(keys.len(), |a, b| compare_keys(keys[a].as_ref(), keys[b].as_ref()));
        if direction == Direction::Desc {
            order.reverse();
        }

        let mut slots: Vec<Option<RowGroup<N>>> = groups.drain(..).map(Some).collect();
        groups.extend(order.into_iter().filter_map(|index| slots[index].take()));

        tracing::debug!(
            target: targets::ENGINE,
            column,
            %direction,
            groups = groups.len(),
            "Sorted groups"
        );
        true
    }

    /// Compare two columns with the per-comparison type policy.
    pub fn compare<N>(&self, a: &RowColumn<N>, b: &RowColumn<N>) -> Ordering {
        let mut patterns = PatternCache::default();
        let a = self.key(&a.value, &a.value_type, &mut patterns);
        let b = self.key(&b.value, &b.value_type, &mut patterns);
        compare_keys(Some(&a), Some(&b))
    }

    fn key(&self, value: &str, value_type: &ValueType, patterns: &mut PatternCache) -> SortKey {
        let mut key = SortKey {
            kind: value_type.clone(),
            text: value.to_lowercase(),
            number: None,
            date: None,
        };
        match value_type {
            ValueType::Number => key.number = parse_number(value),
            ValueType::Date(_) => {
                let source = value_type.date_pattern(&self.date_format).unwrap_or(&self.date_format);
                let pattern = patterns.get(source);
                key.date = if value.is_empty() {
                    pattern.sentinel().and_then(|sentinel| pattern.parse(&sentinel))
                } else {
                    pattern.parse(value)
                };
            }
            ValueType::Text => {}
        }
        key
    }
}

/// Compiled patterns for one sort pass.
#[derive(Default)]
struct PatternCache(HashMap<String, DatePattern>);

impl PatternCache {
    fn get(&mut self, source: &str) -> &DatePattern {
        self.0
            .entry(source.to_string())
            .or_insert_with(|| DatePattern::compile(source))
    }
}

/// Precomputed comparison inputs for one cell.
#[derive(Debug, Clone)]
struct SortKey {
    kind: ValueType,
    text: String,
    number: Option<f64>,
    date: Option<NaiveDateTime>,
}

/// Groups without the column sort before every group with it.
fn compare_keys(a: Option<&SortKey>, b: Option<&SortKey>) -> Ordering {
    let (a, b) = match (a, b) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        (Some(a), Some(b)) => (a, b),
    };

    if a.kind == b.kind {
        match a.kind {
            ValueType::Number => match (a.number, b.number) {
                (Some(x), Some(y)) => return x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => downgraded(a, b),
            },
            ValueType::Date(_) => match (a.date, b.date) {
                (Some(x), Some(y)) => return x.cmp(&y),
                _ => downgraded(a, b),
            },
            ValueType::Text => {}
        }
    }

    a.text.cmp(&b.text)
}

fn downgraded(a: &SortKey, b: &SortKey) {
    tracing::trace!(
        target: targets::ENGINE,
        kind = %a.kind,
        a = %a.text,
        b = %b.text,
        "Comparing as text"
    );
}

/// Stable merge sort of `0..len`.
///
/// The per-comparison fallback does not always give a total order, so this
/// never assumes one.
fn stable_order(len: usize, mut compare: impl FnMut(usize, usize) -> Ordering) -> Vec<usize> {
    let mut order: Vec<usize> = (0..len).collect();
    let mut buffer = order.clone();
    let mut width = 1;

    while width < len {
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut i, mut j, mut k) = (start, mid, start);
            while i < mid && j < end {
                if compare(order[j], order[i]) == Ordering::Less {
                    buffer[k] = order[j];
                    j += 1;
                } else {
                    buffer[k] = order[i];
                    i += 1;
                }
                k += 1;
            }
            buffer[k..k + (mid - i)].copy_from_slice(&order[i..mid]);
            k += mid - i;
            buffer[k..end].copy_from_slice(&order[j..end]);
            start = end;
        }
        std::mem::swap(&mut order, &mut buffer);
        width *= 2;
    }

    order
}

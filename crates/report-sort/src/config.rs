//! Sorter configuration.
//!
//! Options can be built in code or loaded from TOML. Keys use the same
//! camelCase spelling hosts pass in their option objects:
//!
//! ```toml
//! order = "desc"
//! orderID = "date"
//! dateFormat = "YYYY-MM-DD"
//! alternatingRowMarker = "zebra"
//!
//! [markers]
//! header = "sort-head-"
//! ```
//!
//! Hooks are code, so they are attached to the controller instead, see
//! [`SortController::on_pre_sort`](crate::SortController::on_pre_sort).

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::marker::MarkerVocabulary;
use crate::model::{DEFAULT_DATE_FORMAT, Direction};

/// Default debounce window for affordance activations.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(100);

/// Options recognized by the sorter.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct SortConfig {
    /// Direction applied when an unsorted column is activated.
    pub order: Direction,
    /// Column sorted automatically at init, if any.
    #[serde(rename = "orderID")]
    pub order_id: Option<String>,
    /// Pattern for `date` columns without an explicit one.
    pub date_format: String,
    /// Marker applied to odd render positions. Empty disables it.
    pub alternating_row_marker: String,
    /// Marker placed on each affordance element.
    pub affordance_marker: String,
    /// Marker placed on an affordance while its activation is pending.
    pub affordance_loading_marker: String,
    /// Debounce window in milliseconds.
    pub debounce_ms: u64,
    /// Marker vocabulary.
    pub markers: MarkerVocabulary,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            order: Direction::Asc,
            order_id: None,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            alternating_row_marker: "altReportRow".to_string(),
            affordance_marker: "imgArrow".to_string(),
            affordance_loading_marker: "imgArrowLoading".to_string(),
            debounce_ms: millis(DEFAULT_DEBOUNCE),
            markers: MarkerVocabulary::default(),
        }
    }
}

impl SortConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let config: SortConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values serde cannot rule out on its own.
    pub fn validate(&self) -> Result<()> {
        if self.order == Direction::None {
            return Err(Error::invalid_option("order", "must be \"asc\" or \"desc\""));
        }
        if self.date_format.trim().is_empty() {
            return Err(Error::invalid_option("dateFormat", "must not be empty"));
        }
        let markers = [
            ("markers.header", &self.markers.header),
            ("markers.row", &self.markers.row),
            ("markers.column", &self.markers.column),
            ("markers.data", &self.markers.data),
        ];
        for (option, prefix) in markers {
            if prefix.is_empty() {
                return Err(Error::invalid_option(option, "marker prefix must not be empty"));
            }
        }
        Ok(())
    }

    /// The debounce window.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Set the default direction.
    pub fn with_order(mut self, order: Direction) -> Self {
        self.order = order;
        self
    }

    /// Sort by `column` at init.
    pub fn with_order_id(mut self, column: impl Into<String>) -> Self {
        self.order_id = Some(column.into());
        self
    }

    /// Set the default date pattern.
    pub fn with_date_format(mut self, pattern: impl Into<String>) -> Self {
        self.date_format = pattern.into();
        self
    }

    /// Set the alternating-row marker. Empty disables it.
    pub fn with_alternating_row_marker(mut self, marker: impl Into<String>) -> Self {
        self.alternating_row_marker = marker.into();
        self
    }

    /// Set the debounce window.
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce_ms = millis(window);
        self
    }
}

/// Whole milliseconds of `window`, saturating at `u64::MAX`.
fn millis(window: Duration) -> u64 {
    u64::try_from(window.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SortConfig::default();
        assert_eq!(config.order, Direction::Asc);
        assert_eq!(config.date_format, "DD/MM/YYYY");
        assert_eq!(config.alternating_row_marker, "altReportRow");
        assert_eq!(config.debounce(), Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml() {
        let config = SortConfig::from_toml_str(
            r#"
            order = "desc"
            orderID = "total"
            dateFormat = "YYYY-MM-DD"
            alternatingRowMarker = ""
            debounceMs = 250

            [markers]
            header = "h-"
            "#,
        )
        .unwrap();

        assert_eq!(config.order, Direction::Desc);
        assert_eq!(config.order_id.as_deref(), Some("total"));
        assert_eq!(config.date_format, "YYYY-MM-DD");
        assert!(config.alternating_row_marker.is_empty());
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.markers.header, "h-");
        assert_eq!(config.markers.row, "sort-row");
    }

    #[test]
    fn test_empty_toml_is_default() {
        assert_eq!(SortConfig::from_toml_str("").unwrap(), SortConfig::default());
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(matches!(
            SortConfig::from_toml_str("colour = \"red\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_rejects_none_order() {
        assert!(matches!(
            SortConfig::from_toml_str("order = \"none\""),
            Err(Error::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_builder() {
        let config = SortConfig::new()
            .with_order(Direction::Desc)
            .with_order_id("name")
            .with_date_format("YYYY")
            .with_alternating_row_marker("odd")
            .with_debounce(Duration::from_millis(5));

        assert_eq!(config.order, Direction::Desc);
        assert_eq!(config.order_id.as_deref(), Some("name"));
        assert_eq!(config.alternating_row_marker, "odd");
        assert_eq!(config.debounce_ms, 5);
    }

    #[test]
    fn test_huge_debounce_saturates() {
        let config = SortConfig::new().with_debounce(Duration::MAX);
        assert_eq!(config.debounce_ms, u64::MAX);
        assert_eq!(config.debounce(), Duration::from_millis(u64::MAX));
    }
}

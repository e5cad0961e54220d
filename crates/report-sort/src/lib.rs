//! Marker-driven, type-aware sorting for tree-structured reports.
//!
//! Reports declare their structure with marker tokens on their elements.
//! This crate reads those markers into a typed model and sorts the report by
//! any marked column:
//!
//! - **Markers**: `sort-head-<id>`, `sort-row[-<n>]`, `sort-column-<id>` and
//!   `sort-data[-<type>]`, with configurable prefixes
//! - **Scanner**: Builds headers, row groups and normalized cell values
//! - **Engine**: Stable text, number and date comparison with per-comparison
//!   fallback to text
//! - **Binder**: Re-appends rows in the new order, keeping separator rows
//!   around their data row and reapplying alternating-row markers
//! - **Controller**: Per-column direction state, debounced activation and
//!   pre/post sort hooks
//! - **Registry**: One controller per report root
//!
//! # Example
//!
//! ```
//! use report_sort::prelude::*;
//! use report_sort_core::NodeTree;
//!
//! let mut tree = NodeTree::new();
//! let table = tree.create("table");
//! let header = tree.create_child(table, "th").unwrap();
//! tree.set_class_name(header, "sort-head-total").unwrap();
//!
//! let mut rows = Vec::new();
//! for total in ["$1,200.50", "300", "45%"] {
//!     let row = tree.create_child(table, "tr").unwrap();
//!     tree.set_class_name(row, "sort-row").unwrap();
//!     let cell = tree.create_child(row, "td").unwrap();
//!     tree.set_class_name(cell, "sort-column-total sort-data-number").unwrap();
//!     tree.set_text(cell, total).unwrap();
//!     rows.push(row);
//! }
//!
//! let mut controller = SortController::new(table, SortConfig::default()).unwrap();
//! controller.init(&mut tree).unwrap();
//! controller.sort_data(&mut tree, Some("total"), Some(Direction::Asc)).unwrap();
//!
//! let order: Vec<_> = tree.children(table).unwrap()[1..].to_vec();
//! assert_eq!(order, vec![rows[2], rows[1], rows[0]]);
//! ```

pub mod binder;
pub mod config;
pub mod controller;
pub mod date_format;
pub mod engine;
pub mod host;
pub mod marker;
pub mod model;
pub mod normalize;
pub mod registry;
pub mod scanner;

mod error;

pub use config::SortConfig;
pub use controller::SortController;
pub use date_format::DatePattern;
pub use engine::SortEngine;
pub use error::{Error, HookError, HookResult, HookStage, Result};
pub use host::HostTree;
pub use marker::{MarkerVocabulary, NodeMarkers};
pub use model::{
    DataRow, Direction, HeaderColumn, ReportModel, RowColumn, RowGroup, SeparatorPosition,
    SeparatorRow, ValueType,
};
pub use normalize::normalize;
pub use registry::{SharedController, SortRegistry};

/// Prelude module with commonly used types.
pub mod prelude {
    pub use crate::config::SortConfig;
    pub use crate::controller::SortController;
    pub use crate::error::{Error, HookResult, Result};
    pub use crate::host::HostTree;
    pub use crate::model::{Direction, ReportModel, ValueType};
    pub use crate::registry::SortRegistry;
}

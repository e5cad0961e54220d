//! Core systems for report-sort.
//!
//! This crate provides the substrate the report sorter runs on:
//!
//! - **Node Tree**: Arena-backed element tree with markers, text, attributes
//!   and a per-node side-table
//! - **Deferred Slot**: Single pending action with cancel-and-replace, used
//!   for debouncing
//! - **Logging**: `tracing` targets and a tree debug formatter
//!
//! # Example
//!
//! ```
//! use report_sort_core::{DeferredSlot, NodeTree};
//! use std::time::Duration;
//!
//! let mut tree = NodeTree::new();
//! let body = tree.create("tbody");
//! let first = tree.create_child(body, "tr").unwrap();
//! let second = tree.create_child(body, "tr").unwrap();
//!
//! // Move the first row to the end.
//! tree.append_child(body, first).unwrap();
//! assert_eq!(tree.children(body).unwrap(), &[second, first]);
//!
//! let mut slot = DeferredSlot::new(Duration::from_millis(100));
//! slot.schedule("sort");
//! assert!(slot.is_pending());
//! ```

mod error;
pub mod logging;
pub mod node;
mod scheduler;

pub use error::{CoreError, Result, SchedulerError};
pub use logging::{TreeDebug, TreeFormatOptions, TreeStyle};
pub use node::{NodeId, NodeTree, TreeError, TreeId, TreeResult};
pub use scheduler::{DeferredSlot, DeferredTaskId};

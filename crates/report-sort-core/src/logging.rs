//! Logging and debugging facilities for report-sort.
//!
//! This module provides:
//! - Target names for filtering `tracing` output per subsystem
//! - Debug visualization for node trees
//!
//! # Tracing Integration
//!
//! report-sort uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("report_sort=debug,report_sort_core=trace")
//!     .init();
//! ```
//!
//! # Debug Visualization
//!
//! Use [`TreeDebug`] to dump a report subtree with its markers:
//!
//! ```
//! use report_sort_core::{NodeTree, TreeDebug};
//!
//! let mut tree = NodeTree::new();
//! let table = tree.create("table");
//! let row = tree.create_child(table, "tr").unwrap();
//! tree.set_class_name(row, "sort-row-1").unwrap();
//!
//! let dump = TreeDebug::new().format_subtree(&tree, table).unwrap();
//! assert!(dump.contains("tr.sort-row-1"));
//! ```

use std::fmt::Write as FmtWrite;

use crate::node::{NodeId, NodeTree, TreeResult};

/// `tracing` targets, one per subsystem, for use in filter directives.
pub mod targets {
    /// Node tree target.
    pub const TREE: &str = "report_sort_core::tree";
    /// Deferred scheduling target.
    pub const SCHEDULER: &str = "report_sort_core::scheduler";
    /// Marker scanning target.
    pub const SCAN: &str = "report_sort::scan";
    /// Sort engine target.
    pub const ENGINE: &str = "report_sort::engine";
    /// Layout binder target.
    pub const BINDER: &str = "report_sort::binder";
    /// Interaction controller target.
    pub const CONTROLLER: &str = "report_sort::controller";
    /// Controller registry target.
    pub const REGISTRY: &str = "report_sort::registry";
}

/// Style options for tree visualization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeStyle {
    /// `+--` and `` `-- `` branches.
    Ascii,
    /// Box-drawing branches.
    #[default]
    Unicode,
    /// Whole subtree on one line.
    Compact,
}

/// Configuration for tree debug output.
#[derive(Debug, Clone)]
pub struct TreeFormatOptions {
    /// Branch drawing.
    pub style: TreeStyle,
    /// Print slot ids.
    pub show_ids: bool,
    /// Print each node's own text.
    pub show_text: bool,
    /// Print side-table keys.
    pub show_data: bool,
    /// Stop descending below this depth.
    pub max_depth: Option<usize>,
    /// Spaces per level.
    pub indent_size: usize,
}

impl Default for TreeFormatOptions {
    fn default() -> Self {
        Self {
            style: TreeStyle::default(),
            show_ids: true,
            show_text: true,
            show_data: false,
            max_depth: None,
            indent_size: 2,
        }
    }
}

impl TreeFormatOptions {
    /// Everything, including side-table keys.
    pub fn detailed() -> Self {
        Self {
            show_data: true,
            ..Default::default()
        }
    }

    /// Tags and markers only.
    pub fn minimal() -> Self {
        Self {
            show_ids: false,
            show_text: false,
            show_data: false,
            ..Default::default()
        }
    }
}

/// Renders a node subtree as an indented outline.
#[derive(Debug, Clone, Default)]
pub struct TreeDebug {
    options: TreeFormatOptions,
}

impl TreeDebug {
    /// Default options.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: TreeFormatOptions) -> Self {
        Self { options }
    }

    /// Format a subtree starting from `root`.
    pub fn format_subtree(&self, tree: &NodeTree, root: NodeId) -> TreeResult<String> {
        let mut output = String::new();
        self.format_subtree_into(tree, root, 0, true, &mut output)?;
        Ok(output)
    }

    fn format_subtree_into(
        &self,
        tree: &NodeTree,
        id: NodeId,
        depth: usize,
        is_last: bool,
        output: &mut String,
    ) -> TreeResult<()> {
        if let Some(max) = self.options.max_depth {
            if depth > max {
                return Ok(());
            }
        }

        output.push_str(&self.build_prefix(depth, is_last));

        // tag.class1.class2
        output.push_str(tree.tag(id)?);
        for class in tree.classes(id)? {
            output.push('.');
            output.push_str(class);
        }

        if self.options.show_ids {
            let _ = write!(output, " [{:?}]", id);
        }

        if self.options.show_text {
            let text = tree.text(id)?;
            if !text.is_empty() {
                let _ = write!(output, " {:?}", text);
            }
        }

        output.push('\n');

        if self.options.show_data {
            let keys = tree.data_keys(id)?;
            if !keys.is_empty() {
                let data_prefix = self.build_data_prefix(depth);
                for key in keys {
                    let _ = writeln!(output, "{}  .{}", data_prefix, key);
                }
            }
        }

        let children = tree.children(id)?;
        let child_count = children.len();
        for (i, &child_id) in children.iter().enumerate() {
            self.format_subtree_into(tree, child_id, depth + 1, i + 1 == child_count, output)?;
        }

        Ok(())
    }

    /// Build the prefix string for a tree node.
    fn build_prefix(&self, depth: usize, is_last: bool) -> String {
        if depth == 0 {
            return String::new();
        }

        let (branch, corner, last) = match self.options.style {
            TreeStyle::Ascii => ("|", "+--", "`--"),
            TreeStyle::Unicode => (
                "\u{2502}",
                "\u{251c}\u{2500}\u{2500}",
                "\u{2514}\u{2500}\u{2500}",
            ),
            TreeStyle::Compact => ("", "-", "-"),
        };

        let mut prefix = String::new();
        for _ in 0..(depth - 1) {
            prefix.push_str(branch);
            for _ in 0..self.options.indent_size {
                prefix.push(' ');
            }
        }
        prefix.push_str(if is_last { last } else { corner });
        prefix.push(' ');
        prefix
    }

    /// Build the prefix for side-table lines.
    fn build_data_prefix(&self, depth: usize) -> String {
        let branch = match self.options.style {
            TreeStyle::Ascii => "|",
            TreeStyle::Unicode => "\u{2502}",
            TreeStyle::Compact => "",
        };

        let mut prefix = String::new();
        for _ in 0..depth {
            prefix.push_str(branch);
            for _ in 0..self.options.indent_size {
                prefix.push(' ');
            }
        }
        prefix
    }
}

//! Shared report builders for integration tests.

#![allow(dead_code)]

use report_sort_core::{NodeId, NodeTree};

pub fn setup() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

/// A table with a header row and a body of marked rows.
pub struct Report {
    pub tree: NodeTree,
    pub root: NodeId,
    pub body: NodeId,
}

impl Report {
    pub fn new(headers: &[&str]) -> Self {
        let mut tree = NodeTree::new();
        let root = tree.create("table");
        let head = tree.create_child(root, "tr").unwrap();
        for id in headers {
            let th = tree.create_child(head, "th").unwrap();
            tree.set_class_name(th, &format!("sort-head-{id}")).unwrap();
            tree.set_text(th, *id).unwrap();
        }
        let body = tree.create_child(root, "tbody").unwrap();
        Self { tree, root, body }
    }

    /// Append a data row. Each cell is `(column id, data marker, text)`.
    pub fn row(&mut self, class: &str, cells: &[(&str, &str, &str)]) -> NodeId {
        let row = self.tree.create_child(self.body, "tr").unwrap();
        self.tree.set_class_name(row, class).unwrap();
        for (column, data, text) in cells {
            let td = self.tree.create_child(row, "td").unwrap();
            self.tree
                .set_class_name(td, &format!("sort-column-{column}"))
                .unwrap();
            let span = self.tree.create_child(td, "span").unwrap();
            self.tree.set_class_name(span, data).unwrap();
            self.tree.set_text(span, *text).unwrap();
        }
        row
    }

    /// Append a row without column markers.
    pub fn separator(&mut self, class: &str) -> NodeId {
        let row = self.tree.create_child(self.body, "tr").unwrap();
        self.tree.set_class_name(row, class).unwrap();
        let td = self.tree.create_child(row, "td").unwrap();
        self.tree.set_text(td, "----").unwrap();
        row
    }

    /// Append single-cell rows for `column` and return them.
    pub fn column_rows(&mut self, column: &str, data: &str, values: &[&str]) -> Vec<NodeId> {
        values
            .iter()
            .map(|value| self.row("sort-row", &[(column, data, *value)]))
            .collect()
    }

    pub fn body_order(&self) -> Vec<NodeId> {
        self.tree.children(self.body).unwrap().to_vec()
    }

    /// Header element at `header_index` in document order.
    pub fn header(&self, header_index: usize) -> NodeId {
        let head = self.tree.children(self.root).unwrap()[0];
        self.tree.children(head).unwrap()[header_index]
    }

    pub fn affordance(&self, header_index: usize) -> NodeId {
        let th = self.header(header_index);
        *self.tree.children(th).unwrap().last().unwrap()
    }
}

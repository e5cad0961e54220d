//! The host tree adapter.
//!
//! The sorter never owns the rendered report. It reaches the report only
//! through [`HostTree`], the small set of primitives it needs: descendant
//! queries, marker reads and writes, detach/append, text reads, attributes,
//! activation listeners and a per-element side-table. [`NodeTree`] from
//! `report-sort-core` implements it directly.

use std::fmt::Debug;
use std::hash::Hash;

use report_sort_core::{NodeId, NodeTree, TreeId, TreeResult};

/// Primitives the sorter needs from the tree holding a report.
pub trait HostTree {
    /// Handle to one element of the tree.
    type Node: Copy + Eq + Hash + Debug + Send + 'static;

    /// Identity of this tree, so roots from different trees never collide.
    fn tree_id(&self) -> TreeId;

    /// All descendants of `node` in document order, excluding `node`.
    fn descendants(&self, node: Self::Node) -> TreeResult<Vec<Self::Node>>;

    /// Parent of `node`, `None` when detached.
    fn parent(&self, node: Self::Node) -> TreeResult<Option<Self::Node>>;

    /// Marker tokens on `node`.
    fn markers(&self, node: Self::Node) -> TreeResult<Vec<String>>;

    /// Add a marker token.
    fn add_marker(&mut self, node: Self::Node, marker: &str) -> TreeResult<()>;

    /// Remove a marker token if present.
    fn remove_marker(&mut self, node: Self::Node, marker: &str) -> TreeResult<()>;

    /// Create a detached element.
    fn create_element(&mut self, tag: &str) -> Self::Node;

    /// Destroy an element and its subtree.
    fn destroy(&mut self, node: Self::Node) -> TreeResult<()>;

    /// Detach `node` from its parent, keeping it alive.
    fn detach(&mut self, node: Self::Node) -> TreeResult<()>;

    /// Append `child` as the last child of `parent`.
    fn append_child(&mut self, parent: Self::Node, child: Self::Node) -> TreeResult<()>;

    /// Text content of `node` and its descendants.
    fn text_content(&self, node: Self::Node) -> TreeResult<String>;

    /// Form value of `node`, for input-like elements.
    fn form_value(&self, node: Self::Node) -> TreeResult<Option<String>>;

    /// Set a presentational attribute.
    fn set_attribute(&mut self, node: Self::Node, key: &str, value: &str) -> TreeResult<()>;

    /// Register a click-style activation listener.
    fn listen_activation(&mut self, node: Self::Node) -> TreeResult<()>;

    /// Read a side-table entry.
    fn data(&self, node: Self::Node, key: &str) -> TreeResult<Option<String>>;

    /// Write a side-table entry.
    fn set_data(&mut self, node: Self::Node, key: &str, value: &str) -> TreeResult<()>;

    /// Remove a side-table entry.
    fn remove_data(&mut self, node: Self::Node, key: &str) -> TreeResult<()>;
}

impl HostTree for NodeTree {
    type Node = NodeId;

    fn tree_id(&self) -> TreeId {
        self.id()
    }

    fn descendants(&self, node: NodeId) -> TreeResult<Vec<NodeId>> {
        NodeTree::descendants(self, node)
    }

    fn parent(&self, node: NodeId) -> TreeResult<Option<NodeId>> {
        NodeTree::parent(self, node)
    }

    fn markers(&self, node: NodeId) -> TreeResult<Vec<String>> {
        self.classes(node).map(<[String]>::to_vec)
    }

    fn add_marker(&mut self, node: NodeId, marker: &str) -> TreeResult<()> {
        self.add_class(node, marker)
    }

    fn remove_marker(&mut self, node: NodeId, marker: &str) -> TreeResult<()> {
        self.remove_class(node, marker).map(|_| ())
    }

    fn create_element(&mut self, tag: &str) -> NodeId {
        self.create(tag)
    }

    fn destroy(&mut self, node: NodeId) -> TreeResult<()> {
        NodeTree::destroy(self, node)
    }

    fn detach(&mut self, node: NodeId) -> TreeResult<()> {
        NodeTree::detach(self, node)
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        NodeTree::append_child(self, parent, child)
    }

    fn text_content(&self, node: NodeId) -> TreeResult<String> {
        NodeTree::text_content(self, node)
    }

    fn form_value(&self, node: NodeId) -> TreeResult<Option<String>> {
        self.value(node).map(|v| v.map(str::to_string))
    }

    fn set_attribute(&mut self, node: NodeId, key: &str, value: &str) -> TreeResult<()> {
        NodeTree::set_attribute(self, node, key, value)
    }

    fn listen_activation(&mut self, node: NodeId) -> TreeResult<()> {
        NodeTree::listen_activation(self, node)
    }

    fn data(&self, node: NodeId, key: &str) -> TreeResult<Option<String>> {
        NodeTree::data(self, node, key).map(|v| v.map(str::to_string))
    }

    fn set_data(&mut self, node: NodeId, key: &str, value: &str) -> TreeResult<()> {
        NodeTree::set_data(self, node, key, value)
    }

    fn remove_data(&mut self, node: NodeId, key: &str) -> TreeResult<()> {
        NodeTree::remove_data(self, node, key).map(|_| ())
    }
}

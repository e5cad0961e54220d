//! Node tree for report-sort.
//!
//! Provides an arena-backed element tree with:
//! - Stable node identifiers via slotmap storage
//! - Parent-child relationships with ordered children and cascade destroy
//! - Marker (class) sets, text content, form values and attributes
//! - A per-node string side-table for derived state
//! - Activation listener registration for click-style dispatch
//!
//! The tree plays the role of the rendered report: rows, columns and cells
//! are nodes, and their markers say which role each one plays.
//!
//! # Key Types
//!
//! - [`NodeTree`] - The arena owning every node
//! - [`NodeId`] - Stable handle to a node inside one tree
//! - [`TreeId`] - Identity of a whole tree, unique per process
//!
//! # Example
//!
//! ```
//! use report_sort_core::NodeTree;
//!
//! let mut tree = NodeTree::new();
//! let table = tree.create("table");
//! let row = tree.create_child(table, "tr").unwrap();
//! tree.set_class_name(row, "sort-row-1 odd").unwrap();
//!
//! assert!(tree.has_class(row, "odd").unwrap());
//! assert_eq!(tree.children(table).unwrap(), &[row]);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use slotmap::{new_key_type, SlotMap};

use crate::logging::targets;

new_key_type! {
    /// A unique identifier for a node in a [`NodeTree`].
    ///
    /// `NodeId`s remain valid while the node is detached and reattached.
    /// They become invalid when the node is destroyed.
    pub struct NodeId;
}

impl NodeId {
    /// Convert the NodeId to a raw u64 value.
    ///
    /// The raw value can be converted back using [`NodeId::from_raw`].
    #[inline]
    pub fn as_raw(self) -> u64 {
        use slotmap::Key;
        self.data().as_ffi()
    }

    /// Create a NodeId from a raw u64 value.
    ///
    /// Note: This does not check that the node exists in any tree.
    #[inline]
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

/// Identity of a [`NodeTree`].
///
/// Node ids are only meaningful inside the tree that issued them, so anything
/// keyed across trees pairs a `TreeId` with a [`NodeId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TreeId(u64);

impl TreeId {
    /// Get the raw u64 value of this tree ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique tree IDs.
static NEXT_TREE_ID: AtomicU64 = AtomicU64::new(1);

fn next_tree_id() -> TreeId {
    TreeId(NEXT_TREE_ID.fetch_add(1, Ordering::Relaxed))
}

/// Errors that can occur during tree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The node ID is invalid or has been destroyed.
    InvalidNodeId,
    /// Attempted to attach a node under itself or one of its descendants.
    CircularParentage,
}

impl fmt::Display for TreeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidNodeId => write!(f, "Invalid or destroyed node ID"),
            Self::CircularParentage => {
                write!(f, "Cannot attach a node under itself or a descendant")
            }
        }
    }
}

impl std::error::Error for TreeError {}

/// Result type for tree operations.
pub type TreeResult<T> = std::result::Result<T, TreeError>;

/// Internal data stored for each node.
#[derive(Debug)]
struct NodeData {
    /// Element tag, e.g. `tr` or `td`.
    tag: String,
    /// Marker set, kept in insertion order.
    classes: Vec<String>,
    /// The node's own text.
    text: String,
    /// Form value, for input-like elements.
    value: Option<String>,
    /// Presentational attributes.
    attributes: HashMap<String, String>,
    /// Side-table for derived per-node state.
    data: HashMap<String, String>,
    /// Parent node (if attached).
    parent: Option<NodeId>,
    /// Ordered children.
    children: Vec<NodeId>,
    /// Whether an activation listener is registered.
    listening: bool,
}

impl NodeData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            classes: Vec::new(),
            text: String::new(),
            value: None,
            attributes: HashMap::new(),
            data: HashMap::new(),
            parent: None,
            children: Vec::new(),
            listening: false,
        }
    }
}

/// Arena that owns every node of one rendered report.
///
/// Uses SlotMap storage for stable node IDs; children are kept in document
/// order so that appending a node moves it to the end of its new parent.
#[derive(Debug)]
pub struct NodeTree {
    id: TreeId,
    nodes: SlotMap<NodeId, NodeData>,
}

impl NodeTree {
    /// Create a new empty tree.
    pub fn new() -> Self {
        Self {
            id: next_tree_id(),
            nodes: SlotMap::with_key(),
        }
    }

    /// The identity of this tree.
    pub fn id(&self) -> TreeId {
        self.id
    }

    /// Create a detached node with the given tag.
    pub fn create(&mut self, tag: &str) -> NodeId {
        let id = self.nodes.insert(NodeData::new(tag));
        tracing::trace!(target: targets::TREE, ?id, tag, "created node");
        id
    }

    /// Create a node and append it as the last child of `parent`.
    pub fn create_child(&mut self, parent: NodeId, tag: &str) -> TreeResult<NodeId> {
        if !self.nodes.contains_key(parent) {
            return Err(TreeError::InvalidNodeId);
        }
        let id = self.create(tag);
        self.append_child(parent, id)?;
        Ok(id)
    }

    /// Remove a node and all its descendants.
    #[tracing::instrument(skip(self), target = "report_sort_core::tree", level = "trace")]
    pub fn destroy(&mut self, id: NodeId) -> TreeResult<()> {
        let descendants = self.descendants(id)?;
        tracing::trace!(target: targets::TREE, ?id, descendant_count = descendants.len(), "destroying subtree");

        self.detach(id)?;
        for child_id in descendants {
            self.nodes.remove(child_id);
        }
        self.nodes.remove(id);
        Ok(())
    }

    /// Check if a node exists in the tree.
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Get the number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get all nodes without a parent.
    pub fn root_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, d)| d.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Set the parent of a node, appending it as the last child.
    ///
    /// Passing `None` detaches the node.
    pub fn set_parent(&mut self, id: NodeId, new_parent: Option<NodeId>) -> TreeResult<()> {
        if !self.nodes.contains_key(id) {
            return Err(TreeError::InvalidNodeId);
        }

        if let Some(parent_id) = new_parent {
            if !self.nodes.contains_key(parent_id) {
                return Err(TreeError::InvalidNodeId);
            }
            if self.is_ancestor_of(id, parent_id) {
                return Err(TreeError::CircularParentage);
            }
        }

        // Remove from old parent.
        let old_parent = self.nodes.get(id).and_then(|d| d.parent);
        if let Some(old_parent_id) = old_parent {
            if let Some(parent_data) = self.nodes.get_mut(old_parent_id) {
                parent_data.children.retain(|&child| child != id);
            }
        }

        if let Some(data) = self.nodes.get_mut(id) {
            data.parent = new_parent;
        }

        if let Some(parent_id) = new_parent {
            if let Some(parent_data) = self.nodes.get_mut(parent_id) {
                parent_data.children.push(id);
            }
        }

        Ok(())
    }

    /// Append `child` as the last child of `parent`, moving it if attached elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> TreeResult<()> {
        self.set_parent(child, Some(parent))
    }

    /// Detach a node from its parent. The node and its subtree stay alive.
    pub fn detach(&mut self, id: NodeId) -> TreeResult<()> {
        self.set_parent(id, None)
    }

    /// Check if `potential_ancestor` is `id` or one of its ancestors.
    fn is_ancestor_of(&self, potential_ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(current_id) = current {
            if current_id == potential_ancestor {
                return true;
            }
            current = self.nodes.get(current_id).and_then(|d| d.parent);
        }
        false
    }

    /// Get the parent of a node.
    pub fn parent(&self, id: NodeId) -> TreeResult<Option<NodeId>> {
        self.get(id).map(|d| d.parent)
    }

    /// Get the children of a node, in document order.
    pub fn children(&self, id: NodeId) -> TreeResult<&[NodeId]> {
        self.get(id).map(|d| d.children.as_slice())
    }

    /// Collect all descendants in document (pre-)order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> TreeResult<Vec<NodeId>> {
        let mut result = Vec::new();
        self.collect_descendants(id, &mut result)?;
        Ok(result)
    }

    fn collect_descendants(&self, id: NodeId, result: &mut Vec<NodeId>) -> TreeResult<()> {
        let data = self.get(id)?;
        for &child_id in &data.children {
            result.push(child_id);
            self.collect_descendants(child_id, result)?;
        }
        Ok(())
    }

    /// Get the element tag.
    pub fn tag(&self, id: NodeId) -> TreeResult<&str> {
        self.get(id).map(|d| d.tag.as_str())
    }

    /// Get the node's markers in insertion order.
    pub fn classes(&self, id: NodeId) -> TreeResult<&[String]> {
        self.get(id).map(|d| d.classes.as_slice())
    }

    /// Replace the node's markers with the whitespace-separated tokens of `class_name`.
    pub fn set_class_name(&mut self, id: NodeId, class_name: &str) -> TreeResult<()> {
        let data = self.get_mut(id)?;
        data.classes.clear();
        for token in class_name.split_whitespace() {
            if !data.classes.iter().any(|c| c == token) {
                data.classes.push(token.to_string());
            }
        }
        Ok(())
    }

    /// Check if the node carries `class`.
    pub fn has_class(&self, id: NodeId, class: &str) -> TreeResult<bool> {
        self.get(id).map(|d| d.classes.iter().any(|c| c == class))
    }

    /// Add a marker. Empty markers and duplicates are ignored.
    pub fn add_class(&mut self, id: NodeId, class: &str) -> TreeResult<()> {
        let data = self.get_mut(id)?;
        if !class.is_empty() && !data.classes.iter().any(|c| c == class) {
            data.classes.push(class.to_string());
        }
        Ok(())
    }

    /// Remove a marker. Returns whether it was present.
    pub fn remove_class(&mut self, id: NodeId, class: &str) -> TreeResult<bool> {
        let data = self.get_mut(id)?;
        let before = data.classes.len();
        data.classes.retain(|c| c != class);
        Ok(data.classes.len() != before)
    }

    /// Get the node's own text.
    pub fn text(&self, id: NodeId) -> TreeResult<&str> {
        self.get(id).map(|d| d.text.as_str())
    }

    /// Set the node's own text.
    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) -> TreeResult<()> {
        self.get_mut(id).map(|d| d.text = text.into())
    }

    /// Concatenate the node's own text with the text of all descendants in document order.
    pub fn text_content(&self, id: NodeId) -> TreeResult<String> {
        let mut out = self.text(id)?.to_string();
        for node in self.descendants(id)? {
            out.push_str(self.text(node)?);
        }
        Ok(out)
    }

    /// Get the node's form value, if any.
    pub fn value(&self, id: NodeId) -> TreeResult<Option<&str>> {
        self.get(id).map(|d| d.value.as_deref())
    }

    /// Set the node's form value.
    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) -> TreeResult<()> {
        self.get_mut(id).map(|d| d.value = Some(value.into()))
    }

    /// Get an attribute.
    pub fn attribute(&self, id: NodeId, key: &str) -> TreeResult<Option<&str>> {
        self.get(id).map(|d| d.attributes.get(key).map(String::as_str))
    }

    /// Set an attribute, replacing any previous value.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> TreeResult<()> {
        self.get_mut(id).map(|d| {
            d.attributes.insert(key.into(), value.into());
        })
    }

    /// Get a side-table entry.
    pub fn data(&self, id: NodeId, key: &str) -> TreeResult<Option<&str>> {
        self.get(id).map(|d| d.data.get(key).map(String::as_str))
    }

    /// Set a side-table entry.
    pub fn set_data(
        &mut self,
        id: NodeId,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> TreeResult<()> {
        self.get_mut(id).map(|d| {
            d.data.insert(key.into(), value.into());
        })
    }

    /// Remove a side-table entry, returning the previous value.
    pub fn remove_data(&mut self, id: NodeId, key: &str) -> TreeResult<Option<String>> {
        self.get_mut(id).map(|d| d.data.remove(key))
    }

    /// Get the names of all side-table entries on a node, sorted.
    pub fn data_keys(&self, id: NodeId) -> TreeResult<Vec<&str>> {
        let mut keys: Vec<&str> = self.get(id)?.data.keys().map(String::as_str).collect();
        keys.sort_unstable();
        Ok(keys)
    }

    /// Register an activation listener on a node.
    pub fn listen_activation(&mut self, id: NodeId) -> TreeResult<()> {
        self.get_mut(id).map(|d| d.listening = true)
    }

    /// Check if an activation listener is registered on a node.
    pub fn is_listening(&self, id: NodeId) -> TreeResult<bool> {
        self.get(id).map(|d| d.listening)
    }

    /// Deliver a click-style activation.
    ///
    /// Returns `true` when the node has a listener, meaning the host should
    /// route the activation to whoever registered it.
    pub fn activate(&self, id: NodeId) -> TreeResult<bool> {
        let listening = self.is_listening(id)?;
        tracing::trace!(target: targets::TREE, ?id, listening, "activation");
        Ok(listening)
    }

    fn get(&self, id: NodeId) -> TreeResult<&NodeData> {
        self.nodes.get(id).ok_or(TreeError::InvalidNodeId)
    }

    fn get_mut(&mut self, id: NodeId) -> TreeResult<&mut NodeData> {
        self.nodes.get_mut(id).ok_or(TreeError::InvalidNodeId)
    }
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

static_assertions::assert_impl_all!(NodeTree: Send, Sync);

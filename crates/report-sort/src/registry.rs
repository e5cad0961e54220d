//! Process-wide controller lookup.
//!
//! A [`SortRegistry`] maps each report root to its one [`SortController`].
//! Initializing a root that already has a controller returns the existing
//! one, the way re-applying the sorter to an element does nothing new.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use parking_lot::Mutex;
use report_sort_core::logging::targets;
use report_sort_core::{NodeId, TreeId};

use crate::config::SortConfig;
use crate::controller::SortController;
use crate::error::Result;
use crate::host::HostTree;

/// A controller shared between the registry and its callers.
pub type SharedController<N> = Arc<Mutex<SortController<N>>>;

static GLOBAL_REGISTRY: OnceLock<SortRegistry<NodeId>> = OnceLock::new();

/// Controllers keyed by tree and root.
pub struct SortRegistry<N> {
    controllers: Mutex<HashMap<(TreeId, N), SharedController<N>>>,
}

impl<N> Default for SortRegistry<N> {
    fn default() -> Self {
        Self {
            controllers: Mutex::new(HashMap::new()),
        }
    }
}

impl<N: fmt::Debug> fmt::Debug for SortRegistry<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let controllers = self.controllers.lock();
        f.debug_struct("SortRegistry")
            .field("roots", &controllers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SortRegistry<NodeId> {
    /// The registry shared by everything working on [`NodeTree`]s.
    ///
    /// [`NodeTree`]: report_sort_core::NodeTree
    pub fn global() -> &'static SortRegistry<NodeId> {
        GLOBAL_REGISTRY.get_or_init(SortRegistry::new)
    }
}

impl<N> SortRegistry<N>
where
    N: Copy + Eq + Hash + fmt::Debug + Send + 'static,
{
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the controller for `root`.
    pub fn init<T: HostTree<Node = N>>(
        &self,
        tree: &mut T,
        root: N,
        config: SortConfig,
    ) -> Result<SharedController<N>> {
        self.init_with(tree, root, config, |controller| controller)
    }

    /// Get or create the controller for `root`, letting `configure` attach
    /// hooks before the first scan.
    ///
    /// `config` and `configure` are ignored when the root already has a
    /// controller. A root initialized through another registry is refused
    /// with [`Error::AlreadyInitialized`](crate::Error::AlreadyInitialized).
    pub fn init_with<T, F>(
        &self,
        tree: &mut T,
        root: N,
        config: SortConfig,
        configure: F,
    ) -> Result<SharedController<N>>
    where
        T: HostTree<Node = N>,
        F: FnOnce(SortController<N>) -> SortController<N>,
    {
        let key = (tree.tree_id(), root);
        if let Some(existing) = self.controllers.lock().get(&key) {
            tracing::debug!(target: targets::REGISTRY, ?root, "Root already initialized");
            return Ok(Arc::clone(existing));
        }

        let mut controller = configure(SortController::new(root, config)?);
        controller.init(tree)?;
        let controller = Arc::new(Mutex::new(controller));

        let mut controllers = self.controllers.lock();
        let entry = Arc::clone(controllers.entry(key).or_insert(controller));
        tracing::debug!(target: targets::REGISTRY, ?root, roots = controllers.len(), "Registered root");
        Ok(entry)
    }

    /// The controller for `root`, if any.
    pub fn get(&self, tree: TreeId, root: N) -> Option<SharedController<N>> {
        self.controllers.lock().get(&(tree, root)).cloned()
    }

    /// Rescan `root`. Returns `false` when it has no controller.
    pub fn reinit<T: HostTree<Node = N>>(&self, tree: &mut T, root: N) -> Result<bool> {
        let Some(controller) = self.get(tree.tree_id(), root) else {
            return Ok(false);
        };
        controller.lock().init(tree)?;
        Ok(true)
    }

    /// Tear down and forget the controller for `root`.
    ///
    /// Returns `false` when it has no controller.
    pub fn teardown<T: HostTree<Node = N>>(&self, tree: &mut T, root: N) -> Result<bool> {
        let Some(controller) = self.controllers.lock().remove(&(tree.tree_id(), root)) else {
            return Ok(false);
        };
        controller.lock().teardown(tree)?;
        tracing::debug!(target: targets::REGISTRY, ?root, "Unregistered root");
        Ok(true)
    }

    /// Route an activation of `element` to the controller that owns it.
    pub fn dispatch_activation<T: HostTree<Node = N>>(&self, tree: &mut T, element: N) -> Result<bool> {
        self.dispatch_activation_at(tree, element, Instant::now())
    }

    /// Route an activation at `now`.
    ///
    /// Returns `false` when no controller of this tree owns `element`.
    pub fn dispatch_activation_at<T: HostTree<Node = N>>(
        &self,
        tree: &mut T,
        element: N,
        now: Instant,
    ) -> Result<bool> {
        for controller in self.controllers_of(tree.tree_id()) {
            let mut controller = controller.lock();
            if controller.model().header_for_element(element).is_some() {
                return controller.activate_at(tree, element, now);
            }
        }
        tracing::trace!(target: targets::REGISTRY, ?element, "No controller owns element");
        Ok(false)
    }

    /// Poll every controller of `tree`. Returns how many sorts ran.
    pub fn poll_all<T: HostTree<Node = N>>(&self, tree: &mut T) -> Result<usize> {
        self.poll_all_at(tree, Instant::now())
    }

    /// Poll every controller of `tree` at `now`.
    pub fn poll_all_at<T: HostTree<Node = N>>(&self, tree: &mut T, now: Instant) -> Result<usize> {
        let mut ran = 0;
        for controller in self.controllers_of(tree.tree_id()) {
            if controller.lock().poll_at(tree, now)? {
                ran += 1;
            }
        }
        Ok(ran)
    }

    /// Number of registered roots.
    pub fn len(&self) -> usize {
        self.controllers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.lock().is_empty()
    }

    /// Snapshot the controllers of one tree so no controller is locked while
    /// the map is.
    fn controllers_of(&self, tree: TreeId) -> Vec<SharedController<N>> {
        self.controllers
            .lock()
            .iter()
            .filter(|((owner, _), _)| *owner == tree)
            .map(|(_, controller)| Arc::clone(controller))
            .collect()
    }
}

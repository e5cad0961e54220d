//! Interaction controller.
//!
//! A [`SortController`] owns the report model of one root and the sort
//! direction of every column. Affordance activations are debounced through a
//! [`DeferredSlot`]: each activation advances the armed direction and re-arms
//! the slot, and only the action still armed when the window elapses runs.
//!
//! Time never advances on its own. Hosts call [`SortController::poll`] (or
//! [`SortController::poll_at`] with an explicit instant) from their event
//! loop, and [`SortController::time_until_ready`] tells them when to wake.
//!
//! # Example
//!
//! ```
//! use report_sort::{SortConfig, SortController};
//! use report_sort_core::NodeTree;
//! use std::time::{Duration, Instant};
//!
//! let mut tree = NodeTree::new();
//! let table = tree.create("table");
//! let head = tree.create_child(table, "th").unwrap();
//! tree.set_class_name(head, "sort-head-name").unwrap();
//! for name in ["b", "a"] {
//!     let row = tree.create_child(table, "tr").unwrap();
//!     tree.set_class_name(row, "sort-row").unwrap();
//!     let cell = tree.create_child(row, "td").unwrap();
//!     tree.set_class_name(cell, "sort-column-name sort-data").unwrap();
//!     tree.set_text(cell, name).unwrap();
//! }
//!
//! let mut controller = SortController::new(table, SortConfig::default()).unwrap();
//! controller.init(&mut tree).unwrap();
//!
//! let start = Instant::now();
//! assert!(controller.activate_column_at(&mut tree, "name", start).unwrap());
//! assert!(controller.poll_at(&mut tree, start + Duration::from_millis(100)).unwrap());
//! assert_eq!(controller.direction("name"), report_sort::Direction::Asc);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use report_sort_core::logging::targets;
use report_sort_core::{DeferredSlot, NodeId, TreeError};
use static_assertions::assert_impl_all;

use crate::binder;
use crate::config::SortConfig;
use crate::engine::SortEngine;
use crate::error::{Error, HookResult, HookStage, Result};
use crate::host::HostTree;
use crate::model::{Direction, ReportModel};
use crate::scanner::{self, ORDER_KEY};

/// Side-table key marking a root as initialized.
pub const INITIALIZED_KEY: &str = "sort.initialized";
/// Attribute mirroring an affordance's direction.
pub const COLUMN_ORDER_ATTRIBUTE: &str = "column-order";

type Hook = Box<dyn FnMut() -> HookResult + Send>;

/// An armed sort, waiting for the debounce window to pass.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingSort<N> {
    column: String,
    direction: Direction,
    affordance: N,
}

/// Sort state and orchestration for one report root.
pub struct SortController<N> {
    config: SortConfig,
    engine: SortEngine,
    root: N,
    model: ReportModel<N>,
    directions: HashMap<String, Direction>,
    pending: DeferredSlot<PendingSort<N>>,
    pre_sort: Option<Hook>,
    post_sort: Option<Hook>,
    /// Whether this controller set the root's init flag.
    attached: bool,
}

assert_impl_all!(SortController<NodeId>: Send);

impl<N: fmt::Debug> fmt::Debug for SortController<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SortController")
            .field("root", &self.root)
            .field("config", &self.config)
            .field("model", &self.model)
            .field("directions", &self.directions)
            .field("pending", &self.pending.is_pending())
            .field("pre_sort", &self.pre_sort.is_some())
            .field("post_sort", &self.post_sort.is_some())
            .field("attached", &self.attached)
            .finish()
    }
}

impl<N> SortController<N>
where
    N: Copy + Eq + std::hash::Hash + fmt::Debug + Send + 'static,
{
    /// Create a controller for `root`. Nothing is scanned until [`init`].
    ///
    /// [`init`]: SortController::init
    pub fn new(root: N, config: SortConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: SortEngine::new(config.date_format.clone()),
            pending: DeferredSlot::new(config.debounce()),
            config,
            root,
            model: ReportModel::default(),
            directions: HashMap::new(),
            pre_sort: None,
            post_sort: None,
            attached: false,
        })
    }

    /// Set the hook fired before each activation-driven sort.
    pub fn on_pre_sort<F>(mut self, hook: F) -> Self
    where
        F: FnMut() -> HookResult + Send + 'static,
    {
        self.pre_sort = Some(Box::new(hook));
        self
    }

    /// Set the hook fired after each activation-driven sort is rendered.
    pub fn on_post_sort<F>(mut self, hook: F) -> Self
    where
        F: FnMut() -> HookResult + Send + 'static,
    {
        self.post_sort = Some(Box::new(hook));
        self
    }

    /// Scan the root and attach affordances.
    ///
    /// Calling this again discards the previous model and affordances. When
    /// `orderID` is configured the report is sorted by it straight away.
    ///
    /// Fails with [`Error::AlreadyInitialized`] when another controller has
    /// already initialized the root and not torn it down.
    #[tracing::instrument(skip(self, tree), fields(root = ?self.root), target = "report_sort::controller", level = "debug")]
    pub fn init<T: HostTree<Node = N>>(&mut self, tree: &mut T) -> Result<()> {
        if !self.attached && Self::is_initialized(tree, self.root)? {
            tracing::warn!(target: targets::CONTROLLER, root = ?self.root, "Root already has a sorter");
            return Err(Error::AlreadyInitialized);
        }
        self.cancel_pending(tree)?;
        self.remove_affordances(tree)?;

        self.model = scanner::scan(tree, self.root, &self.config)?;
        self.directions = self
            .model
            .headers
            .iter()
            .map(|header| (header.id.clone(), Direction::None))
            .collect();
        tree.set_data(self.root, INITIALIZED_KEY, "true")?;
        self.attached = true;

        if let Some(column) = self.config.order_id.clone() {
            if let Some(direction) = self.directions.get_mut(&column) {
                *direction = self.config.order;
            }
            self.bind_affordances(tree)?;
            self.sort_data(tree, Some(column.as_str()), Some(self.config.order))?;
        } else {
            self.bind_affordances(tree)?;
        }

        tracing::info!(
            target: targets::CONTROLLER,
            root = ?self.root,
            columns = self.model.headers.len(),
            groups = self.model.groups.len(),
            "Initialized sorter"
        );
        Ok(())
    }

    /// Remove affordances, drop the model and clear the root's init flag.
    pub fn teardown<T: HostTree<Node = N>>(&mut self, tree: &mut T) -> Result<()> {
        self.cancel_pending(tree)?;
        self.remove_affordances(tree)?;
        self.model = ReportModel::default();
        self.directions.clear();
        if self.attached {
            ignore_missing(tree.remove_data(self.root, INITIALIZED_KEY))?;
            self.attached = false;
        }
        tracing::debug!(target: targets::CONTROLLER, root = ?self.root, "Tore down sorter");
        Ok(())
    }

    /// Whether `root` carries the init flag.
    pub fn is_initialized<T: HostTree<Node = N>>(tree: &T, root: N) -> Result<bool> {
        Ok(tree.data(root, INITIALIZED_KEY)?.is_some())
    }

    /// Sort by `column` in `direction` and render.
    ///
    /// Missing arguments fall back to the configured `orderID` and `order`.
    /// Returns `false` when there is no column to sort by or no group has
    /// it, in which case the tree is left untouched. Hooks do not fire.
    pub fn sort_data<T: HostTree<Node = N>>(
        &mut self,
        tree: &mut T,
        column: Option<&str>,
        direction: Option<Direction>,
    ) -> Result<bool> {
        let Some(column) = column.or(self.config.order_id.as_deref()) else {
            return Ok(false);
        };
        let direction = direction.unwrap_or(self.config.order);

        if !self.engine.sort_in_place(&mut self.model.groups, column, direction) {
            return Ok(false);
        }
        binder::render(tree, &self.model.groups, &self.config.alternating_row_marker)?;
        Ok(true)
    }

    /// Handle an activation of `element` using the current time.
    pub fn activate<T: HostTree<Node = N>>(&mut self, tree: &mut T, element: N) -> Result<bool> {
        self.activate_at(tree, element, Instant::now())
    }

    /// Handle an activation of an affordance or header element at `now`.
    ///
    /// Returns `false` when the element does not belong to this controller.
    pub fn activate_at<T: HostTree<Node = N>>(
        &mut self,
        tree: &mut T,
        element: N,
        now: Instant,
    ) -> Result<bool> {
        let Some(column) = self.model.header_for_element(element).map(|h| h.id.clone()) else {
            return Ok(false);
        };
        self.activate_column_at(tree, &column, now)
    }

    /// Arm a sort of `column` at `now`.
    ///
    /// The direction advances from the one already armed for `column`, or
    /// from its committed state when nothing is armed for it. Two activations
    /// inside one window therefore toggle twice before a single sort runs.
    pub fn activate_column_at<T: HostTree<Node = N>>(
        &mut self,
        tree: &mut T,
        column: &str,
        now: Instant,
    ) -> Result<bool> {
        let Some(affordance) = self.model.header(column).map(|h| h.affordance) else {
            tracing::debug!(target: targets::CONTROLLER, column, "Activation for unknown column");
            return Ok(false);
        };

        let current = match self.pending.peek() {
            Some(pending) if pending.column == column => pending.direction,
            _ => self.direction(column),
        };
        let direction = current.next(self.config.order);

        if let Some(previous) = self.pending.peek().map(|p| p.affordance) {
            if previous != affordance {
                ignore_missing(tree.remove_marker(previous, &self.config.affordance_loading_marker))?;
            }
        }
        tree.add_marker(affordance, &self.config.affordance_loading_marker)?;

        let id = self.pending.schedule_at(
            now,
            PendingSort {
                column: column.to_string(),
                direction,
                affordance,
            },
        );
        tracing::debug!(target: targets::CONTROLLER, column, %direction, task = id.as_u64(), "Armed sort");
        Ok(true)
    }

    /// Run the armed sort if its window has elapsed, using the current time.
    pub fn poll<T: HostTree<Node = N>>(&mut self, tree: &mut T) -> Result<bool> {
        self.poll_at(tree, Instant::now())
    }

    /// Run the armed sort if its window has elapsed at `now`.
    ///
    /// Returns `true` when a sort ran.
    pub fn poll_at<T: HostTree<Node = N>>(&mut self, tree: &mut T, now: Instant) -> Result<bool> {
        match self.pending.take_ready(now) {
            Some(pending) => self.run(tree, pending).map(|()| true),
            None => Ok(false),
        }
    }

    /// Run the armed sort immediately, ignoring the debounce window.
    pub fn flush<T: HostTree<Node = N>>(&mut self, tree: &mut T) -> Result<bool> {
        match self.pending.flush() {
            Some(pending) => self.run(tree, pending).map(|()| true),
            None => Ok(false),
        }
    }

    /// Time until the armed sort is due, `None` when nothing is armed.
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        self.pending.time_until_ready(now)
    }

    /// Whether a sort is armed.
    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    /// Committed direction of `column`, `None` for unknown columns.
    pub fn direction(&self, column: &str) -> Direction {
        self.directions.get(column).copied().unwrap_or(Direction::None)
    }

    /// Column ids with their committed directions, in header order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, Direction)> + '_ {
        self.model
            .headers
            .iter()
            .map(|header| (header.id.as_str(), self.direction(&header.id)))
    }

    pub fn model(&self) -> &ReportModel<N> {
        &self.model
    }

    pub fn root(&self) -> N {
        self.root
    }

    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    fn run<T: HostTree<Node = N>>(&mut self, tree: &mut T, pending: PendingSort<N>) -> Result<()> {
        let loading = self.config.affordance_loading_marker.clone();

        if let Err(err) = fire(&mut self.pre_sort, HookStage::PreSort) {
            ignore_missing(tree.remove_marker(pending.affordance, &loading))?;
            return Err(err);
        }

        for (column, direction) in self.directions.iter_mut() {
            *direction = if *column == pending.column {
                pending.direction
            } else {
                Direction::None
            };
        }
        self.bind_affordances(tree)?;

        tracing::debug!(
            target: targets::CONTROLLER,
            column = %pending.column,
            direction = %pending.direction,
            "Running sort"
        );
        self.sort_data(tree, Some(pending.column.as_str()), Some(pending.direction))?;
        ignore_missing(tree.remove_marker(pending.affordance, &loading))?;

        fire(&mut self.post_sort, HookStage::PostSort)
    }

    /// Mirror the committed directions onto the model and the affordances.
    fn bind_affordances<T: HostTree<Node = N>>(&mut self, tree: &mut T) -> Result<()> {
        for header in &mut self.model.headers {
            let direction = self
                .directions
                .get(&header.id)
                .copied()
                .unwrap_or(Direction::None);
            header.order = direction;
            tree.set_data(header.affordance, ORDER_KEY, direction.as_str())?;
            tree.set_attribute(header.affordance, COLUMN_ORDER_ATTRIBUTE, direction.as_str())?;
        }
        Ok(())
    }

    fn cancel_pending<T: HostTree<Node = N>>(&mut self, tree: &mut T) -> Result<()> {
        if let Ok(pending) = self.pending.cancel() {
            ignore_missing(tree.remove_marker(pending.affordance, &self.config.affordance_loading_marker))?;
        }
        Ok(())
    }

    fn remove_affordances<T: HostTree<Node = N>>(&mut self, tree: &mut T) -> Result<()> {
        for header in self.model.headers.drain(..) {
            ignore_missing(tree.destroy(header.affordance))?;
        }
        Ok(())
    }
}

fn fire(hook: &mut Option<Hook>, stage: HookStage) -> Result<()> {
    let Some(hook) = hook.as_mut() else {
        return Ok(());
    };
    tracing::trace!(target: targets::CONTROLLER, %stage, "Firing hook");
    hook().map_err(|source| Error::hook(stage, source))
}

/// Treat elements the host already removed as done.
fn ignore_missing<T>(result: std::result::Result<T, TreeError>) -> Result<()> {
    match result {
        Ok(_) | Err(TreeError::InvalidNodeId) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use report_sort_core::NodeTree;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Report {
        tree: NodeTree,
        root: NodeId,
        rows: Vec<NodeId>,
    }

    fn report(values: &[&str]) -> Report {
        let mut tree = NodeTree::new();
        let root = tree.create("table");
        let head = tree.create_child(root, "tr").unwrap();
        for id in ["name", "other"] {
            let th = tree.create_child(head, "th").unwrap();
            tree.set_class_name(th, &format!("sort-head-{id}")).unwrap();
        }
        let body = tree.create_child(root, "tbody").unwrap();
        let mut rows = Vec::new();
        for value in values {
            let row = tree.create_child(body, "tr").unwrap();
            tree.set_class_name(row, "sort-row").unwrap();
            let cell = tree.create_child(row, "td").unwrap();
            tree.set_class_name(cell, "sort-column-name sort-data").unwrap();
            tree.set_text(cell, *value).unwrap();
            rows.push(row);
        }
        Report { tree, root, rows }
    }

    fn body_order(report: &Report) -> Vec<NodeId> {
        let body = report.tree.parent(report.rows[0]).unwrap().unwrap();
        report.tree.children(body).unwrap().to_vec()
    }

    #[test]
    fn test_init_resets_directions() {
        let mut r = report(&["b", "a"]);
        let mut controller = SortController::new(r.root, SortConfig::default()).unwrap();
        controller.init(&mut r.tree).unwrap();

        let columns: Vec<_> = controller.columns().collect();
        assert_eq!(columns, vec![("other", Direction::None), ("name", Direction::None)]);
        assert!(SortController::is_initialized(&r.tree, r.root).unwrap());

        let affordance = controller.model().header("name").unwrap().affordance;
        assert_eq!(r.tree.attribute(affordance, COLUMN_ORDER_ATTRIBUTE).unwrap(), Some("none"));
    }

    #[test]
    fn test_init_auto_sorts() {
        let mut r = report(&["b", "c", "a"]);
        let config = SortConfig::default().with_order_id("name").with_order(Direction::Desc);
        let mut controller = SortController::new(r.root, config).unwrap();
        controller.init(&mut r.tree).unwrap();

        assert_eq!(controller.direction("name"), Direction::Desc);
        assert_eq!(body_order(&r), vec![r.rows[1], r.rows[0], r.rows[2]]);
    }

    #[test]
    fn test_reinit_does_not_duplicate_affordances() {
        let mut r = report(&["a"]);
        let mut controller = SortController::new(r.root, SortConfig::default()).unwrap();
        controller.init(&mut r.tree).unwrap();
        let count = r.tree.node_count();
        controller.init(&mut r.tree).unwrap();
        assert_eq!(r.tree.node_count(), count);
    }

    #[test]
    fn test_debounce_runs_once() {
        let mut r = report(&["b", "a"]);
        let pre = Arc::new(AtomicUsize::new(0));
        let post = Arc::new(AtomicUsize::new(0));
        let (pre_hook, post_hook) = (pre.clone(), post.clone());
        let mut controller = SortController::new(r.root, SortConfig::default())
            .unwrap()
            .on_pre_sort(move || {
                pre_hook.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .on_post_sort(move || {
                post_hook.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        controller.init(&mut r.tree).unwrap();

        let affordance = controller.model().header("name").unwrap().affordance;
        let start = Instant::now();
        assert!(controller.activate_at(&mut r.tree, affordance, start).unwrap());
        assert!(r.tree.has_class(affordance, "imgArrowLoading").unwrap());
        assert!(controller.activate_at(&mut r.tree, affordance, start + Duration::from_millis(50)).unwrap());

        assert!(!controller.poll_at(&mut r.tree, start + Duration::from_millis(120)).unwrap());
        assert!(controller.poll_at(&mut r.tree, start + Duration::from_millis(150)).unwrap());
        assert!(!controller.poll_at(&mut r.tree, start + Duration::from_secs(1)).unwrap());

        assert_eq!(pre.load(Ordering::SeqCst), 1);
        assert_eq!(post.load(Ordering::SeqCst), 1);
        assert_eq!(controller.direction("name"), Direction::Desc);
        assert!(!r.tree.has_class(affordance, "imgArrowLoading").unwrap());
        assert_eq!(body_order(&r), r.rows);
    }

    #[test]
    fn test_activations_in_one_window_accumulate() {
        let mut r = report(&["b", "c", "a"]);
        let mut controller = SortController::new(r.root, SortConfig::default()).unwrap();
        controller.init(&mut r.tree).unwrap();
        let start = Instant::now();

        for offset in [0, 20, 40] {
            controller
                .activate_column_at(&mut r.tree, "name", start + Duration::from_millis(offset))
                .unwrap();
        }
        assert_eq!(controller.direction("name"), Direction::None);
        assert!(controller.poll_at(&mut r.tree, start + Duration::from_millis(140)).unwrap());

        assert_eq!(controller.direction("name"), Direction::Asc);
        assert_eq!(body_order(&r), vec![r.rows[2], r.rows[0], r.rows[1]]);
    }

    #[test]
    fn test_switching_column_restarts_from_committed_state() {
        let mut r = report(&["b", "a"]);
        let mut controller = SortController::new(r.root, SortConfig::default()).unwrap();
        controller.init(&mut r.tree).unwrap();
        let start = Instant::now();

        controller.activate_column_at(&mut r.tree, "name", start).unwrap();
        controller.activate_column_at(&mut r.tree, "other", start).unwrap();
        controller.activate_column_at(&mut r.tree, "name", start).unwrap();
        controller.flush(&mut r.tree).unwrap();

        assert_eq!(controller.direction("name"), Direction::Asc);
        assert_eq!(controller.direction("other"), Direction::None);
    }

    #[test]
    fn test_second_controller_on_same_root_is_refused() {
        let mut r = report(&["b", "a"]);
        let mut first = SortController::new(r.root, SortConfig::default()).unwrap();
        first.init(&mut r.tree).unwrap();
        let count = r.tree.node_count();

        let mut second = SortController::new(r.root, SortConfig::default()).unwrap();
        assert!(matches!(second.init(&mut r.tree), Err(Error::AlreadyInitialized)));
        assert_eq!(r.tree.node_count(), count);

        second.teardown(&mut r.tree).unwrap();
        assert!(SortController::is_initialized(&r.tree, r.root).unwrap());

        first.teardown(&mut r.tree).unwrap();
        second.init(&mut r.tree).unwrap();
        assert_eq!(r.tree.node_count(), count);
    }

    #[test]
    fn test_activation_toggles_and_resets_others() {
        let mut r = report(&["b", "a"]);
        let mut controller = SortController::new(r.root, SortConfig::default()).unwrap();
        controller.init(&mut r.tree).unwrap();
        let start = Instant::now();

        controller.activate_column_at(&mut r.tree, "name", start).unwrap();
        controller.flush(&mut r.tree).unwrap();
        assert_eq!(controller.direction("name"), Direction::Asc);

        controller.activate_column_at(&mut r.tree, "name", start).unwrap();
        controller.flush(&mut r.tree).unwrap();
        assert_eq!(controller.direction("name"), Direction::Desc);

        controller.activate_column_at(&mut r.tree, "other", start).unwrap();
        controller.flush(&mut r.tree).unwrap();
        assert_eq!(controller.direction("name"), Direction::None);
        assert_eq!(controller.direction("other"), Direction::Asc);
    }

    #[test]
    fn test_pre_hook_failure_propagates() {
        let mut r = report(&["b", "a"]);
        let mut controller = SortController::new(r.root, SortConfig::default())
            .unwrap()
            .on_pre_sort(|| Err("refused".into()));
        controller.init(&mut r.tree).unwrap();

        let affordance = controller.model().header("name").unwrap().affordance;
        controller.activate_at(&mut r.tree, affordance, Instant::now()).unwrap();
        let err = controller.flush(&mut r.tree).unwrap_err();

        assert!(matches!(err, Error::Hook { stage: HookStage::PreSort, .. }));
        assert!(!r.tree.has_class(affordance, "imgArrowLoading").unwrap());
        assert_eq!(body_order(&r), r.rows);
    }

    #[test]
    fn test_sort_data_defaults() {
        let mut r = report(&["b", "a"]);
        let mut controller = SortController::new(r.root, SortConfig::default()).unwrap();
        controller.init(&mut r.tree).unwrap();

        assert!(!controller.sort_data(&mut r.tree, None, None).unwrap());
        assert!(!controller.sort_data(&mut r.tree, Some("missing"), None).unwrap());
        assert_eq!(body_order(&r), r.rows);

        assert!(controller.sort_data(&mut r.tree, Some("name"), None).unwrap());
        assert_eq!(body_order(&r), vec![r.rows[1], r.rows[0]]);
    }

    #[test]
    fn test_teardown() {
        let mut r = report(&["a"]);
        let mut controller = SortController::new(r.root, SortConfig::default()).unwrap();
        let before = r.tree.node_count();
        controller.init(&mut r.tree).unwrap();
        controller.teardown(&mut r.tree).unwrap();

        assert_eq!(r.tree.node_count(), before);
        assert!(!SortController::is_initialized(&r.tree, r.root).unwrap());
        assert!(controller.model().is_empty());
        assert_eq!(controller.columns().count(), 0);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = SortConfig::default().with_order(Direction::None);
        assert!(SortController::new(NodeId::default(), config).is_err());
    }
}

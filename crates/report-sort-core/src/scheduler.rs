//! Deferred single-slot scheduling.
//!
//! A [`DeferredSlot`] holds at most one pending action. Scheduling a new
//! action cancels and replaces the previous one, so a burst of requests
//! collapses into a single execution once the slot has been quiet for the
//! configured delay. This is the debounce primitive used by the sort
//! controller.
//!
//! The slot stores a payload rather than a closure: whoever polls it gets
//! the payload back and runs the work with whatever borrowed state it needs.
//!
//! # Example
//!
//! ```
//! use report_sort_core::DeferredSlot;
//! use std::time::{Duration, Instant};
//!
//! let mut slot = DeferredSlot::new(Duration::from_millis(100));
//! let start = Instant::now();
//!
//! slot.schedule_at(start, "first");
//! slot.schedule_at(start + Duration::from_millis(50), "second");
//!
//! // Still inside the window of the second request.
//! assert_eq!(slot.take_ready(start + Duration::from_millis(120)), None);
//! assert_eq!(slot.take_ready(start + Duration::from_millis(150)), Some("second"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::error::{Result, SchedulerError};
use crate::logging::targets;

/// A unique identifier for a scheduled action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeferredTaskId(u64);

impl DeferredTaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique task IDs.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> DeferredTaskId {
    DeferredTaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// The pending action.
#[derive(Debug)]
struct Pending<T> {
    id: DeferredTaskId,
    due: Instant,
    payload: T,
}

/// A slot holding at most one deferred action.
#[derive(Debug)]
pub struct DeferredSlot<T> {
    /// Quiet period before a scheduled action becomes ready.
    delay: Duration,
    /// The currently armed action, if any.
    pending: Option<Pending<T>>,
}

impl<T> DeferredSlot<T> {
    /// Create an empty slot with the given delay.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    /// The delay applied to newly scheduled actions.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Change the delay. Already armed actions keep their deadline.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Arm the slot relative to the current time.
    pub fn schedule(&mut self, payload: T) -> DeferredTaskId {
        self.schedule_at(Instant::now(), payload)
    }

    /// Arm the slot relative to `now`, replacing any pending action.
    pub fn schedule_at(&mut self, now: Instant, payload: T) -> DeferredTaskId {
        let id = next_task_id();
        if let Some(previous) = self.pending.take() {
            tracing::trace!(target: targets::SCHEDULER, replaced = ?previous.id, ?id, "rearmed pending action");
        } else {
            tracing::trace!(target: targets::SCHEDULER, ?id, delay_ms = u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX), "armed action");
        }
        self.pending = Some(Pending {
            id,
            due: now + self.delay,
            payload,
        });
        id
    }

    /// Cancel the pending action and return its payload.
    pub fn cancel(&mut self) -> Result<T> {
        match self.pending.take() {
            Some(pending) => {
                tracing::trace!(target: targets::SCHEDULER, id = ?pending.id, "cancelled action");
                Ok(pending.payload)
            }
            None => Err(SchedulerError::NothingPending.into()),
        }
    }

    /// Check if an action is armed.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The id of the armed action, if any.
    pub fn pending_id(&self) -> Option<DeferredTaskId> {
        self.pending.as_ref().map(|p| p.id)
    }

    /// Borrow the armed payload without firing it.
    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref().map(|p| &p.payload)
    }

    /// Get the duration until the armed action becomes ready.
    ///
    /// Returns `None` when nothing is armed and `Duration::ZERO` when it is overdue.
    pub fn time_until_ready(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|p| p.due.saturating_duration_since(now))
    }

    /// Take the payload if its deadline has passed at `now`.
    pub fn take_ready(&mut self, now: Instant) -> Option<T> {
        let ready = self.pending.as_ref().is_some_and(|p| p.due <= now);
        if !ready {
            return None;
        }
        self.pending.take().map(|p| {
            tracing::trace!(target: targets::SCHEDULER, id = ?p.id, "action ready");
            p.payload
        })
    }

    /// Take the payload if its deadline has passed, using the current time.
    pub fn process_ready(&mut self) -> Option<T> {
        self.take_ready(Instant::now())
    }

    /// Take the payload immediately, ignoring its deadline.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|p| p.payload)
    }
}

//! Hierarchical progress reporting.
//!
//! A [`Progress`] counts completed units of work against a total. Other
//! progress objects can be attached as children, each standing in for a
//! number of the parent's pending units; the child's fractional completion is
//! scaled into the parent's frame so observers of the parent see smooth
//! 0.0 to 1.0 movement while the child advances.
//!
//! # Example
//!
//! ```
//! use netask_core::progress::Progress;
//!
//! // A unit of work whose single unit is backed by a byte transfer
//! let task = Progress::new(1);
//! let transfer = Progress::new(200);
//! task.add_child(&transfer, 1);
//!
//! transfer.set_completed_unit_count(100);
//! assert!((task.fraction_completed() - 0.5).abs() < f64::EPSILON);
//! assert_eq!(task.completed_unit_count(), 0);
//!
//! transfer.finish();
//! assert_eq!(task.fraction_completed(), 1.0);
//! assert_eq!(task.completed_unit_count(), 1);
//! ```
//!
//! # Thread Safety
//!
//! `Progress` is a cheaply cloneable handle (`Send + Sync`). Counters are
//! atomics, so any thread may poll it while the owning transfer writes to it.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::logging::targets;
use crate::signal::{ConnectionId, Signal};

/// A point-in-time view of a [`Progress`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressSnapshot {
    /// Completed units, counting finished children at their full weight.
    pub completed_unit_count: i64,
    /// Total units of work.
    pub total_unit_count: i64,
    /// Fraction completed, from 0.0 to 1.0.
    pub fraction_completed: f64,
}

/// A child attached to a parent progress.
struct Child {
    progress: Progress,
    pending_unit_count: i64,
    connection_id: ConnectionId,
}

struct ProgressInner {
    total: AtomicI64,
    completed: AtomicI64,
    children: Mutex<Vec<Child>>,
    /// Bits of the last emitted fraction, used to suppress duplicate emits.
    last_emitted: AtomicU64,
    changed: Signal<f64>,
}

impl ProgressInner {
    fn new(total_unit_count: i64) -> Self {
        Self {
            total: AtomicI64::new(total_unit_count),
            completed: AtomicI64::new(0),
            children: Mutex::new(Vec::new()),
            last_emitted: AtomicU64::new(0.0_f64.to_bits()),
            changed: Signal::new(),
        }
    }

    fn fraction_completed(&self) -> f64 {
        let total = self.total.load(Ordering::Acquire);
        if total <= 0 {
            return 0.0;
        }

        let own = self.completed.load(Ordering::Acquire) as f64;
        let from_children: f64 = self
            .children
            .lock()
            .iter()
            .map(|child| child.progress.fraction_completed().min(1.0) * child.pending_unit_count as f64)
            .sum();

        ((own + from_children) / total as f64).clamp(0.0, 1.0)
    }

    fn completed_unit_count(&self) -> i64 {
        let own = self.completed.load(Ordering::Acquire);
        let from_children: i64 = self
            .children
            .lock()
            .iter()
            .filter(|child| child.progress.is_finished())
            .map(|child| child.pending_unit_count)
            .sum();
        own + from_children
    }

    fn notify(&self) {
        let fraction = self.fraction_completed();
        let previous = f64::from_bits(self.last_emitted.swap(fraction.to_bits(), Ordering::AcqRel));
        if (fraction - previous).abs() > f64::EPSILON {
            tracing::trace!(target: targets::PROGRESS, fraction, "progress changed");
            self.changed.emit(fraction);
        }
    }
}

impl Drop for ProgressInner {
    fn drop(&mut self) {
        for child in self.children.get_mut().drain(..) {
            child.progress.on_changed().disconnect(child.connection_id);
        }
    }
}

/// A thread-safe, hierarchical unit-count progress tracker.
///
/// See the [module documentation](self) for the parent/child model.
#[derive(Clone)]
pub struct Progress {
    inner: Arc<ProgressInner>,
}

impl Progress {
    /// Create a progress tracker with the given total unit count.
    ///
    /// A total of zero or less is indeterminate and reports a fraction of 0.0
    /// until a positive total is set.
    pub fn new(total_unit_count: i64) -> Self {
        Self {
            inner: Arc::new(ProgressInner::new(total_unit_count)),
        }
    }

    /// Total units of work.
    pub fn total_unit_count(&self) -> i64 {
        self.inner.total.load(Ordering::Acquire)
    }

    /// Change the total units of work.
    pub fn set_total_unit_count(&self, total_unit_count: i64) {
        self.inner.total.store(total_unit_count, Ordering::Release);
        self.inner.notify();
    }

    /// Completed units, including the pending units of finished children.
    pub fn completed_unit_count(&self) -> i64 {
        self.inner.completed_unit_count()
    }

    /// Set the units completed directly by this progress (children excluded).
    pub fn set_completed_unit_count(&self, completed_unit_count: i64) {
        self.inner
            .completed
            .store(completed_unit_count, Ordering::Release);
        self.inner.notify();
    }

    /// Raise the directly completed units to `completed_unit_count`.
    ///
    /// Lower values are ignored, so observers never see the count go back.
    pub fn advance_completed_unit_count(&self, completed_unit_count: i64) {
        let previous = self
            .inner
            .completed
            .fetch_max(completed_unit_count, Ordering::AcqRel);
        if completed_unit_count > previous {
            self.inner.notify();
        }
    }

    /// Fraction of the total completed, from 0.0 to 1.0.
    pub fn fraction_completed(&self) -> f64 {
        self.inner.fraction_completed()
    }

    /// Whether every unit of work has completed.
    pub fn is_finished(&self) -> bool {
        let total = self.total_unit_count();
        total > 0 && self.completed_unit_count() >= total
    }

    /// Mark all units as completed.
    ///
    /// An indeterminate total becomes a single completed unit.
    pub fn finish(&self) {
        let total = self.total_unit_count().max(1);
        self.inner.total.store(total, Ordering::Release);
        self.inner.completed.store(total, Ordering::Release);
        self.inner.notify();
    }

    /// Reset the directly completed units to zero.
    pub fn reset(&self) {
        self.inner.completed.store(0, Ordering::Release);
        self.inner.notify();
    }

    /// Attach `child` so that it accounts for `pending_unit_count` of this
    /// progress's units.
    ///
    /// # Panics
    ///
    /// Panics if `pending_unit_count` is not positive or `child` is this
    /// progress itself.
    pub fn add_child(&self, child: &Progress, pending_unit_count: i64) {
        assert!(pending_unit_count > 0, "Pending unit count must be positive");
        assert!(
            !Arc::ptr_eq(&self.inner, &child.inner),
            "A progress cannot be its own child"
        );

        let parent: Weak<ProgressInner> = Arc::downgrade(&self.inner);
        let connection_id = child.on_changed().connect(move |_| {
            if let Some(parent) = parent.upgrade() {
                parent.notify();
            }
        });

        self.inner.children.lock().push(Child {
            progress: child.clone(),
            pending_unit_count,
            connection_id,
        });
        self.inner.notify();
    }

    /// Number of attached children.
    pub fn child_count(&self) -> usize {
        self.inner.children.lock().len()
    }

    /// Capture the current counters.
    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            completed_unit_count: self.completed_unit_count(),
            total_unit_count: self.total_unit_count(),
            fraction_completed: self.fraction_completed(),
        }
    }

    /// Signal emitted with the new fraction whenever it changes.
    pub fn on_changed(&self) -> &Signal<f64> {
        &self.inner.changed
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(1)
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("completed_unit_count", &self.completed_unit_count())
            .field("total_unit_count", &self.total_unit_count())
            .field("fraction_completed", &self.fraction_completed())
            .field("children", &self.child_count())
            .finish()
    }
}

static_assertions::assert_impl_all!(Progress: Send, Sync);

//! Update scheduling.
//!
//! State changes never patch the host tree synchronously; they mark the
//! owning instance dirty with a [`Runner`]. The default [`BatchRunner`]
//! collapses all marks within a turn into one flush; alternate runners (a
//! synchronous one for tests, say) only have to guarantee at-most-one queued
//! update per instance per flush and that no update runs against a torn-down
//! instance.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::collections::map::HashSet;
use crate::mount::{Instance, WeakInstance};

pub trait Runner {
    /// Record that `instance` needs re-evaluation.
    fn add(&self, instance: Instance);
}

/// Host-side notification that a flush became pending. Fired once per batch,
/// on the first `add` since the pending set drained.
pub trait FlushScheduler: Send + Sync {
    fn schedule_flush(&self);
}

/// Scheduler for embeddings that poll [`BatchRunner::flush`] themselves.
#[derive(Default)]
pub struct NoopScheduler;

impl FlushScheduler for NoopScheduler {
    fn schedule_flush(&self) {}
}

struct BatchInner {
    scheduler: Arc<dyn FlushScheduler>,
    pending: RefCell<HashSet<usize>>,
    queue: RefCell<Vec<(usize, WeakInstance)>>,
}

/// The default batching runner. Duplicate adds within one turn collapse;
/// instances torn down before the flush are skipped via the weak reference
/// and the alive flag.
pub struct BatchRunner {
    inner: BatchInner,
}

impl BatchRunner {
    pub fn new(scheduler: Arc<dyn FlushScheduler>) -> Rc<Self> {
        Rc::new(Self {
            inner: BatchInner {
                scheduler,
                pending: RefCell::new(HashSet::new()),
                queue: RefCell::new(Vec::new()),
            },
        })
    }

    pub fn has_pending(&self) -> bool {
        !self.inner.pending.borrow().is_empty()
    }

    /// Run every queued update. Updates enqueued while flushing (an effect
    /// setting state, say) are drained in follow-up rounds before returning.
    pub fn flush(&self) {
        loop {
            let batch: Vec<(usize, WeakInstance)> =
                self.inner.queue.borrow_mut().drain(..).collect();
            if batch.is_empty() {
                break;
            }
            for (id, weak) in batch {
                self.inner.pending.borrow_mut().remove(&id);
                if let Some(instance) = weak.upgrade() {
                    if instance.is_alive() {
                        log::trace!("flush update for <{}>", instance.name());
                        instance.update();
                    }
                }
            }
        }
    }
}

impl Runner for BatchRunner {
    fn add(&self, instance: Instance) {
        let was_empty = {
            let mut pending = self.inner.pending.borrow_mut();
            let was_empty = pending.is_empty();
            if !pending.insert(instance.id()) {
                return;
            }
            was_empty
        };
        self.inner
            .queue
            .borrow_mut()
            .push((instance.id(), instance.downgrade()));
        if was_empty {
            self.inner.scheduler.schedule_flush();
        }
    }
}

/// Imperative handle exposed to components via `use_pin` and to component
/// `ref` props: marks the instance dirty for the next flush.
#[derive(Clone)]
pub struct PinHandle {
    instance: WeakInstance,
}

impl PinHandle {
    pub(crate) fn new(instance: WeakInstance) -> Self {
        Self { instance }
    }

    pub fn pin(&self) {
        self.instance.schedule();
    }
}

impl PartialEq for PinHandle {
    fn eq(&self, other: &Self) -> bool {
        self.instance.ptr_eq(&other.instance)
    }
}

impl std::fmt::Debug for PinHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PinHandle(..)")
    }
}


//! Standard runtime services backed by Rust's `std` library.
//!
//! `anchor-core`'s batching runner only records that a flush became pending;
//! something host-side has to notice and drain it. This crate provides that
//! glue for plain `std` embeddings: [`StdScheduler`] latches the request in
//! an atomic flag and pokes an optional waker, and [`StdRunner`] bundles it
//! with a [`BatchRunner`] behind a poll-style API.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use anchor_core::{BatchRunner, FlushScheduler, Instance, Runner};

/// Scheduler that latches flush requests and wakes a registered callback.
pub struct StdScheduler {
    flush_requested: AtomicBool,
    waker: RwLock<Option<Arc<dyn Fn() + Send + Sync + 'static>>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            flush_requested: AtomicBool::new(false),
            waker: RwLock::new(None),
        }
    }

    /// Returns whether a flush has been requested since the last call.
    pub fn take_flush_request(&self) -> bool {
        self.flush_requested.swap(false, Ordering::SeqCst)
    }

    /// Registers a waker invoked whenever a new flush is scheduled.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self.waker.write().unwrap() = Some(Arc::new(waker));
    }

    /// Clears any registered waker.
    pub fn clear_waker(&self) {
        *self.waker.write().unwrap() = None;
    }

    fn wake(&self) {
        let waker = self.waker.read().unwrap().clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field(
                "flush_requested",
                &self.flush_requested.load(Ordering::SeqCst),
            )
            .finish()
    }
}

impl FlushScheduler for StdScheduler {
    fn schedule_flush(&self) {
        self.flush_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Convenience bundle of the standard scheduler and the batching runner.
#[derive(Clone)]
pub struct StdRunner {
    scheduler: Arc<StdScheduler>,
    runner: Rc<BatchRunner>,
}

impl StdRunner {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let runner = BatchRunner::new(scheduler.clone());
        Self { scheduler, runner }
    }

    /// The runner to hand to [`anchor_core::Root::mount`].
    pub fn runner(&self) -> Rc<BatchRunner> {
        Rc::clone(&self.runner)
    }

    /// The scheduler implementation.
    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Returns whether a flush was requested since the last poll.
    pub fn take_flush_request(&self) -> bool {
        self.scheduler.take_flush_request()
    }

    /// Registers a waker called when the runner schedules a flush.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_waker(waker);
    }

    /// Clears any previously registered waker.
    pub fn clear_waker(&self) {
        self.scheduler.clear_waker();
    }

    /// Drain pending updates if a flush was requested. Returns whether one
    /// ran.
    pub fn run_pending(&self) -> bool {
        if self.take_flush_request() {
            self.runner.flush();
            true
        } else {
            false
        }
    }
}

impl Default for StdRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner for StdRunner {
    fn add(&self, instance: Instance) {
        self.runner.add(instance);
    }
}

impl fmt::Debug for StdRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRunner")
            .field("scheduler", &self.scheduler)
            .finish()
    }
}

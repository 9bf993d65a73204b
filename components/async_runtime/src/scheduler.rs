//! Deferred dispatch of promise jobs.
//!
//! Settlement cells never run reactions inline. They hand each job to the
//! [`Scheduler`] they were created with, and the host decides when to drain.
//! [`EventLoop`](crate::EventLoop) is the production host; [`ManualScheduler`]
//! is a hand-stepped host for tests and embedding.

use crate::task_queue::{MicroTask, MicrotaskQueue};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

/// Host hook that accepts deferred callbacks.
///
/// Implementations must queue the callback and run it later, in FIFO order,
/// never from inside `schedule` itself.
pub trait Scheduler {
    /// Queues a callback for a later tick.
    fn schedule(&self, microtask: MicroTask);
}

/// Shared handle to the scheduler a promise dispatches through.
pub type SchedulerHandle = Rc<dyn Scheduler>;

/// Returns true if both handles point at the same scheduler instance.
pub(crate) fn same_scheduler(a: &SchedulerHandle, b: &SchedulerHandle) -> bool {
    Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
}

/// Runs the microtasks that were queued when the drain started.
///
/// Microtasks scheduled by a running callback stay queued for the next drain.
/// The queue is never borrowed while a callback runs.
pub(crate) fn drain_snapshot(queue: &RefCell<MicrotaskQueue>) -> usize {
    let observed = queue.borrow().len();
    let mut ran = 0;
    while ran < observed {
        let next = queue.borrow_mut().dequeue();
        match next {
            Some(microtask) => microtask.run(),
            None => break,
        }
        ran += 1;
    }
    if ran > 0 {
        trace!(ran, "drained microtasks");
    }
    ran
}

/// A scheduler that only runs jobs when asked to.
///
/// # Examples
///
/// ```
/// use async_runtime::{ManualScheduler, Promise, SchedulerHandle};
/// use core_types::Value;
/// use std::rc::Rc;
///
/// let scheduler = Rc::new(ManualScheduler::new());
/// let handle: SchedulerHandle = scheduler.clone();
///
/// let promise = Promise::new(&handle);
/// let doubled = promise.then_fulfilled(|v| match v {
///     Value::Smi(n) => Ok(Value::Smi(n * 2).into()),
///     other => Ok(other.into()),
/// });
/// promise.resolve(Value::Smi(21));
///
/// assert!(doubled.is_pending());
/// scheduler.run_until_idle();
/// assert_eq!(doubled.state().value(), Some(&Value::Smi(42)));
/// ```
#[derive(Debug, Default)]
pub struct ManualScheduler {
    queue: RefCell<MicrotaskQueue>,
}

impl ManualScheduler {
    /// Creates a scheduler with an empty queue.
    pub fn new() -> Self {
        Self {
            queue: RefCell::new(MicrotaskQueue::new()),
        }
    }

    /// Number of queued callbacks.
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Returns true if nothing is queued.
    pub fn is_idle(&self) -> bool {
        self.queue.borrow().is_empty()
    }

    /// Runs one drain pass and returns how many callbacks ran.
    pub fn drain(&self) -> usize {
        drain_snapshot(&self.queue)
    }

    /// Drains repeatedly until the queue stays empty.
    pub fn run_until_idle(&self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.drain();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, microtask: MicroTask) {
        self.queue.borrow_mut().enqueue(microtask);
    }
}

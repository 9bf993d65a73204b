//! Timers and the promise helpers built on them.
//!
//! [`TimerHeap`] orders pending timers by due time, then by insertion order.
//! Armed timers own their tasks, and through them the promises those tasks
//! settle, so a loop that is abandoned early must be [`EventLoop::shutdown`].
//! The helpers turn timers into promises: [`delay`] is the classic
//! `timeout(ms)` helper and [`with_timeout`] races a promise against a
//! delayed rejection.

use crate::combinators::race;
use crate::event_loop::EventLoop;
use crate::promise::Promise;
use crate::reaction::Handler;
use crate::scheduler::SchedulerHandle;
use crate::task_queue::Task;
use core_types::{JsError, Value};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// Identifier returned by [`EventLoop::set_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

struct Timer {
    due: Duration,
    seq: u64,
    task: Task,
}

impl Timer {
    fn id(&self) -> TimerId {
        TimerId(self.seq)
    }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so the BinaryHeap pops the earliest (due, seq) first.
impl Ord for Timer {
    fn cmp(&self, other: &Self) -> Ordering {
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

/// Pending timers ordered by due time.
#[derive(Default)]
pub struct TimerHeap {
    heap: BinaryHeap<Timer>,
    next_seq: u64,
}

impl TimerHeap {
    /// Creates an empty heap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms a timer that becomes due at `due` on the loop clock.
    pub fn insert(&mut self, due: Duration, task: Task) -> TimerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let timer = Timer { due, seq, task };
        let id = timer.id();
        self.heap.push(timer);
        id
    }

    /// Disarms a timer and drops its task. Returns false if it already
    /// fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.heap.len();
        self.heap.retain(|timer| timer.id() != id);
        self.heap.len() != before
    }

    /// Due time of the earliest timer.
    pub fn next_due(&self) -> Option<Duration> {
        self.heap.peek().map(|timer| timer.due)
    }

    /// Removes and returns the earliest timer if it is due at `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(TimerId, Task)> {
        if self.heap.peek().is_some_and(|timer| timer.due <= now) {
            let timer = self.heap.pop()?;
            return Some((timer.id(), timer.task));
        }
        None
    }

    /// Removes every timer, returning their tasks unrun.
    pub fn take_all(&mut self) -> Vec<Task> {
        std::mem::take(&mut self.heap)
            .into_iter()
            .map(|timer| timer.task)
            .collect()
    }

    /// Number of armed timers.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns true if no timers are armed.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl fmt::Debug for TimerHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHeap")
            .field("armed", &self.heap.len())
            .finish()
    }
}

fn handle(event_loop: &Rc<EventLoop>) -> SchedulerHandle {
    event_loop.clone()
}

/// A promise fulfilled with `undefined` after `duration`.
///
/// # Examples
///
/// ```
/// use async_runtime::{delay, EventLoop};
/// use core_types::Value;
/// use std::rc::Rc;
/// use std::time::Duration;
///
/// let event_loop = Rc::new(EventLoop::new());
/// let promise = delay(&event_loop, Duration::from_millis(1000));
///
/// let state = event_loop.run_until_settled(&promise).unwrap();
/// assert_eq!(state.value(), Some(&Value::Undefined));
/// assert_eq!(event_loop.now(), Duration::from_millis(1000));
/// ```
pub fn delay(event_loop: &Rc<EventLoop>, duration: Duration) -> Promise {
    Promise::with_executor(&handle(event_loop), |resolvers| {
        event_loop.set_timeout(
            duration,
            Task::new(move || {
                resolvers.resolve(Value::Undefined);
                Ok(())
            }),
        );
        Ok(())
    })
}

/// A promise rejected with `reason` after `duration`.
pub fn delayed_rejection(
    event_loop: &Rc<EventLoop>,
    duration: Duration,
    reason: impl Into<Value>,
) -> Promise {
    let reason = reason.into();
    Promise::with_executor(&handle(event_loop), |resolvers| {
        event_loop.set_timeout(
            duration,
            Task::new(move || {
                resolvers.reject(reason);
                Ok(())
            }),
        );
        Ok(())
    })
}

/// Races `promise` against a rejection after `limit`.
///
/// The rejection reason is an `Error("Timed out after <ms>ms")`. The
/// deadline timer is cleared as soon as `promise` settles.
pub fn with_timeout(event_loop: &Rc<EventLoop>, promise: &Promise, limit: Duration) -> Promise {
    let scheduler = handle(event_loop);
    let message = format!("Timed out after {}ms", limit.as_millis());

    let mut timer = None;
    let deadline = Promise::with_executor(&scheduler, |resolvers| {
        timer = Some(event_loop.set_timeout(
            limit,
            Task::new(move || {
                resolvers.reject(JsError::error(message));
                Ok(())
            }),
        ));
        Ok(())
    });

    if let Some(id) = timer {
        let on_fulfilled = Rc::downgrade(event_loop);
        let on_rejected = on_fulfilled.clone();
        promise.then(
            Some(Handler::new(move |value| {
                if let Some(event_loop) = on_fulfilled.upgrade() {
                    event_loop.clear_timeout(id);
                }
                Ok(value.into())
            })),
            Some(Handler::new(move |reason| {
                if let Some(event_loop) = on_rejected.upgrade() {
                    event_loop.clear_timeout(id);
                }
                Err(reason)
            })),
        );
    }

    race(&scheduler, [promise.clone(), deadline])
}

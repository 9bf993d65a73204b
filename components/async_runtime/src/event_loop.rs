//! Event loop implementation.
//!
//! This module provides the host loop that coordinates task, timer and
//! microtask execution. Each iteration (turn) of the loop:
//! 1. Drains microtasks queued from outside the loop
//! 2. Takes the oldest queued task, or else the earliest due timer
//! 3. Runs it
//! 4. Drains the microtask queue until it stays empty
//!
//! When only timers remain, the clock moves to the next due timer: instantly
//! on the virtual clock, by sleeping on the real-time clock. Timer due times
//! saturate at `Duration::MAX`.
//!
//! Queued tasks and armed timers hold the promises they settle, and those
//! promises hold the loop. A loop abandoned with work still queued must be
//! [`shutdown`](EventLoop::shutdown) to release it.

use crate::error::{RuntimeError, RuntimeResult};
use crate::promise::{Promise, PromiseState};
use crate::scheduler::{drain_snapshot, Scheduler};
use crate::task_queue::{MicroTask, MicrotaskQueue, Task, TaskQueue};
use crate::timers::{TimerHeap, TimerId};
use std::cell::{Cell, RefCell};
use std::time::{Duration, Instant};
use tracing::debug;

/// How the loop measures time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClockMode {
    /// Time only moves when the loop is idle and a timer is pending.
    #[default]
    Virtual,
    /// Wall-clock time; the loop sleeps until the next timer is due.
    Realtime,
}

/// Event loop settings.
///
/// # Examples
///
/// ```
/// use async_runtime::{ClockMode, EventLoopConfig};
///
/// let config = EventLoopConfig::default()
///     .with_clock(ClockMode::Realtime)
///     .with_max_turns(10_000);
/// assert_eq!(config.max_turns, Some(10_000));
/// ```
#[derive(Debug, Clone, Default)]
pub struct EventLoopConfig {
    /// Clock driving the timers
    pub clock: ClockMode,
    /// Upper bound on loop turns, if any
    pub max_turns: Option<u64>,
}

impl EventLoopConfig {
    /// Select the clock
    pub fn with_clock(mut self, clock: ClockMode) -> Self {
        self.clock = clock;
        self
    }

    /// Bound the number of turns
    pub fn with_max_turns(mut self, max_turns: u64) -> Self {
        self.max_turns = Some(max_turns);
        self
    }
}

#[derive(Debug)]
enum Clock {
    Virtual(Cell<Duration>),
    Realtime(Instant),
}

impl Clock {
    fn new(mode: ClockMode) -> Self {
        match mode {
            ClockMode::Virtual => Clock::Virtual(Cell::new(Duration::ZERO)),
            ClockMode::Realtime => Clock::Realtime(Instant::now()),
        }
    }

    fn now(&self) -> Duration {
        match self {
            Clock::Virtual(elapsed) => elapsed.get(),
            Clock::Realtime(start) => start.elapsed(),
        }
    }

    fn advance_to(&self, due: Duration) {
        let now = self.now();
        if due <= now {
            return;
        }
        match self {
            Clock::Virtual(elapsed) => elapsed.set(due),
            Clock::Realtime(_) => std::thread::sleep(due - now),
        }
    }
}

/// The host event loop.
///
/// The loop is shared as `Rc<EventLoop>`: promises hold it as their
/// [`Scheduler`], and tasks may enqueue more work while the loop runs.
///
/// # Examples
///
/// ```
/// use async_runtime::{EventLoop, Promise, SchedulerHandle, Task};
/// use core_types::Value;
/// use std::rc::Rc;
///
/// let event_loop = Rc::new(EventLoop::new());
/// let handle: SchedulerHandle = event_loop.clone();
///
/// let promise = Promise::new(&handle);
/// let resolver = promise.clone();
/// event_loop.enqueue_task(Task::new(move || {
///     resolver.resolve(Value::Smi(1));
///     Ok(())
/// }));
///
/// let state = event_loop.run_until_settled(&promise).unwrap();
/// assert_eq!(state.value(), Some(&Value::Smi(1)));
/// ```
#[derive(Debug)]
pub struct EventLoop {
    config: EventLoopConfig,
    clock: Clock,
    task_queue: RefCell<TaskQueue>,
    microtask_queue: RefCell<MicrotaskQueue>,
    timers: RefCell<TimerHeap>,
    turns: Cell<u64>,
}

impl EventLoop {
    /// Creates a new EventLoop with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EventLoopConfig::default())
    }

    /// Creates a new EventLoop with empty queues.
    pub fn with_config(config: EventLoopConfig) -> Self {
        Self {
            clock: Clock::new(config.clock),
            config,
            task_queue: RefCell::new(TaskQueue::new()),
            microtask_queue: RefCell::new(MicrotaskQueue::new()),
            timers: RefCell::new(TimerHeap::new()),
            turns: Cell::new(0),
        }
    }

    /// The configuration this loop was built with.
    pub fn config(&self) -> &EventLoopConfig {
        &self.config
    }

    /// Time elapsed on the loop clock.
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Number of turns run so far.
    pub fn turns(&self) -> u64 {
        self.turns.get()
    }

    /// Adds a task to the task queue.
    pub fn enqueue_task(&self, task: Task) {
        self.task_queue.borrow_mut().enqueue(task);
    }

    /// Adds a microtask to the microtask queue.
    pub fn enqueue_microtask(&self, microtask: MicroTask) {
        self.microtask_queue.borrow_mut().enqueue(microtask);
    }

    /// Returns true if the task queue is empty.
    pub fn is_task_queue_empty(&self) -> bool {
        self.task_queue.borrow().is_empty()
    }

    /// Returns true if the microtask queue is empty.
    pub fn is_microtask_queue_empty(&self) -> bool {
        self.microtask_queue.borrow().is_empty()
    }

    /// Number of armed timers.
    pub fn pending_timers(&self) -> usize {
        self.timers.borrow().len()
    }

    /// Returns true if any task, microtask or timer is outstanding.
    pub fn has_pending_work(&self) -> bool {
        !self.is_task_queue_empty() || !self.is_microtask_queue_empty() || self.pending_timers() > 0
    }

    /// Arms a timer that enqueues `task` once `delay` has elapsed.
    pub fn set_timeout(&self, delay: Duration, task: Task) -> TimerId {
        let due = self.now().saturating_add(delay);
        let id = self.timers.borrow_mut().insert(due, task);
        debug!(timer = %id, due_ms = due.as_millis() as u64, "timer armed");
        id
    }

    /// Disarms a timer. Returns false if it already fired or was cleared.
    pub fn clear_timeout(&self, id: TimerId) -> bool {
        let cleared = self.timers.borrow_mut().cancel(id);
        if cleared {
            debug!(timer = %id, "timer cleared");
        }
        cleared
    }

    /// Discards every queued task, microtask and timer without running them.
    ///
    /// Returns how many were discarded. The loop stays usable afterwards.
    pub fn shutdown(&self) -> usize {
        let tasks = std::mem::take(&mut *self.task_queue.borrow_mut());
        let microtasks = std::mem::take(&mut *self.microtask_queue.borrow_mut());
        let timers = self.timers.borrow_mut().take_all();

        let discarded = tasks.len() + microtasks.len() + timers.len();
        debug!(
            tasks = tasks.len(),
            microtasks = microtasks.len(),
            timers = timers.len(),
            "event loop shut down"
        );
        discarded
    }

    /// Runs the microtasks queued at the moment of the call.
    ///
    /// Microtasks they schedule wait for the next drain.
    pub fn drain_microtasks(&self) -> usize {
        drain_snapshot(&self.microtask_queue)
    }

    /// Drains microtasks until the queue stays empty.
    pub fn run_microtasks(&self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.drain_microtasks();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }

    /// Runs one turn: one task or due timer, then all microtasks.
    ///
    /// Microtasks already queued run first, before the clock may move.
    /// Returns `Ok(false)` when there was nothing to do.
    pub fn process_one_cycle(&self) -> RuntimeResult<bool> {
        let drained = self.run_microtasks();
        if !self.has_pending_work() {
            return Ok(drained > 0);
        }
        if let Some(limit) = self.config.max_turns {
            if self.turns.get() >= limit {
                return Err(RuntimeError::TurnLimitExceeded { limit });
            }
        }

        let turn = self.turns.get() + 1;
        self.turns.set(turn);

        if let Some(task) = self.next_task() {
            debug!(turn, now_ms = self.now().as_millis() as u64, "running task");
            task.run()?;
        }
        self.run_microtasks();
        Ok(true)
    }

    /// Runs the loop until no tasks, timers or microtasks remain.
    pub fn run_until_done(&self) -> RuntimeResult<()> {
        while self.process_one_cycle()? {}
        Ok(())
    }

    /// Runs the loop until `promise` settles and returns its final state.
    ///
    /// Fails with [`RuntimeError::Stalled`] if the loop runs out of work
    /// first.
    pub fn run_until_settled(&self, promise: &Promise) -> RuntimeResult<PromiseState> {
        // Settlement by already-queued reactions must not cost a timer turn.
        self.run_microtasks();
        loop {
            if !promise.is_pending() {
                return Ok(promise.state());
            }
            if !self.process_one_cycle()? {
                debug!(promise = %promise.id(), "loop idle with pending promise");
                return Err(RuntimeError::Stalled {
                    promise: promise.id(),
                });
            }
        }
    }

    fn next_task(&self) -> Option<Task> {
        let queued = self.task_queue.borrow_mut().dequeue();
        if queued.is_some() {
            return queued;
        }

        let now = self.now();
        let due = self.timers.borrow_mut().pop_due(now);
        if let Some((id, task)) = due {
            debug!(timer = %id, "timer fired");
            return Some(task);
        }

        let next_due = self.timers.borrow().next_due()?;
        self.clock.advance_to(next_due);
        let now = self.now();
        let (id, task) = self.timers.borrow_mut().pop_due(now)?;
        debug!(timer = %id, now_ms = now.as_millis() as u64, "clock advanced, timer fired");
        Some(task)
    }
}

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for EventLoop {
    fn schedule(&self, microtask: MicroTask) {
        self.enqueue_microtask(microtask);
    }
}

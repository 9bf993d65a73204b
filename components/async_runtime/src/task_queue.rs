//! Task and microtask queue management.
//!
//! Tasks are host callbacks (timer expirations, scripted steps) executed one
//! per event loop cycle. Microtasks are promise jobs; they run after each
//! task and can never fail, since every promise job captures its own faults.

use core_types::JsError;
use std::collections::VecDeque;

/// A task to be executed by the event loop.
///
/// Tasks represent work to be done in a later iteration of the event loop,
/// such as a timer callback.
pub struct Task {
    callback: Box<dyn FnOnce() -> Result<(), JsError>>,
}

impl Task {
    /// Creates a new Task from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() -> Result<(), JsError> + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Executes the task.
    pub fn run(self) -> Result<(), JsError> {
        (self.callback)()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Task {{ ... }}")
    }
}

/// A deferred callback dispatched by a [`Scheduler`](crate::Scheduler).
///
/// Promise reactions and thenable adoption jobs are microtasks.
pub struct MicroTask {
    callback: Box<dyn FnOnce()>,
}

impl MicroTask {
    /// Creates a new MicroTask from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Executes the microtask.
    pub fn run(self) {
        (self.callback)()
    }
}

impl std::fmt::Debug for MicroTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MicroTask {{ ... }}")
    }
}

/// A FIFO queue for tasks.
#[derive(Debug, Default)]
pub struct TaskQueue {
    queue: VecDeque<Task>,
}

impl TaskQueue {
    /// Creates a new empty TaskQueue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adds a task to the end of the queue.
    pub fn enqueue(&mut self, task: Task) {
        self.queue.push_back(task);
    }

    /// Removes and returns the next task from the queue.
    pub fn dequeue(&mut self) -> Option<Task> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of tasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

/// A FIFO queue for microtasks.
#[derive(Debug, Default)]
pub struct MicrotaskQueue {
    queue: VecDeque<MicroTask>,
}

impl MicrotaskQueue {
    /// Creates a new empty MicrotaskQueue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Adds a microtask to the end of the queue.
    pub fn enqueue(&mut self, microtask: MicroTask) {
        self.queue.push_back(microtask);
    }

    /// Removes and returns the next microtask from the queue.
    pub fn dequeue(&mut self) -> Option<MicroTask> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of microtasks in the queue.
    pub fn len(&self) -> usize {
        self.queue.len()
    }
}

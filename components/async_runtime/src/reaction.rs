//! Reaction records and the per-promise reaction queue.

use crate::promise::{Outcome, Promise, Resolution};
use crate::task_queue::MicroTask;
use core_types::Value;
use std::collections::VecDeque;

/// What a handler produces: a resolution for the downstream promise, or a
/// thrown value that rejects it.
pub type HandlerResult = Result<Resolution, Value>;

/// A fulfillment or rejection callback registered through `then`.
pub struct Handler {
    callback: Box<dyn FnOnce(Value) -> HandlerResult>,
}

impl Handler {
    /// Creates a new Handler from a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Value) -> HandlerResult + 'static,
    {
        Self {
            callback: Box::new(f),
        }
    }

    /// Calls the handler with the settled value or reason.
    pub fn call(self, arg: Value) -> HandlerResult {
        (self.callback)(arg)
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Handler {{ ... }}")
    }
}

/// One registered interest in a promise's outcome.
///
/// The downstream promise carries whatever the selected handler produces.
#[derive(Debug)]
pub struct Reaction {
    downstream: Promise,
    on_fulfilled: Option<Handler>,
    on_rejected: Option<Handler>,
}

impl Reaction {
    pub(crate) fn new(
        downstream: Promise,
        on_fulfilled: Option<Handler>,
        on_rejected: Option<Handler>,
    ) -> Self {
        Self {
            downstream,
            on_fulfilled,
            on_rejected,
        }
    }

    /// Wraps this reaction into the job that runs it against `outcome`.
    pub(crate) fn into_job(self, outcome: Outcome) -> MicroTask {
        MicroTask::new(move || self.run(outcome))
    }

    fn run(self, outcome: Outcome) {
        let Reaction {
            downstream,
            on_fulfilled,
            on_rejected,
        } = self;

        let (handler, arg, fulfilled) = match outcome {
            Outcome::Fulfilled(value) => (on_fulfilled, value, true),
            Outcome::Rejected(reason) => (on_rejected, reason, false),
        };

        match handler {
            // Pass-through keeps the outcome kind unchanged.
            None if fulfilled => downstream.resolve(arg),
            None => downstream.reject(arg),
            Some(handler) => match handler.call(arg) {
                Ok(resolution) => downstream.resolve(resolution),
                Err(thrown) => downstream.reject(thrown),
            },
        }
    }
}

/// FIFO list of reactions waiting on a pending promise.
///
/// Sealed when the promise settles; later registrations go straight to the
/// scheduler and a push onto a sealed queue hands the reaction back.
#[derive(Debug, Default)]
pub struct ReactionQueue {
    reactions: VecDeque<Reaction>,
    sealed: bool,
}

impl ReactionQueue {
    /// Creates an open, empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a reaction, or returns it if the queue is sealed.
    pub fn push(&mut self, reaction: Reaction) -> Result<(), Reaction> {
        if self.sealed {
            return Err(reaction);
        }
        self.reactions.push_back(reaction);
        Ok(())
    }

    /// Seals the queue and returns its contents in registration order.
    pub fn seal(&mut self) -> VecDeque<Reaction> {
        self.sealed = true;
        std::mem::take(&mut self.reactions)
    }

    /// Returns true once the queue has been sealed.
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Number of waiting reactions.
    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    /// Returns true if no reactions are waiting.
    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty()
    }
}

//! Single-threaded promise runtime.
//!
//! This crate provides a from-scratch future value runtime:
//! - Settlement cells with once-only transitions and thenable adoption
//! - Per-cell reaction queues dispatched on a deferred tick
//! - `all` / `race` combinators built on the public promise surface
//! - A host event loop with task, microtask and timer queues
//!
//! # Overview
//!
//! - [`Promise`] - Shared handle to one settlement cell
//! - [`Scheduler`] - Host hook that runs deferred callbacks
//! - [`EventLoop`] - Host loop; the production [`Scheduler`]
//! - [`ManualScheduler`] - Hand-stepped [`Scheduler`] for tests
//! - [`all`], [`race`] - Combinators
//! - [`delay`], [`with_timeout`] - Timer-backed promises
//!
//! # Examples
//!
//! ## Chaining on the event loop
//!
//! ```
//! use async_runtime::{delay, EventLoop};
//! use core_types::{JsError, Value};
//! use std::rc::Rc;
//! use std::time::Duration;
//!
//! let event_loop = Rc::new(EventLoop::new());
//!
//! let recovered = delay(&event_loop, Duration::from_millis(10))
//!     .then_fulfilled(|_| Err(JsError::error("Random error").into()))
//!     .catch(|reason| Ok(Value::from(format!("caught {}", reason)).into()));
//!
//! let state = event_loop.run_until_settled(&recovered).unwrap();
//! assert_eq!(state.value(), Some(&Value::from("caught Error: Random error")));
//! ```
//!
//! ## Stepping by hand
//!
//! ```
//! use async_runtime::{ManualScheduler, Promise, SchedulerHandle};
//! use core_types::Value;
//! use std::rc::Rc;
//!
//! let scheduler = Rc::new(ManualScheduler::new());
//! let handle: SchedulerHandle = scheduler.clone();
//!
//! let promise = Promise::resolved(&handle, Value::Smi(1));
//! let next = promise.then(None, None);
//! assert!(next.is_pending());
//!
//! scheduler.drain();
//! assert_eq!(next.state().value(), Some(&Value::Smi(1)));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod combinators;
pub mod error;
pub mod event_loop;
pub mod promise;
pub mod reaction;
pub mod scheduler;
pub mod task_queue;
pub mod timers;

// Re-export main types at crate root
pub use combinators::{all, race};
pub use error::{RuntimeError, RuntimeResult};
pub use event_loop::{ClockMode, EventLoop, EventLoopConfig};
pub use promise::{
    Outcome, Promise, PromiseId, PromiseState, Resolution, ResolvingFunctions, Thenable,
    ThenableRef,
};
pub use reaction::{Handler, HandlerResult, Reaction, ReactionQueue};
pub use scheduler::{ManualScheduler, Scheduler, SchedulerHandle};
pub use task_queue::{MicroTask, MicrotaskQueue, Task, TaskQueue};
pub use timers::{delay, delayed_rejection, with_timeout, TimerHeap, TimerId};

//! `all` and `race`.
//!
//! Both are built only from the public promise surface: they register
//! reactions on their inputs and settle a downstream promise. Plain values
//! among the inputs are lifted with [`Promise::resolved`] first.

use crate::promise::{Promise, Resolution};
use crate::reaction::Handler;
use crate::scheduler::SchedulerHandle;
use core_types::Value;
use std::cell::RefCell;
use std::rc::Rc;
use tracing::trace;

fn lift<I>(scheduler: &SchedulerHandle, inputs: I) -> Vec<Promise>
where
    I: IntoIterator,
    I::Item: Into<Resolution>,
{
    inputs
        .into_iter()
        .map(|input| Promise::resolved(scheduler, input))
        .collect()
}

struct AllState {
    results: Vec<Value>,
    remaining: usize,
}

/// Fulfills with every input's value, in input order, once all inputs have
/// fulfilled; rejects with the first rejection reason.
///
/// An empty input fulfills immediately with an empty array.
///
/// # Examples
///
/// ```
/// use async_runtime::{all, ManualScheduler, Promise, SchedulerHandle};
/// use core_types::Value;
/// use std::rc::Rc;
///
/// let scheduler = Rc::new(ManualScheduler::new());
/// let handle: SchedulerHandle = scheduler.clone();
///
/// let first = Promise::new(&handle);
/// let second = Promise::new(&handle);
/// let both = all(&handle, [first.clone(), second.clone()]);
///
/// second.resolve(Value::Smi(2));
/// first.resolve(Value::Smi(1));
/// scheduler.run_until_idle();
///
/// assert_eq!(
///     both.state().value(),
///     Some(&Value::Array(vec![Value::Smi(1), Value::Smi(2)]))
/// );
/// ```
pub fn all<I>(scheduler: &SchedulerHandle, inputs: I) -> Promise
where
    I: IntoIterator,
    I::Item: Into<Resolution>,
{
    let downstream = Promise::new(scheduler);
    let inputs = lift(scheduler, inputs);
    trace!(promise = %downstream.id(), inputs = inputs.len(), "all");

    if inputs.is_empty() {
        downstream.resolve(Value::Array(Vec::new()));
        return downstream;
    }

    let book = Rc::new(RefCell::new(AllState {
        results: vec![Value::Undefined; inputs.len()],
        remaining: inputs.len(),
    }));

    for (index, input) in inputs.iter().enumerate() {
        let book = Rc::clone(&book);
        let on_fulfilled = downstream.clone();
        let on_rejected = downstream.clone();
        input.then(
            Some(Handler::new(move |value| {
                let finished = {
                    let mut book = book.borrow_mut();
                    book.results[index] = value;
                    book.remaining -= 1;
                    (book.remaining == 0).then(|| std::mem::take(&mut book.results))
                };
                if let Some(results) = finished {
                    on_fulfilled.resolve(Value::Array(results));
                }
                Ok(Value::Undefined.into())
            })),
            Some(Handler::new(move |reason| {
                on_rejected.reject(reason);
                Ok(Value::Undefined.into())
            })),
        );
    }

    downstream
}

/// Settles like whichever input settles first.
///
/// An empty input never settles.
pub fn race<I>(scheduler: &SchedulerHandle, inputs: I) -> Promise
where
    I: IntoIterator,
    I::Item: Into<Resolution>,
{
    let downstream = Promise::new(scheduler);
    let inputs = lift(scheduler, inputs);
    trace!(promise = %downstream.id(), inputs = inputs.len(), "race");

    for input in &inputs {
        let on_fulfilled = downstream.clone();
        let on_rejected = downstream.clone();
        input.then(
            Some(Handler::new(move |value| {
                on_fulfilled.resolve(value);
                Ok(Value::Undefined.into())
            })),
            Some(Handler::new(move |reason| {
                on_rejected.reject(reason);
                Ok(Value::Undefined.into())
            })),
        );
    }

    downstream
}

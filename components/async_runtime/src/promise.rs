//! Promise settlement cells.
//!
//! A [`Promise`] is a shared handle to one settlement cell. The cell starts
//! `Pending` and settles at most once, to `Fulfilled(value)` or
//! `Rejected(reason)`. Resolving with a [`Thenable`] makes the cell adopt that
//! thenable's eventual outcome instead of settling immediately.
//!
//! Reactions registered with [`Promise::then`] always run on a later
//! scheduler tick, never inside the call that settled the cell.

use crate::reaction::{Handler, HandlerResult, Reaction, ReactionQueue};
use crate::scheduler::{same_scheduler, SchedulerHandle};
use crate::task_queue::MicroTask;
use core_types::{JsError, Value};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

static NEXT_PROMISE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a settlement cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PromiseId(u64);

impl PromiseId {
    fn next() -> Self {
        PromiseId(NEXT_PROMISE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for PromiseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The state of a Promise.
///
/// Once settled (Fulfilled or Rejected), a Promise cannot change state.
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    /// Neither fulfilled nor rejected yet.
    Pending,
    /// Fulfilled with a value.
    Fulfilled(Value),
    /// Rejected with a reason.
    Rejected(Value),
}

impl PromiseState {
    /// Returns true while the promise is unsettled.
    pub fn is_pending(&self) -> bool {
        matches!(self, PromiseState::Pending)
    }

    /// Returns true if the promise fulfilled.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, PromiseState::Fulfilled(_))
    }

    /// Returns true if the promise rejected.
    pub fn is_rejected(&self) -> bool {
        matches!(self, PromiseState::Rejected(_))
    }

    /// The fulfillment value, if fulfilled.
    pub fn value(&self) -> Option<&Value> {
        match self {
            PromiseState::Fulfilled(v) => Some(v),
            _ => None,
        }
    }

    /// The rejection reason, if rejected.
    pub fn reason(&self) -> Option<&Value> {
        match self {
            PromiseState::Rejected(r) => Some(r),
            _ => None,
        }
    }

    pub(crate) fn outcome(&self) -> Option<Outcome> {
        match self {
            PromiseState::Pending => None,
            PromiseState::Fulfilled(v) => Some(Outcome::Fulfilled(v.clone())),
            PromiseState::Rejected(r) => Some(Outcome::Rejected(r.clone())),
        }
    }
}

/// A settled outcome, as delivered to reactions.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Fulfilled with a value.
    Fulfilled(Value),
    /// Rejected with a reason.
    Rejected(Value),
}

impl From<Outcome> for PromiseState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Fulfilled(v) => PromiseState::Fulfilled(v),
            Outcome::Rejected(r) => PromiseState::Rejected(r),
        }
    }
}

/// Something that can report its eventual outcome to a pair of resolving
/// functions.
///
/// A promise resolved with a thenable subscribes to it on a later tick and
/// adopts whatever the thenable reports first. Returning `Err` from
/// `subscribe` rejects the adopting promise unless one of the resolving
/// functions was already called.
pub trait Thenable {
    /// Registers the adopting promise's resolving functions.
    fn subscribe(&self, resolvers: ResolvingFunctions) -> Result<(), Value>;

    /// The underlying promise, when this thenable is one.
    fn as_promise(&self) -> Option<&Promise> {
        None
    }
}

/// Shared reference to a thenable.
pub type ThenableRef = Rc<dyn Thenable>;

/// What a promise can be resolved with.
#[derive(Clone)]
pub enum Resolution {
    /// A plain value; the promise fulfills with it.
    Value(Value),
    /// A thenable; the promise adopts its eventual outcome.
    Thenable(ThenableRef),
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Resolution::Thenable(t) => match t.as_promise() {
                Some(p) => f.debug_tuple("Thenable").field(&p.id()).finish(),
                None => write!(f, "Thenable(..)"),
            },
        }
    }
}

impl From<Value> for Resolution {
    fn from(value: Value) -> Self {
        Resolution::Value(value)
    }
}

impl From<Promise> for Resolution {
    fn from(promise: Promise) -> Self {
        Resolution::Thenable(Rc::new(promise))
    }
}

impl From<&Promise> for Resolution {
    fn from(promise: &Promise) -> Self {
        Resolution::Thenable(Rc::new(promise.clone()))
    }
}

impl From<ThenableRef> for Resolution {
    fn from(thenable: ThenableRef) -> Self {
        Resolution::Thenable(thenable)
    }
}

/// Which lock a pair of resolving functions checks before acting.
#[derive(Debug, Clone)]
enum ResolveGuard {
    /// The cell's own "already resolved" flag.
    Cell,
    /// A private flag for one thenable adoption.
    Adoption(Rc<Cell<bool>>),
}

/// The `(resolve, reject)` capability pair of a promise.
///
/// Clones share one lock: across all clones, only the first call to
/// `resolve` or `reject` has any effect.
#[derive(Debug, Clone)]
pub struct ResolvingFunctions {
    promise: Promise,
    guard: ResolveGuard,
}

impl ResolvingFunctions {
    /// Resolves the promise, adopting `resolution` if it is a thenable.
    pub fn resolve(&self, resolution: impl Into<Resolution>) {
        if self.acquire() {
            self.promise.resolve_locked(resolution.into());
        }
    }

    /// Rejects the promise with `reason`.
    pub fn reject(&self, reason: impl Into<Value>) {
        if self.acquire() {
            self.promise.settle(Outcome::Rejected(reason.into()));
        }
    }

    /// The promise these functions settle.
    pub fn promise(&self) -> &Promise {
        &self.promise
    }

    fn acquire(&self) -> bool {
        match &self.guard {
            ResolveGuard::Cell => self.promise.lock(),
            ResolveGuard::Adoption(flag) => !flag.replace(true),
        }
    }
}

struct Slot {
    state: PromiseState,
    reactions: ReactionQueue,
    /// Set by the first resolve/reject; later calls are ignored even while
    /// the cell is still adopting a thenable.
    already_resolved: bool,
}

struct Shared {
    id: PromiseId,
    scheduler: SchedulerHandle,
    slot: RefCell<Slot>,
}

/// A promise: shared handle to one settlement cell.
///
/// Cloning the handle does not create a new promise.
///
/// # Examples
///
/// ```
/// use async_runtime::{ManualScheduler, Promise, PromiseState, SchedulerHandle};
/// use core_types::Value;
/// use std::rc::Rc;
///
/// let scheduler = Rc::new(ManualScheduler::new());
/// let handle: SchedulerHandle = scheduler.clone();
///
/// let promise = Promise::new(&handle);
/// assert!(promise.is_pending());
///
/// promise.resolve(Value::Smi(42));
/// promise.resolve(Value::Smi(7)); // ignored
/// assert_eq!(promise.state(), PromiseState::Fulfilled(Value::Smi(42)));
/// ```
#[derive(Clone)]
pub struct Promise {
    shared: Rc<Shared>,
}

impl Promise {
    /// Creates a new pending Promise dispatching through `scheduler`.
    pub fn new(scheduler: &SchedulerHandle) -> Self {
        let id = PromiseId::next();
        trace!(promise = %id, "created");
        Self {
            shared: Rc::new(Shared {
                id,
                scheduler: Rc::clone(scheduler),
                slot: RefCell::new(Slot {
                    state: PromiseState::Pending,
                    reactions: ReactionQueue::new(),
                    already_resolved: false,
                }),
            }),
        }
    }

    /// Creates a promise and runs `executor` synchronously with its
    /// resolving functions.
    ///
    /// An `Err` from the executor rejects the promise unless it was already
    /// resolved.
    pub fn with_executor<F>(scheduler: &SchedulerHandle, executor: F) -> Self
    where
        F: FnOnce(ResolvingFunctions) -> Result<(), Value>,
    {
        let promise = Promise::new(scheduler);
        let resolvers = promise.resolving_functions();
        if let Err(thrown) = executor(resolvers.clone()) {
            resolvers.reject(thrown);
        }
        promise
    }

    /// Returns a promise resolved with `resolution`.
    ///
    /// A promise on the same scheduler is returned as is.
    pub fn resolved(scheduler: &SchedulerHandle, resolution: impl Into<Resolution>) -> Self {
        let resolution = resolution.into();
        if let Resolution::Thenable(thenable) = &resolution {
            if let Some(promise) = thenable.as_promise() {
                if same_scheduler(&promise.shared.scheduler, scheduler) {
                    return promise.clone();
                }
            }
        }
        let promise = Promise::new(scheduler);
        promise.resolve(resolution);
        promise
    }

    /// Returns a promise already rejected with `reason`.
    pub fn rejected(scheduler: &SchedulerHandle, reason: impl Into<Value>) -> Self {
        let promise = Promise::new(scheduler);
        promise.reject(reason);
        promise
    }

    /// This cell's identifier.
    pub fn id(&self) -> PromiseId {
        self.shared.id
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> PromiseState {
        self.shared.slot.borrow().state.clone()
    }

    /// Returns true while unsettled.
    pub fn is_pending(&self) -> bool {
        self.shared.slot.borrow().state.is_pending()
    }

    /// The scheduler this promise dispatches through.
    pub fn scheduler(&self) -> &SchedulerHandle {
        &self.shared.scheduler
    }

    /// Returns true if both handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }

    /// A `(resolve, reject)` pair sharing this cell's first-call-wins lock.
    pub fn resolving_functions(&self) -> ResolvingFunctions {
        ResolvingFunctions {
            promise: self.clone(),
            guard: ResolveGuard::Cell,
        }
    }

    /// Resolves the promise.
    ///
    /// A plain value fulfills it; a thenable makes it adopt the thenable's
    /// outcome. No effect once the promise has been resolved or rejected.
    pub fn resolve(&self, resolution: impl Into<Resolution>) {
        if self.lock() {
            self.resolve_locked(resolution.into());
        }
    }

    /// Rejects the promise. No effect once it has been resolved or rejected.
    pub fn reject(&self, reason: impl Into<Value>) {
        if self.lock() {
            self.settle(Outcome::Rejected(reason.into()));
        }
    }

    /// Registers a pair of handlers and returns the downstream promise.
    ///
    /// A missing handler passes the outcome through unchanged. A handler's
    /// `Ok` resolves the downstream promise, even from `on_rejected`; its
    /// `Err` rejects it. Handlers never run before this call returns.
    pub fn then(&self, on_fulfilled: Option<Handler>, on_rejected: Option<Handler>) -> Promise {
        let downstream = Promise::new(&self.shared.scheduler);
        let reaction = Reaction::new(downstream.clone(), on_fulfilled, on_rejected);

        let ready = {
            let mut slot = self.shared.slot.borrow_mut();
            match slot.state.outcome() {
                Some(outcome) => Some((reaction, outcome)),
                None => slot.reactions.push(reaction).err().map(|reaction| {
                    let reason = JsError::internal("reaction queue sealed on a pending promise");
                    (reaction, Outcome::Rejected(reason.into()))
                }),
            }
        };

        if let Some((reaction, outcome)) = ready {
            self.shared.scheduler.schedule(reaction.into_job(outcome));
        }
        trace!(promise = %self.id(), downstream = %downstream.id(), "reaction registered");
        downstream
    }

    /// Registers only a fulfillment handler.
    pub fn then_fulfilled<F>(&self, on_fulfilled: F) -> Promise
    where
        F: FnOnce(Value) -> HandlerResult + 'static,
    {
        self.then(Some(Handler::new(on_fulfilled)), None)
    }

    /// Registers only a rejection handler.
    pub fn catch<F>(&self, on_rejected: F) -> Promise
    where
        F: FnOnce(Value) -> HandlerResult + 'static,
    {
        self.then(None, Some(Handler::new(on_rejected)))
    }

    /// Takes the first-call lock. Returns false if already taken.
    fn lock(&self) -> bool {
        let mut slot = self.shared.slot.borrow_mut();
        if slot.already_resolved {
            return false;
        }
        slot.already_resolved = true;
        true
    }

    fn resolve_locked(&self, resolution: Resolution) {
        match resolution {
            Resolution::Value(value) => self.settle(Outcome::Fulfilled(value)),
            Resolution::Thenable(thenable) => {
                if thenable.as_promise().is_some_and(|inner| inner.ptr_eq(self)) {
                    let reason = JsError::type_error("Chaining cycle detected for promise");
                    self.settle(Outcome::Rejected(reason.into()));
                    return;
                }
                self.adopt(thenable);
            }
        }
    }

    /// Subscribes to `thenable` on the next tick.
    fn adopt(&self, thenable: ThenableRef) {
        trace!(promise = %self.id(), "adopting thenable");
        let resolvers = ResolvingFunctions {
            promise: self.clone(),
            guard: ResolveGuard::Adoption(Rc::new(Cell::new(false))),
        };
        self.shared.scheduler.schedule(MicroTask::new(move || {
            if let Err(thrown) = thenable.subscribe(resolvers.clone()) {
                resolvers.reject(thrown);
            }
        }));
    }

    /// Moves a pending cell to its final state and dispatches its reactions.
    fn settle(&self, outcome: Outcome) {
        let reactions = {
            let mut slot = self.shared.slot.borrow_mut();
            if !slot.state.is_pending() {
                return;
            }
            slot.state = outcome.clone().into();
            slot.reactions.seal()
        };

        trace!(
            promise = %self.id(),
            fulfilled = matches!(outcome, Outcome::Fulfilled(_)),
            reactions = reactions.len(),
            "settled"
        );
        for reaction in reactions {
            self.shared
                .scheduler
                .schedule(reaction.into_job(outcome.clone()));
        }
    }
}

impl Thenable for Promise {
    fn subscribe(&self, resolvers: ResolvingFunctions) -> Result<(), Value> {
        let on_reject = resolvers.clone();
        self.then(
            Some(Handler::new(move |value| {
                resolvers.resolve(value);
                Ok(Value::Undefined.into())
            })),
            Some(Handler::new(move |reason| {
                on_reject.reject(reason);
                Ok(Value::Undefined.into())
            })),
        );
        Ok(())
    }

    fn as_promise(&self) -> Option<&Promise> {
        Some(self)
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.shared.slot.borrow();
        f.debug_struct("Promise")
            .field("id", &self.shared.id)
            .field("state", &slot.state)
            .field("reactions", &slot.reactions.len())
            .finish()
    }
}

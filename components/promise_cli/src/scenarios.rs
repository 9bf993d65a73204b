//! Built-in scenarios.
//!
//! Each scenario builds one promise on a fresh event loop; the runner then
//! drives the loop until that promise settles.

use crate::error::{CliError, CliResult};
use async_runtime::{
    all, delay, delayed_rejection, race, with_timeout, EventLoop, Promise, ResolvingFunctions,
    SchedulerHandle, Task, Thenable, ThenableRef,
};
use core_types::{JsError, Value};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

/// A named promise program.
pub struct Scenario {
    /// Name used on the command line
    pub name: &'static str,
    /// One-line summary for `--list`
    pub description: &'static str,
    build: fn(&Rc<EventLoop>) -> Promise,
}

impl Scenario {
    /// Builds the scenario's promise on `event_loop`.
    pub fn build(&self, event_loop: &Rc<EventLoop>) -> Promise {
        (self.build)(event_loop)
    }
}

impl fmt::Debug for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scenario").field("name", &self.name).finish()
    }
}

/// Every registered scenario, in listing order.
pub static SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "timeout-chain",
        description: "wait 1s, wait 2s, throw, recover with all of two short waits",
        build: timeout_chain,
    },
    Scenario {
        name: "all-ordered",
        description: "all keeps input order when inputs finish out of order",
        build: all_ordered,
    },
    Scenario {
        name: "all-rejects",
        description: "all rejects with the first rejection",
        build: all_rejects,
    },
    Scenario {
        name: "race-first",
        description: "race follows the first input to settle",
        build: race_first,
    },
    Scenario {
        name: "catch-recovers",
        description: "catch turns a rejection into a fulfillment",
        build: catch_recovers,
    },
    Scenario {
        name: "thenable-adoption",
        description: "a promise adopts a timer-backed foreign thenable",
        build: thenable_adoption,
    },
    Scenario {
        name: "timeout-race",
        description: "a slow wait loses against its timeout",
        build: timeout_race,
    },
];

/// Looks up a scenario by name.
pub fn find(name: &str) -> CliResult<&'static Scenario> {
    SCENARIOS
        .iter()
        .find(|scenario| scenario.name == name)
        .ok_or_else(|| CliError::UnknownScenario(name.to_string()))
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn scheduler(event_loop: &Rc<EventLoop>) -> SchedulerHandle {
    event_loop.clone()
}

fn delayed_value(event_loop: &Rc<EventLoop>, wait: u64, value: Value) -> Promise {
    delay(event_loop, ms(wait)).then_fulfilled(move |_| Ok(value.into()))
}

fn timeout_chain(event_loop: &Rc<EventLoop>) -> Promise {
    let second = event_loop.clone();
    let recovery = event_loop.clone();
    delay(event_loop, ms(1000))
        .then_fulfilled(move |_| Ok(delay(&second, ms(2000)).into()))
        .then_fulfilled(|_| Err(JsError::error("Random error").into()))
        .catch(move |_| {
            let waits = [delay(&recovery, ms(100)), delay(&recovery, ms(200))];
            Ok(all(&scheduler(&recovery), waits).into())
        })
}

fn all_ordered(event_loop: &Rc<EventLoop>) -> Promise {
    let inputs = vec![
        delayed_value(event_loop, 300, Value::Smi(1)),
        delayed_value(event_loop, 100, Value::Smi(2)),
        Promise::resolved(&scheduler(event_loop), Value::Smi(3)),
    ];
    all(&scheduler(event_loop), inputs)
}

fn all_rejects(event_loop: &Rc<EventLoop>) -> Promise {
    let inputs = vec![
        delayed_value(event_loop, 100, Value::Smi(1)),
        delayed_rejection(event_loop, ms(50), JsError::error("boom")),
        delayed_value(event_loop, 200, Value::Smi(3)),
    ];
    all(&scheduler(event_loop), inputs)
}

fn race_first(event_loop: &Rc<EventLoop>) -> Promise {
    let inputs = vec![
        delayed_value(event_loop, 200, Value::from("slow")),
        delayed_value(event_loop, 100, Value::from("fast")),
    ];
    race(&scheduler(event_loop), inputs)
}

fn catch_recovers(event_loop: &Rc<EventLoop>) -> Promise {
    Promise::rejected(&scheduler(event_loop), JsError::error("Random error"))
        .catch(|reason| Ok(Value::from(format!("recovered from {}", reason)).into()))
}

/// Foreign thenable that reports a value once a timer fires.
struct TimerThenable {
    event_loop: Weak<EventLoop>,
    wait: Duration,
    value: Value,
}

impl Thenable for TimerThenable {
    fn subscribe(&self, resolvers: ResolvingFunctions) -> Result<(), Value> {
        let event_loop = self
            .event_loop
            .upgrade()
            .ok_or_else(|| Value::from(JsError::internal("event loop dropped")))?;
        let value = self.value.clone();
        event_loop.set_timeout(
            self.wait,
            Task::new(move || {
                resolvers.resolve(value);
                Ok(())
            }),
        );
        Ok(())
    }
}

fn thenable_adoption(event_loop: &Rc<EventLoop>) -> Promise {
    let thenable: ThenableRef = Rc::new(TimerThenable {
        event_loop: Rc::downgrade(event_loop),
        wait: ms(250),
        value: Value::from("adopted"),
    });
    Promise::resolved(&scheduler(event_loop), thenable)
}

fn timeout_race(event_loop: &Rc<EventLoop>) -> Promise {
    let slow = delay(event_loop, ms(5000));
    with_timeout(event_loop, &slow, ms(1000))
}

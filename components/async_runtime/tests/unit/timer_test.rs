//! Unit tests for timers and timer-backed promises

use async_runtime::{
    all, delay, delayed_rejection, with_timeout, EventLoop, PromiseState, SchedulerHandle, Task,
};
use core_types::{JsError, Value};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

#[test]
fn timers_fire_in_due_order() {
    let event_loop = Rc::new(EventLoop::new());
    let log = Rc::new(RefCell::new(vec![]));

    for n in [30u64, 10, 20] {
        let l = log.clone();
        delay(&event_loop, ms(n)).then_fulfilled(move |v| {
            l.borrow_mut().push(n);
            Ok(v.into())
        });
    }

    event_loop.run_until_done().unwrap();
    assert_eq!(*log.borrow(), vec![10, 20, 30]);
    assert_eq!(event_loop.now(), ms(30));
}

#[test]
fn cleared_timer_never_runs() {
    let event_loop = EventLoop::new();
    let fired = Rc::new(RefCell::new(false));

    let f = fired.clone();
    let id = event_loop.set_timeout(
        ms(10),
        Task::new(move || {
            *f.borrow_mut() = true;
            Ok(())
        }),
    );

    assert!(event_loop.clear_timeout(id));
    assert!(!event_loop.clear_timeout(id));
    event_loop.run_until_done().unwrap();
    assert!(!*fired.borrow());
    assert_eq!(event_loop.now(), Duration::ZERO);
}

#[test]
fn delayed_rejection_rejects_after_duration() {
    let event_loop = Rc::new(EventLoop::new());
    let promise = delayed_rejection(&event_loop, ms(250), Value::from("late"));

    let state = event_loop.run_until_settled(&promise).unwrap();
    assert_eq!(state, PromiseState::Rejected(Value::from("late")));
    assert_eq!(event_loop.now(), ms(250));
}

#[test]
fn with_timeout_passes_fast_result_and_clears_deadline() {
    let event_loop = Rc::new(EventLoop::new());
    let target = delay(&event_loop, ms(50));
    let guarded = with_timeout(&event_loop, &target, ms(100));

    let state = event_loop.run_until_settled(&guarded).unwrap();
    assert_eq!(state, PromiseState::Fulfilled(Value::Undefined));
    assert_eq!(event_loop.pending_timers(), 0);

    event_loop.run_until_done().unwrap();
    assert_eq!(event_loop.now(), ms(50));
}

#[test]
fn with_timeout_rejects_slow_result() {
    let event_loop = Rc::new(EventLoop::new());
    let target = delay(&event_loop, ms(500));
    let guarded = with_timeout(&event_loop, &target, ms(100));

    let state = event_loop.run_until_settled(&guarded).unwrap();
    assert_eq!(
        state,
        PromiseState::Rejected(Value::Error(JsError::error("Timed out after 100ms")))
    );
    assert_eq!(event_loop.now(), ms(100));

    // the slow target still completes, but the race result is final
    event_loop.run_until_done().unwrap();
    assert!(target.state().is_fulfilled());
    assert!(guarded.state().is_rejected());
}

#[test]
fn timeout_chain_recovers_with_all() {
    let event_loop = Rc::new(EventLoop::new());
    let handle: SchedulerHandle = event_loop.clone();

    let el = event_loop.clone();
    let el2 = event_loop.clone();
    let result = delay(&event_loop, ms(1000))
        .then_fulfilled(move |_| Ok(delay(&el, ms(2000)).into()))
        .then_fulfilled(|_| Err(JsError::error("Random error").into()))
        .catch(move |_| Ok(all(&handle, [delay(&el2, ms(100)), delay(&el2, ms(200))]).into()));

    let state = event_loop.run_until_settled(&result).unwrap();
    assert_eq!(
        state,
        PromiseState::Fulfilled(Value::Array(vec![Value::Undefined, Value::Undefined]))
    );
    assert_eq!(event_loop.now(), ms(3200));
}

#[test]
fn cleared_deadline_leaves_nothing_holding_the_loop() {
    let event_loop = Rc::new(EventLoop::new());
    let weak = Rc::downgrade(&event_loop);

    let target = delay(&event_loop, ms(50));
    let guarded = with_timeout(&event_loop, &target, ms(1000));
    event_loop.run_until_settled(&guarded).unwrap();
    assert_eq!(event_loop.pending_timers(), 0);

    drop((target, guarded, event_loop));
    assert!(weak.upgrade().is_none());
}

#[test]
fn shutdown_after_timeout_releases_slow_target() {
    let event_loop = Rc::new(EventLoop::new());
    let weak = Rc::downgrade(&event_loop);

    let target = delay(&event_loop, ms(5000));
    let guarded = with_timeout(&event_loop, &target, ms(1000));
    event_loop.run_until_settled(&guarded).unwrap();
    assert_eq!(event_loop.pending_timers(), 1);

    assert_eq!(event_loop.shutdown(), 1);
    drop((target, guarded, event_loop));
    assert!(weak.upgrade().is_none());
}

#[test]
fn unbounded_delay_does_not_overflow_the_clock() {
    let event_loop = Rc::new(EventLoop::new());
    let forever = delay(&event_loop, Duration::MAX);
    let guarded = with_timeout(&event_loop, &forever, ms(10));

    let state = event_loop.run_until_settled(&guarded).unwrap();
    assert!(state.is_rejected());
    assert_eq!(event_loop.now(), ms(10));

    event_loop.run_until_done().unwrap();
    assert!(forever.state().is_fulfilled());
    assert_eq!(event_loop.now(), Duration::MAX);
}

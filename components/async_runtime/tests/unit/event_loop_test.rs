//! Unit tests for EventLoop

use async_runtime::{
    ClockMode, EventLoop, EventLoopConfig, MicroTask, Promise, RuntimeError, SchedulerHandle,
    Task,
};
use core_types::Value;
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

#[test]
fn new_event_loop_has_empty_queues() {
    let event_loop = EventLoop::new();
    assert!(event_loop.is_task_queue_empty());
    assert!(event_loop.is_microtask_queue_empty());
    assert_eq!(event_loop.pending_timers(), 0);
}

#[test]
fn default_config_is_virtual_and_unbounded() {
    let event_loop = EventLoop::default();
    assert_eq!(event_loop.config().clock, ClockMode::Virtual);
    assert_eq!(event_loop.config().max_turns, None);
}

#[test]
fn task_queue_fifo_order() {
    let event_loop = EventLoop::new();
    let results = Rc::new(RefCell::new(vec![]));

    for i in 1..=3 {
        let r = results.clone();
        event_loop.enqueue_task(Task::new(move || {
            r.borrow_mut().push(i);
            Ok(())
        }));
    }

    event_loop.run_until_done().unwrap();
    assert_eq!(*results.borrow(), vec![1, 2, 3]);
    assert_eq!(event_loop.turns(), 3);
}

#[test]
fn microtasks_drain_between_tasks() {
    let event_loop = Rc::new(EventLoop::new());
    let log = Rc::new(RefCell::new(vec![]));

    for name in ["t1", "t2"] {
        let l = log.clone();
        let el = event_loop.clone();
        event_loop.enqueue_task(Task::new(move || {
            l.borrow_mut().push(name.to_string());
            let l2 = l.clone();
            el.enqueue_microtask(MicroTask::new(move || {
                l2.borrow_mut().push(format!("{}-micro", name))
            }));
            Ok(())
        }));
    }

    event_loop.run_until_done().unwrap();
    assert_eq!(*log.borrow(), vec!["t1", "t1-micro", "t2", "t2-micro"]);
}

#[test]
fn queued_reactions_run_before_the_clock_moves() {
    let event_loop = Rc::new(EventLoop::new());
    let handle: SchedulerHandle = event_loop.clone();
    let order = Rc::new(RefCell::new(vec![]));

    let o = order.clone();
    let el = event_loop.clone();
    Promise::resolved(&handle, Value::Undefined).then_fulfilled(move |v| {
        o.borrow_mut().push(format!("M@{}ms", el.now().as_millis()));
        Ok(v.into())
    });

    let o = order.clone();
    event_loop.set_timeout(
        Duration::from_millis(10),
        Task::new(move || {
            o.borrow_mut().push("T".to_string());
            Ok(())
        }),
    );

    event_loop.run_until_done().unwrap();
    assert_eq!(*order.borrow(), vec!["M@0ms", "T"]);
    assert_eq!(event_loop.turns(), 1);
}

#[test]
fn shutdown_releases_loop_held_by_its_timers() {
    let event_loop = Rc::new(EventLoop::new());
    let handle: SchedulerHandle = event_loop.clone();
    let weak = Rc::downgrade(&event_loop);

    let promise = Promise::with_executor(&handle, |resolvers| {
        event_loop.set_timeout(
            Duration::from_secs(60),
            Task::new(move || {
                resolvers.resolve(Value::Undefined);
                Ok(())
            }),
        );
        Ok(())
    });
    drop(promise);
    drop(handle);

    assert_eq!(event_loop.shutdown(), 1);
    drop(event_loop);
    assert!(weak.upgrade().is_none());
}

#[test]
fn drain_microtasks_runs_only_snapshot() {
    let event_loop = Rc::new(EventLoop::new());
    let count = Rc::new(RefCell::new(0));

    let el = event_loop.clone();
    let c = count.clone();
    event_loop.enqueue_microtask(MicroTask::new(move || {
        *c.borrow_mut() += 1;
        let c2 = c.clone();
        el.enqueue_microtask(MicroTask::new(move || *c2.borrow_mut() += 1));
    }));

    assert_eq!(event_loop.drain_microtasks(), 1);
    assert_eq!(*count.borrow(), 1);
    assert!(!event_loop.is_microtask_queue_empty());
    assert_eq!(event_loop.run_microtasks(), 1);
    assert_eq!(*count.borrow(), 2);
}

#[test]
fn run_until_settled_returns_final_state() {
    let event_loop = Rc::new(EventLoop::new());
    let handle: SchedulerHandle = event_loop.clone();
    let promise = Promise::new(&handle);

    let p = promise.clone();
    event_loop.enqueue_task(Task::new(move || {
        p.reject(Value::from("from task"));
        Ok(())
    }));

    let state = event_loop.run_until_settled(&promise).unwrap();
    assert_eq!(state.reason(), Some(&Value::from("from task")));
}

#[test]
fn run_until_settled_reports_stall() {
    let event_loop = Rc::new(EventLoop::new());
    let handle: SchedulerHandle = event_loop.clone();
    let promise = Promise::new(&handle);

    let err = event_loop.run_until_settled(&promise).unwrap_err();
    assert_eq!(err, RuntimeError::Stalled { promise: promise.id() });
}

#[test]
fn run_until_settled_on_settled_promise_needs_no_turns() {
    let event_loop = Rc::new(EventLoop::new());
    let handle: SchedulerHandle = event_loop.clone();
    let promise = Promise::resolved(&handle, Value::Smi(1));

    let state = event_loop.run_until_settled(&promise).unwrap();
    assert!(state.is_fulfilled());
    assert_eq!(event_loop.turns(), 0);
}

#[test]
fn settling_from_queued_reactions_leaves_timers_alone() {
    let event_loop = Rc::new(EventLoop::new());
    let handle: SchedulerHandle = event_loop.clone();
    event_loop.set_timeout(Duration::from_millis(10), Task::new(|| Ok(())));

    let promise = Promise::resolved(&handle, Value::Smi(1)).then(None, None);
    let state = event_loop.run_until_settled(&promise).unwrap();

    assert!(state.is_fulfilled());
    assert_eq!(event_loop.now(), Duration::ZERO);
    assert_eq!(event_loop.pending_timers(), 1);
}

#[test]
fn promise_chain_runs_as_microtasks() {
    let event_loop = Rc::new(EventLoop::new());
    let handle: SchedulerHandle = event_loop.clone();

    let tail = Promise::resolved(&handle, Value::Smi(1))
        .then_fulfilled(|v| match v {
            Value::Smi(n) => Ok(Value::Smi(n + 1).into()),
            other => Err(other),
        })
        .then_fulfilled(|v| match v {
            Value::Smi(n) => Ok(Value::Smi(n * 10).into()),
            other => Err(other),
        });

    assert!(!event_loop.is_microtask_queue_empty());
    event_loop.run_until_done().unwrap();
    assert_eq!(tail.state().value(), Some(&Value::Smi(20)));
}

#[test]
fn turn_budget_is_enforced() {
    let event_loop = Rc::new(EventLoop::with_config(
        EventLoopConfig::default().with_max_turns(3),
    ));

    // a task that keeps re-enqueueing itself
    fn spin(el: Rc<EventLoop>) -> Task {
        Task::new(move || {
            let next = el.clone();
            el.enqueue_task(spin(next));
            Ok(())
        })
    }
    event_loop.enqueue_task(spin(event_loop.clone()));

    let err = event_loop.run_until_done().unwrap_err();
    assert_eq!(err, RuntimeError::TurnLimitExceeded { limit: 3 });
    assert_eq!(event_loop.shutdown(), 1);
}

#[test]
fn realtime_clock_waits_for_timer() {
    let event_loop = EventLoop::with_config(EventLoopConfig::default().with_clock(ClockMode::Realtime));
    event_loop.set_timeout(Duration::from_millis(5), Task::new(|| Ok(())));
    event_loop.run_until_done().unwrap();
    assert!(event_loop.now() >= Duration::from_millis(5));
}

//! Unit tests for deferred dispatch through ManualScheduler

use async_runtime::{ManualScheduler, MicroTask, Promise, Scheduler, SchedulerHandle};
use core_types::Value;
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn each_link_of_a_chain_needs_its_own_drain() {
    let scheduler = Rc::new(ManualScheduler::new());
    let handle: SchedulerHandle = scheduler.clone();

    let source = Promise::new(&handle);
    let first = source.then(None, None);
    let second = first.then(None, None);
    let third = second.then(None, None);
    source.resolve(Value::Smi(1));

    assert_eq!(scheduler.drain(), 1);
    assert!(first.state().is_fulfilled());
    assert!(second.is_pending());

    assert_eq!(scheduler.drain(), 1);
    assert!(second.state().is_fulfilled());
    assert!(third.is_pending());

    assert_eq!(scheduler.drain(), 1);
    assert_eq!(third.state().value(), Some(&Value::Smi(1)));
    assert_eq!(scheduler.drain(), 0);
}

#[test]
fn run_until_idle_reports_total() {
    let scheduler = Rc::new(ManualScheduler::new());
    let handle: SchedulerHandle = scheduler.clone();

    let source = Promise::resolved(&handle, Value::Null);
    let _tail = source.then(None, None).then(None, None);
    assert_eq!(scheduler.run_until_idle(), 2);
    assert!(scheduler.is_idle());
}

#[test]
fn interleaves_jobs_from_independent_chains() {
    let scheduler = Rc::new(ManualScheduler::new());
    let handle: SchedulerHandle = scheduler.clone();
    let log = Rc::new(RefCell::new(vec![]));

    for name in ["a", "b"] {
        let l1 = log.clone();
        let l2 = log.clone();
        Promise::resolved(&handle, Value::from(name))
            .then_fulfilled(move |v| {
                l1.borrow_mut().push(format!("{}1", v));
                Ok(v.into())
            })
            .then_fulfilled(move |v| {
                l2.borrow_mut().push(format!("{}2", v));
                Ok(v.into())
            });
    }

    scheduler.run_until_idle();
    assert_eq!(*log.borrow(), vec!["a1", "b1", "a2", "b2"]);
}

#[test]
fn scheduler_trait_object_accepts_microtasks() {
    let scheduler = Rc::new(ManualScheduler::new());
    let handle: SchedulerHandle = scheduler.clone();
    let hit = Rc::new(RefCell::new(0));

    let h = hit.clone();
    handle.schedule(MicroTask::new(move || *h.borrow_mut() += 1));
    assert_eq!(*hit.borrow(), 0);
    scheduler.run_until_idle();
    assert_eq!(*hit.borrow(), 1);
}

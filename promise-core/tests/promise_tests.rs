//! Integration tests driving promises through a real single-threaded
//! executor, covering the await path, combinators, and chaining end to end.

use std::cell::Cell;
use std::rc::Rc;

use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use promise_core::{all, any, task, CellRef, NoContestants, Promise, Rejection};

#[test]
fn awaiting_a_settled_promise_completes_without_suspending() {
    let promise = Promise::resolved(3_i32);
    let value = LocalPool::new().run_until(async move { promise.await });
    assert_eq!(*value.unwrap(), 3);
}

#[test]
fn awaiting_a_pending_promise_suspends_until_resolve() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let promise: Promise<i32> = Promise::pending();
    let seen = Rc::new(Cell::new(0));

    let awaited = promise.clone();
    let seen_in_task = seen.clone();
    spawner
        .spawn_local(async move {
            let value = awaited.await.expect("resolved, not rejected");
            seen_in_task.set(*value);
        })
        .unwrap();

    pool.run_until_stalled();
    assert_eq!(seen.get(), 0, "task must stay suspended while pending");

    promise.resolve(7);
    pool.run_until_stalled();
    assert_eq!(seen.get(), 7);
}

#[test]
fn awaiting_a_pending_promise_observes_a_later_rejection() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let promise: Promise<i32> = Promise::pending();
    let message = Rc::new(Cell::new(None));

    let awaited = promise.clone();
    let message_in_task = message.clone();
    spawner
        .spawn_local(async move {
            let outcome = awaited.await;
            message_in_task.set(Some(outcome.unwrap_err().to_string()));
        })
        .unwrap();

    pool.run_until_stalled();
    promise.reject(Rejection::msg("producer gave up"));
    pool.run_until_stalled();

    assert_eq!(message.take().unwrap(), "producer gave up");
}

#[test]
fn join_is_awaitable_and_preserves_input_order() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let number: Promise<i32> = Promise::pending();
    let greeting = Promise::resolved(String::from("Hello"));
    let ratio = Promise::resolved(3.3_f64);

    let joined = all(vec![number.cell(), greeting.cell(), ratio.cell()]);
    let summary = task::spawn(&spawner, async move {
        let states = joined.await?;
        assert!(states[0].is_value_of::<i32>());
        assert!(states[1].is_value_of::<String>());
        assert!(states[2].is_value_of::<f64>());
        Ok(format!(
            "{} {} {}",
            states[0].value::<i32>().unwrap(),
            states[1].value::<String>().unwrap(),
            states[2].value::<f64>().unwrap(),
        ))
    });

    pool.run_until_stalled();
    assert!(summary.is_pending());

    number.resolve(1);
    pool.run_until_stalled();
    assert_eq!(*summary.value().unwrap(), "1 Hello 3.3");
}

#[test]
fn rejected_join_reraises_inside_the_computation() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let a: Promise<i32> = Promise::pending();
    let b: Promise<i32> = Promise::pending();
    let joined = all(vec![a.cell(), b.cell()]);

    let outcome: Promise<i32> = task::spawn(&spawner, async move {
        let _states = joined.await?;
        panic!("join must not resolve");
        #[allow(unreachable_code)]
        Ok::<i32, Rejection>(unreachable!())
    });

    pool.run_until_stalled();
    a.reject(Rejection::msg("source died"));
    pool.run_until_stalled();

    assert!(outcome.is_rejected());
    assert_eq!(outcome.error().unwrap().to_string(), "source died");
    // The other source settling later changes nothing.
    b.resolve(2);
    assert!(outcome.is_rejected());
}

#[test]
fn race_is_awaitable_and_reports_the_winner() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let slow: Promise<i32> = Promise::pending();
    let fast: Promise<String> = Promise::pending();
    let raced = any(vec![slow.cell(), fast.cell()]);

    let winner_type = task::spawn(&spawner, async move {
        let winner: Rc<CellRef> = raced.await?;
        Ok(winner.is_value_of::<String>())
    });

    pool.run_until_stalled();
    fast.resolve(String::from("Hello"));
    slow.resolve(1);
    pool.run_until_stalled();

    assert!(*winner_type.value().unwrap());
}

#[test]
fn empty_race_rejects_with_no_contestants_at_the_await_point() {
    let raced = any(Vec::new());
    let outcome = LocalPool::new().run_until(async move { raced.await });
    let error = outcome.unwrap_err();
    assert!(error.downcast_ref::<NoContestants>().is_some());
}

#[test]
fn computations_forward_through_nested_spawns() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let source: Promise<i32> = Promise::pending();
    let source_for_inner = source.clone();
    let inner = task::spawn(&spawner, async move {
        let value = source_for_inner.await?;
        Ok(*value * 2)
    });
    // The outer computation completes with the inner promise itself.
    let outer = task::spawn(&spawner, async move { inner });

    pool.run_until_stalled();
    assert!(outer.is_pending());

    source.resolve(10);
    pool.run_until_stalled();
    assert_eq!(*outer.value().unwrap(), 20);
}

#[test]
fn then_chains_and_await_compose_on_different_promises() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let source: Promise<i32> = Promise::pending();
    // Continuation-style consumer on the source...
    let doubled_cell: Promise<i32> = Promise::pending();
    let doubled_producer = doubled_cell.clone();
    source.then(move |n| doubled_producer.resolve(n * 2));

    // ...await-style consumer on the derived promise.
    let awaited = doubled_cell.clone();
    let total = task::spawn(&spawner, async move {
        let value = awaited.await?;
        Ok(*value + 1)
    });

    pool.run_until_stalled();
    source.resolve(4);
    pool.run_until_stalled();

    assert_eq!(*total.value().unwrap(), 9);
}

#[test]
fn settlement_is_idempotent_across_consumption_styles() {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let promise: Promise<i32> = Promise::pending();
    let awaited = promise.clone();
    let result = task::spawn(&spawner, async move { Ok(*awaited.await?) });

    pool.run_until_stalled();
    promise.resolve(1);
    promise.resolve(2);
    promise.reject(Rejection::msg("late"));
    pool.run_until_stalled();

    assert_eq!(*result.value().unwrap(), 1);
}

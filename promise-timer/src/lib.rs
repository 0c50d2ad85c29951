//! Deterministic virtual-clock scheduler for delayed promise settlement.
//!
//! Promises have no timeout or delay mechanism of their own; delayed
//! settlement is the job of an external producer. [`Timer`] is that producer
//! as an explicit, injectable service: actions are queued against a virtual
//! clock and run when the owner advances it, so tests exercising "resolve
//! later" scenarios stay fully deterministic — no threads, no real sleeping.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use promise_core::Promise;
//! use promise_timer::Timer;
//!
//! let timer = Timer::new();
//! let promise: Promise<i32> = Promise::pending();
//!
//! timer.resolve_after(Duration::from_millis(100), &promise, 7);
//! assert!(promise.is_pending());
//!
//! timer.advance(Duration::from_millis(100));
//! assert_eq!(*promise.value().unwrap(), 7);
//! ```

use std::any::Any;
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Duration;

use promise_core::{Promise, Rejection};
use tracing::trace;

/// A queued action. Ordered so the binary heap pops the earliest due time
/// first, with insertion order breaking ties.
struct Entry {
    due: Duration,
    seq: u64,
    action: Box<dyn FnOnce()>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap, we want the earliest entry on top.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct TimerState {
    queue: BinaryHeap<Entry>,
    now: Duration,
    next_seq: u64,
}

/// A virtual-clock scheduler.
///
/// Clones share the same clock and queue. Time only moves when
/// [`advance`](Timer::advance) or [`run`](Timer::run) is called; due actions
/// run synchronously inside those calls, on the caller's stack, in
/// (due-time, insertion-order) order. An action may schedule further actions
/// or settle promises, re-entering the promise core in-line.
#[derive(Clone)]
pub struct Timer {
    state: Rc<RefCell<TimerState>>,
}

impl Timer {
    /// Creates a timer with its clock at zero and an empty queue.
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(TimerState {
                queue: BinaryHeap::new(),
                now: Duration::ZERO,
                next_seq: 0,
            })),
        }
    }

    /// Returns the current virtual time.
    pub fn now(&self) -> Duration {
        self.state.borrow().now
    }

    /// Returns `true` if no actions are queued.
    pub fn is_idle(&self) -> bool {
        self.state.borrow().queue.is_empty()
    }

    /// Queues `action` to run once the clock has advanced by `after`.
    pub fn schedule(&self, after: Duration, action: impl FnOnce() + 'static) {
        let mut state = self.state.borrow_mut();
        let due = state.now + after;
        let seq = state.next_seq;
        state.next_seq += 1;
        trace!(?due, seq, "scheduling timer action");
        state.queue.push(Entry {
            due,
            seq,
            action: Box::new(action),
        });
    }

    /// Resolves `promise` once the clock has advanced by `after`.
    ///
    /// Settlement is idempotent, so this is harmless if something else
    /// settles the promise first.
    pub fn resolve_after<T: Any>(&self, after: Duration, promise: &Promise<T>, value: T) {
        let promise = promise.clone();
        self.schedule(after, move || promise.resolve(value));
    }

    /// Rejects `promise` once the clock has advanced by `after`.
    pub fn reject_after<T: Any>(
        &self,
        after: Duration,
        promise: &Promise<T>,
        error: impl Into<Rejection> + 'static,
    ) {
        let promise = promise.clone();
        self.schedule(after, move || promise.reject(error));
    }

    /// Advances the clock by `by`, running every action that falls due, in
    /// order. Actions scheduled while advancing also run if they fall within
    /// the same window.
    pub fn advance(&self, by: Duration) {
        let target = self.state.borrow().now + by;
        loop {
            let action = {
                let mut state = self.state.borrow_mut();
                match state.queue.peek() {
                    Some(entry) if entry.due <= target => {
                        let entry = state.queue.pop().expect("peeked entry is present");
                        state.now = entry.due;
                        entry.action
                    }
                    _ => {
                        state.now = target;
                        break;
                    }
                }
            };
            // Borrow released: the action may schedule or settle re-entrantly.
            action();
        }
    }

    /// Runs every queued action, advancing the clock as far as needed.
    pub fn run(&self) {
        loop {
            let next_due = {
                let state = self.state.borrow();
                match state.queue.peek() {
                    Some(entry) => entry.due,
                    None => break,
                }
            };
            let by = next_due.saturating_sub(self.now());
            self.advance(by);
        }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

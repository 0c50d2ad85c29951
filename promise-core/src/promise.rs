//! The typed promise handle.
//!
//! A [`Promise<T>`] is a cheaply cloneable handle to one settlement cell. The
//! same handle serves producers (`resolve`/`reject`) and consumers
//! (`then`/`catch` chains, or `.await` inside an async computation). Which
//! consumption style a cell uses is exclusive: a cell is either chained or
//! awaited, never both.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::cell::CellRef;
use crate::error::{Rejection, ValueError};

/// Return type of a `then`/`catch` callback.
///
/// Callbacks may be infallible (return `()`) or fallible (return
/// `Result<(), E>` for any error convertible into a [`Rejection`]); a
/// returned error rejects the chained promise instead of the pass-through
/// settlement.
pub trait ContinuationOutcome {
    fn into_result(self) -> Result<(), Rejection>;
}

impl ContinuationOutcome for () {
    fn into_result(self) -> Result<(), Rejection> {
        Ok(())
    }
}

impl<E> ContinuationOutcome for Result<(), E>
where
    E: Into<Rejection>,
{
    fn into_result(self) -> Result<(), Rejection> {
        self.map_err(Into::into)
    }
}

/// A single-assignment container for the eventual result of a computation.
///
/// A promise starts pending and settles exactly once: resolved with a `T` or
/// rejected with a [`Rejection`]. Later settlement attempts are no-ops.
/// Settlement runs consumers synchronously, on the stack of whoever called
/// `resolve` or `reject`; there is no scheduler inside this crate.
///
/// Handles are `Rc`-backed and not `Send`. Clone freely; every clone refers
/// to the same cell.
///
/// # Examples
///
/// Chained consumption:
///
/// ```
/// use promise_core::Promise;
///
/// let promise: Promise<i32> = Promise::pending();
/// let chained = promise.then(|n| println!("got {n}"));
/// promise.resolve(3);
/// assert!(chained.is_resolved());
/// ```
///
/// Awaited consumption:
///
/// ```
/// use futures::executor::LocalPool;
/// use promise_core::Promise;
///
/// let promise = Promise::resolved(3_i32);
/// let value = LocalPool::new().run_until(async move { promise.await });
/// assert_eq!(*value.unwrap(), 3);
/// ```
pub struct Promise<T> {
    cell: CellRef,
    _value: PhantomData<fn() -> T>,
}

impl<T> Clone for Promise<T> {
    fn clone(&self) -> Self {
        Self {
            cell: self.cell.clone(),
            _value: PhantomData,
        }
    }
}

impl<T: Any> Promise<T> {
    /// Creates a pending promise. The returned handle is both the producer
    /// and the consumer side; clone it and hand one copy to whoever will
    /// settle it.
    pub fn pending() -> Self {
        Self {
            cell: CellRef::new::<T>(),
            _value: PhantomData,
        }
    }

    /// Creates a promise and runs `init` with a handle to it, synchronously,
    /// before returning. An `Err` escaping the initializer rejects the
    /// promise.
    ///
    /// ```
    /// use promise_core::{Promise, Rejection};
    ///
    /// let promise = Promise::new(|handle: Promise<i32>| {
    ///     handle.resolve(1);
    ///     Ok(())
    /// });
    /// assert!(promise.is_resolved());
    ///
    /// let failed: Promise<i32> = Promise::new(|_| Err(Rejection::msg("setup failed")));
    /// assert!(failed.is_rejected());
    /// ```
    pub fn new<F>(init: F) -> Self
    where
        F: FnOnce(Promise<T>) -> Result<(), Rejection>,
    {
        let promise = Self::pending();
        if let Err(error) = init(promise.clone()) {
            promise.cell.reject(error);
        }
        promise
    }

    /// Creates a promise already resolved with `value`.
    pub fn resolved(value: T) -> Self {
        let promise = Self::pending();
        promise.resolve(value);
        promise
    }

    /// Creates a promise already rejected with `error`.
    pub fn rejected(error: impl Into<Rejection>) -> Self {
        let promise = Self::pending();
        promise.reject(error);
        promise
    }

    /// Resolves the promise. No-op if it has already settled.
    pub fn resolve(&self, value: T) {
        self.cell.resolve_shared(Rc::new(value));
    }

    /// Rejects the promise. No-op if it has already settled.
    pub fn reject(&self, error: impl Into<Rejection>) {
        self.cell.reject(error);
    }

    /// Returns `true` if the promise has not settled yet.
    pub fn is_pending(&self) -> bool {
        self.cell.is_pending()
    }

    /// Returns `true` if the promise resolved.
    pub fn is_resolved(&self) -> bool {
        self.cell.is_resolved()
    }

    /// Returns `true` if the promise rejected.
    pub fn is_rejected(&self) -> bool {
        self.cell.is_rejected()
    }

    /// Returns the resolved value without registering any consumer. Prefer
    /// `then` or `.await`; polling settlement state is a last resort.
    pub fn value(&self) -> Result<Rc<T>, ValueError> {
        self.cell.value::<T>()
    }

    /// Returns the rejection this promise settled with, if any.
    pub fn error(&self) -> Option<Rejection> {
        self.cell.error()
    }

    /// Returns a type-erased reference to the underlying cell, for use with
    /// the [`all`](crate::all) and [`any`](crate::any) combinators.
    pub fn cell(&self) -> CellRef {
        self.cell.clone()
    }

    /// Registers a resolution continuation and returns the chained promise.
    ///
    /// `on_resolve` runs if and when this promise resolves, never on
    /// rejection. The chained promise then resolves with the *same* shared
    /// value (or rejects with `on_resolve`'s error). If this promise
    /// rejects, the rejection passes through to the chained promise and
    /// `on_resolve` is dropped unused.
    ///
    /// # Panics
    ///
    /// Panics if this promise is pending and already being awaited.
    pub fn then<R, F>(&self, on_resolve: F) -> Promise<T>
    where
        F: FnOnce(&T) -> R + 'static,
        R: ContinuationOutcome,
    {
        let chained = Promise::pending();
        let resolve_cell = chained.cell.clone();
        let reject_cell = chained.cell.clone();
        self.cell.on_settled(
            Box::new(move |settled: &CellRef| {
                let value = settled
                    .value::<T>()
                    .expect("settled cell carries a value of the handle's type");
                match on_resolve(value.as_ref()).into_result() {
                    Ok(()) => resolve_cell.resolve_shared(value),
                    Err(error) => resolve_cell.reject(error),
                }
            }),
            Box::new(move |error: &Rejection| reject_cell.reject(error.clone())),
        );
        chained
    }

    /// Registers a rejection continuation and returns the chained promise.
    ///
    /// `on_reject` runs if and when this promise rejects; the chained
    /// promise then rejects with the same error (or with `on_reject`'s own
    /// error). A resolution passes through unchanged without invoking
    /// `on_reject`.
    ///
    /// # Panics
    ///
    /// Panics if this promise is pending and already being awaited.
    pub fn catch<R, F>(&self, on_reject: F) -> Promise<T>
    where
        F: FnOnce(&Rejection) -> R + 'static,
        R: ContinuationOutcome,
    {
        let chained = Promise::pending();
        let resolve_cell = chained.cell.clone();
        let reject_cell = chained.cell.clone();
        self.cell.on_settled(
            Box::new(move |settled: &CellRef| {
                let value = settled
                    .value::<T>()
                    .expect("settled cell carries a value of the handle's type");
                resolve_cell.resolve_shared(value);
            }),
            Box::new(move |error: &Rejection| match on_reject(error).into_result() {
                Ok(()) => reject_cell.reject(error.clone()),
                Err(replacement) => reject_cell.reject(replacement),
            }),
        );
        chained
    }

    /// Registers both continuations at once, producing a single chained
    /// promise that observes whichever outcome this promise settles with.
    ///
    /// # Panics
    ///
    /// Panics if this promise is pending and already being awaited.
    pub fn then_catch<RF, RG, F, G>(&self, on_resolve: F, on_reject: G) -> Promise<T>
    where
        F: FnOnce(&T) -> RF + 'static,
        RF: ContinuationOutcome,
        G: FnOnce(&Rejection) -> RG + 'static,
        RG: ContinuationOutcome,
    {
        let chained = Promise::pending();
        let resolve_cell = chained.cell.clone();
        let reject_cell = chained.cell.clone();
        self.cell.on_settled(
            Box::new(move |settled: &CellRef| {
                let value = settled
                    .value::<T>()
                    .expect("settled cell carries a value of the handle's type");
                match on_resolve(value.as_ref()).into_result() {
                    Ok(()) => resolve_cell.resolve_shared(value),
                    Err(error) => resolve_cell.reject(error),
                }
            }),
            Box::new(move |error: &Rejection| match on_reject(error).into_result() {
                Ok(()) => reject_cell.reject(error.clone()),
                Err(replacement) => reject_cell.reject(replacement),
            }),
        );
        chained
    }

    /// Wires `source` to drive this promise to the same final outcome.
    ///
    /// Used when a computation completes with another promise instead of a
    /// value: the outer handle adopts the inner one, and chains of adoption
    /// forward settlement to arbitrary depth. The wiring closures hold a
    /// reference only to this (downstream) cell, so no retention cycle forms.
    pub fn adopt(&self, source: &Promise<T>) {
        let resolve_cell = self.cell.clone();
        let reject_cell = self.cell.clone();
        source.cell.on_settled(
            Box::new(move |settled: &CellRef| {
                let value = settled
                    .value::<T>()
                    .expect("settled cell carries a value of the handle's type");
                resolve_cell.resolve_shared(value);
            }),
            Box::new(move |error: &Rejection| reject_cell.reject(error.clone())),
        );
    }
}

impl<T: Any> From<Promise<T>> for CellRef {
    fn from(promise: Promise<T>) -> Self {
        promise.cell
    }
}

impl<T: Any> From<&Promise<T>> for CellRef {
    fn from(promise: &Promise<T>) -> Self {
        promise.cell()
    }
}

/// Await integration.
///
/// Ready immediately if the promise has settled; otherwise the awaiting
/// computation parks its waker in the cell and suspends. Resolution yields
/// the shared value as an `Rc<T>` — the caller decides whether to borrow,
/// clone, or (when no other consumer shares it) move it out with
/// [`Rc::try_unwrap`]. Rejection yields `Err`, the await-point analogue of a
/// re-raised error; propagate it with `?`.
impl<T: Any> Future for Promise<T> {
    type Output = Result<Rc<T>, Rejection>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.cell.poll_settled::<T>(cx)
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Promise").field(&self.cell).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[test]
    fn then_receives_the_value_on_resolve() {
        let promise: Promise<i32> = Promise::pending();
        let seen = Rc::new(Cell::new(0));
        let seen_in_callback = seen.clone();
        promise.then(move |n| seen_in_callback.set(*n));

        assert_eq!(seen.get(), 0);
        promise.resolve(7);
        assert_eq!(seen.get(), 7);
    }

    #[test]
    fn chained_promise_shares_the_stored_value() {
        let promise: Promise<String> = Promise::pending();
        let chained = promise.then(|_| {});
        promise.resolve(String::from("Hello"));

        let first = promise.value().unwrap();
        let second = chained.value().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn then_is_skipped_on_rejection() {
        let promise: Promise<i32> = Promise::pending();
        let chained = promise.then::<(), _>(|_| panic!("resolved branch must not run"));
        promise.reject(Rejection::msg("boom"));

        assert!(chained.is_rejected());
        assert_eq!(chained.error().unwrap().to_string(), "boom");
    }

    #[test]
    fn catch_passes_resolution_through_unchanged() {
        let promise: Promise<i32> = Promise::pending();
        let chained = promise.catch::<(), _>(|_| panic!("rejected branch must not run"));
        promise.resolve(4);

        assert!(chained.is_resolved());
        assert_eq!(*chained.value().unwrap(), 4);
    }

    #[test]
    fn catch_observes_the_rejection_and_rethrows_it_down_the_chain() {
        let promise: Promise<i32> = Promise::pending();
        let seen = Rc::new(RefCell::new(String::new()));
        let seen_in_callback = seen.clone();
        let chained = promise.catch(move |e| {
            *seen_in_callback.borrow_mut() = e.to_string();
        });
        promise.reject(Rejection::msg("lost"));

        assert_eq!(*seen.borrow(), "lost");
        assert_eq!(chained.error().unwrap().to_string(), "lost");
    }

    #[test]
    fn chain_runs_in_registration_order() {
        let promise: Promise<i32> = Promise::pending();
        let order = Rc::new(RefCell::new(Vec::new()));

        let first = order.clone();
        let second = order.clone();
        promise
            .then(move |_| first.borrow_mut().push(1))
            .then(move |_| second.borrow_mut().push(2));

        promise.resolve(0);
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn then_after_settlement_fires_immediately() {
        let promise = Promise::resolved(9_i32);
        let seen = Rc::new(Cell::new(0));
        let seen_in_callback = seen.clone();
        promise.then(move |n| seen_in_callback.set(*n));
        assert_eq!(seen.get(), 9);
    }

    #[test]
    fn fallible_callback_rejects_the_chained_promise() {
        let promise: Promise<i32> = Promise::pending();
        let chained = promise.then(|_| -> Result<(), Rejection> {
            Err(Rejection::msg("transform failed"))
        });
        promise.resolve(1);

        assert!(promise.is_resolved());
        assert!(chained.is_rejected());
        assert_eq!(chained.error().unwrap().to_string(), "transform failed");
    }

    #[test]
    fn then_catch_fires_exactly_one_side() {
        let promise: Promise<i32> = Promise::pending();
        let resolved = Rc::new(Cell::new(false));
        let rejected = Rc::new(Cell::new(false));
        let resolved_flag = resolved.clone();
        let rejected_flag = rejected.clone();
        promise.then_catch(
            move |_| resolved_flag.set(true),
            move |_| rejected_flag.set(true),
        );

        promise.resolve(1);
        promise.reject(Rejection::msg("late"));
        assert!(resolved.get());
        assert!(!rejected.get());
    }

    #[test]
    fn initializer_error_rejects_the_promise() {
        let promise: Promise<i32> = Promise::new(|_| Err(Rejection::msg("could not start")));
        assert!(promise.is_rejected());
    }

    #[test]
    fn adopt_forwards_resolution_through_a_chain() {
        let outer: Promise<i32> = Promise::pending();
        let middle: Promise<i32> = Promise::pending();
        let inner: Promise<i32> = Promise::pending();

        outer.adopt(&middle);
        middle.adopt(&inner);

        inner.resolve(11);
        assert!(outer.is_resolved());
        assert_eq!(*outer.value().unwrap(), 11);
    }

    #[test]
    fn adopt_forwards_rejection() {
        let outer: Promise<i32> = Promise::pending();
        let inner: Promise<i32> = Promise::pending();
        outer.adopt(&inner);

        inner.reject(Rejection::msg("inner failed"));
        assert!(outer.is_rejected());
        assert_eq!(outer.error().unwrap().to_string(), "inner failed");
    }

    #[test]
    fn moving_the_value_out_requires_sole_ownership() {
        let promise = Promise::resolved(String::from("mine"));
        let shared = promise.value().unwrap();
        // The cell still holds the value, so it cannot be moved out.
        assert!(Rc::try_unwrap(shared).is_err());
    }

    #[test]
    #[should_panic(expected = "cannot await a cell that has a continuation registered")]
    fn awaiting_a_chained_promise_panics() {
        use futures::task::noop_waker;

        let promise: Promise<i32> = Promise::pending();
        promise.then(|_| {});

        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut awaited = promise.clone();
        let _ = Pin::new(&mut awaited).poll(&mut cx);
    }

    #[test]
    #[should_panic(expected = "cannot register a continuation on a cell that is being awaited")]
    fn chaining_an_awaited_promise_panics() {
        use futures::task::noop_waker;

        let promise: Promise<i32> = Promise::pending();
        let waker = noop_waker();
        let mut cx = Context::from_waker(&waker);
        let mut awaited = promise.clone();
        let _ = Pin::new(&mut awaited).poll(&mut cx);

        promise.then(|_| {});
    }
}

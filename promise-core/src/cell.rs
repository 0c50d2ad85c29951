//! The shared settlement cell behind every promise handle.
//!
//! A cell is created pending and settles at most once, either resolved with a
//! type-erased value or rejected with a [`Rejection`]. Every handle, chained
//! continuation, and combinator holds the same cell through a [`CellRef`];
//! the cell is freed when the last reference drops.
//!
//! Settlement dispatch is synchronous and re-entrant: `resolve`/`reject` run
//! the registered consumer in-line, on the caller's stack, before returning.
//! Cells are `Rc`-based and not safe to settle from multiple threads; callers
//! needing that must synchronize externally.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use tracing::{trace, warn};

use crate::error::{Rejection, ValueError};

/// Settlement status of a cell. Pending is initial; the other two are
/// terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Status {
    Pending,
    Resolved,
    Rejected,
}

pub(crate) type ResolveFn = Box<dyn FnOnce(&CellRef)>;
pub(crate) type RejectFn = Box<dyn FnOnce(&Rejection)>;

/// Identifies the value type a cell was created for, so heterogeneous cells
/// can be type-queried through an erased reference even while pending.
#[derive(Clone, Copy)]
struct TypeTag {
    id: TypeId,
    name: &'static str,
}

struct CellState {
    status: Status,
    /// Written exactly once, at the resolved transition. Shared down chains
    /// by cloning the `Rc`, never by recopying the value.
    value: Option<Rc<dyn Any>>,
    error: Option<Rejection>,
    /// Continuation slot. A later registration replaces an earlier one.
    on_resolve: Option<ResolveFn>,
    on_reject: Option<RejectFn>,
    /// Resume token for an awaiting computation.
    waker: Option<Waker>,
    tag: TypeTag,
}

/// A shared, type-erased reference to one settlement cell.
///
/// `CellRef` is the currency of the combinators: [`all`](crate::all) resolves
/// to an ordered list of them and [`any`](crate::any) resolves to the winning
/// one. The concrete value type is recovered at runtime with
/// [`is_value_of`](CellRef::is_value_of) and [`value`](CellRef::value).
///
/// ```
/// use promise_core::Promise;
///
/// let promise = Promise::resolved(7_i32);
/// let cell = promise.cell();
/// assert!(cell.is_value_of::<i32>());
/// assert!(!cell.is_value_of::<String>());
/// assert_eq!(*cell.value::<i32>().unwrap(), 7);
/// ```
#[derive(Clone)]
pub struct CellRef {
    state: Rc<RefCell<CellState>>,
}

impl CellRef {
    /// Creates a pending cell tagged with the value type `T`.
    pub(crate) fn new<T: Any>() -> Self {
        Self {
            state: Rc::new(RefCell::new(CellState {
                status: Status::Pending,
                value: None,
                error: None,
                on_resolve: None,
                on_reject: None,
                waker: None,
                tag: TypeTag {
                    id: TypeId::of::<T>(),
                    name: std::any::type_name::<T>(),
                },
            })),
        }
    }

    /// Returns `true` if the cell has not settled yet.
    pub fn is_pending(&self) -> bool {
        self.state.borrow().status == Status::Pending
    }

    /// Returns `true` if the cell resolved.
    pub fn is_resolved(&self) -> bool {
        self.state.borrow().status == Status::Resolved
    }

    /// Returns `true` if the cell rejected.
    pub fn is_rejected(&self) -> bool {
        self.state.borrow().status == Status::Rejected
    }

    /// Returns `true` if this cell carries values of type `T`.
    ///
    /// The tag is fixed at construction, so the answer is meaningful even
    /// while the cell is still pending.
    pub fn is_value_of<T: Any>(&self) -> bool {
        self.state.borrow().tag.id == TypeId::of::<T>()
    }

    /// Returns the resolved value as a shared pointer.
    ///
    /// Fails with [`ValueError::TypeMismatch`] if the cell was created for a
    /// different value type, and with [`ValueError::Unresolved`] if it has
    /// not resolved. Neither failure rejects the cell.
    pub fn value<T: Any>(&self) -> Result<Rc<T>, ValueError> {
        let state = self.state.borrow();
        if state.tag.id != TypeId::of::<T>() {
            return Err(ValueError::TypeMismatch {
                expected: std::any::type_name::<T>(),
                found: state.tag.name,
            });
        }
        match &state.value {
            Some(value) => {
                let Ok(value) = value.clone().downcast::<T>() else {
                    unreachable!("value type verified against the cell tag");
                };
                Ok(value)
            }
            None => Err(ValueError::Unresolved),
        }
    }

    /// Returns the rejection this cell settled with, if any.
    pub fn error(&self) -> Option<Rejection> {
        self.state.borrow().error.clone()
    }

    /// Resolves the cell through an erased reference, checking that `T`
    /// matches the cell's tag first.
    ///
    /// Settling an already-settled cell is a no-op, so `Ok` does not imply
    /// that this call won the settlement.
    pub fn resolve_value<T: Any>(&self, value: T) -> Result<(), ValueError> {
        {
            let state = self.state.borrow();
            if state.tag.id != TypeId::of::<T>() {
                return Err(ValueError::TypeMismatch {
                    expected: std::any::type_name::<T>(),
                    found: state.tag.name,
                });
            }
        }
        self.resolve_shared(Rc::new(value));
        Ok(())
    }

    /// Resolves the cell with an already-shared value, passing the `Rc` down
    /// without copying the underlying `T`. This is how chained cells adopt
    /// their source's value.
    ///
    /// No-op if the cell has settled. Otherwise the transition happens first,
    /// then exactly one consumer runs in-line: a parked waker takes priority
    /// over a registered continuation.
    pub(crate) fn resolve_shared(&self, value: Rc<dyn Any>) {
        let (waker, continuation) = {
            let mut state = self.state.borrow_mut();
            if state.status != Status::Pending {
                trace!("resolve ignored: cell already settled");
                return;
            }
            state.status = Status::Resolved;
            state.value = Some(value);
            state.on_reject = None;
            (state.waker.take(), state.on_resolve.take())
        };
        // Borrow released: the consumer may re-enter this cell.
        if let Some(waker) = waker {
            waker.wake();
        } else if let Some(continuation) = continuation {
            continuation(self);
        }
    }

    /// Rejects the cell. No-op if it has settled.
    ///
    /// A parked waker is woken so the awaiting computation observes the error
    /// at its await point; otherwise a registered catch continuation runs
    /// in-line with the rejection.
    pub fn reject(&self, error: impl Into<Rejection>) {
        let error = error.into();
        let (waker, continuation) = {
            let mut state = self.state.borrow_mut();
            if state.status != Status::Pending {
                trace!("reject ignored: cell already settled");
                return;
            }
            state.status = Status::Rejected;
            state.error = Some(error.clone());
            state.on_resolve = None;
            (state.waker.take(), state.on_reject.take())
        };
        if let Some(waker) = waker {
            waker.wake();
        } else if let Some(continuation) = continuation {
            continuation(&error);
        } else {
            trace!("rejection stored with no consumer registered");
        }
    }

    /// Registers the continuation pair for this cell.
    ///
    /// If the cell has already settled, the matching callback runs
    /// immediately and synchronously instead of being stored.
    ///
    /// # Panics
    ///
    /// Panics if the cell is pending and an awaiting computation has parked
    /// its waker here: a cell is consumed either through continuations or
    /// through await, never both.
    pub(crate) fn on_settled(&self, on_resolve: ResolveFn, on_reject: RejectFn) {
        enum Fire {
            Resolve(ResolveFn),
            Reject(RejectFn, Rejection),
            Stored,
        }

        let fire = {
            let mut state = self.state.borrow_mut();
            match state.status {
                Status::Resolved => Fire::Resolve(on_resolve),
                Status::Rejected => Fire::Reject(
                    on_reject,
                    state
                        .error
                        .clone()
                        .expect("rejected cell carries a rejection"),
                ),
                Status::Pending => {
                    assert!(
                        state.waker.is_none(),
                        "cannot register a continuation on a cell that is being awaited"
                    );
                    if state.on_resolve.is_some() || state.on_reject.is_some() {
                        warn!("replacing a pending continuation; the promise chained to it will never settle");
                    }
                    state.on_resolve = Some(on_resolve);
                    state.on_reject = Some(on_reject);
                    Fire::Stored
                }
            }
        };
        match fire {
            Fire::Resolve(callback) => callback(self),
            Fire::Reject(callback, error) => callback(&error),
            Fire::Stored => {}
        }
    }

    /// Await integration: ready with the outcome if settled, otherwise parks
    /// the caller's waker as the cell's resume token.
    ///
    /// # Panics
    ///
    /// Panics if the cell is pending and a continuation is registered; see
    /// [`on_settled`](Self::on_settled).
    pub(crate) fn poll_settled<T: Any>(&self, cx: &mut Context<'_>) -> Poll<Result<Rc<T>, Rejection>> {
        let mut state = self.state.borrow_mut();
        match state.status {
            Status::Resolved => {
                let value = state.value.clone().expect("resolved cell carries a value");
                let Ok(value) = value.downcast::<T>() else {
                    unreachable!("typed handle matches its cell tag");
                };
                Poll::Ready(Ok(value))
            }
            Status::Rejected => Poll::Ready(Err(state
                .error
                .clone()
                .expect("rejected cell carries a rejection"))),
            Status::Pending => {
                assert!(
                    state.on_resolve.is_none() && state.on_reject.is_none(),
                    "cannot await a cell that has a continuation registered"
                );
                match &state.waker {
                    Some(parked) if parked.will_wake(cx.waker()) => {}
                    _ => state.waker = Some(cx.waker().clone()),
                }
                Poll::Pending
            }
        }
    }
}

impl fmt::Debug for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("CellRef")
            .field("status", &state.status)
            .field("value_type", &state.tag.name)
            .finish()
    }
}

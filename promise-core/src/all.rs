//! Wait-for-all combinator.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::debug;

use crate::cell::CellRef;
use crate::promise::Promise;

/// Resolves once every source cell has resolved, or rejects as soon as any
/// source rejects.
///
/// The result is an ordered list of the sources' cells, in input order no
/// matter which order they settled in; recover each concrete value with
/// [`CellRef::value`]. An empty source list resolves immediately with an
/// empty list. After the first rejection, later settlements of the other
/// sources are no-ops.
///
/// # Examples
///
/// ```
/// use promise_core::{all, Promise};
///
/// let numbers: Promise<i32> = Promise::pending();
/// let greeting = Promise::resolved(String::from("Hello"));
/// let ratio = Promise::resolved(3.3_f64);
///
/// let joined = all(vec![numbers.cell(), greeting.cell(), ratio.cell()]);
/// assert!(joined.is_pending());
///
/// numbers.resolve(1);
/// let states = joined.value().unwrap();
/// assert_eq!(*states[0].value::<i32>().unwrap(), 1);
/// assert_eq!(*states[1].value::<String>().unwrap(), "Hello");
/// assert_eq!(*states[2].value::<f64>().unwrap(), 3.3);
/// ```
///
/// # Panics
///
/// Panics if any source is pending and already being awaited; the combinator
/// consumes its sources continuation-style.
pub fn all(sources: Vec<CellRef>) -> Promise<Vec<CellRef>> {
    let joined = Promise::pending();
    if sources.is_empty() {
        joined.resolve(Vec::new());
        return joined;
    }
    debug!(sources = sources.len(), "joining cells");

    let outstanding = Rc::new(Cell::new(sources.len()));
    // Slots are preallocated with each source's own cell and overwritten as
    // the sources resolve, which keeps the result in input order.
    let slots = Rc::new(RefCell::new(sources.clone()));

    for (index, source) in sources.into_iter().enumerate() {
        let joined_on_resolve = joined.clone();
        let joined_on_reject = joined.clone();
        let outstanding = outstanding.clone();
        let slots = slots.clone();
        source.on_settled(
            Box::new(move |settled: &CellRef| {
                slots.borrow_mut()[index] = settled.clone();
                outstanding.set(outstanding.get() - 1);
                if outstanding.get() == 0 {
                    let states = std::mem::take(&mut *slots.borrow_mut());
                    joined_on_resolve.resolve(states);
                }
            }),
            Box::new(move |error| joined_on_reject.reject(error.clone())),
        );
    }
    joined
}

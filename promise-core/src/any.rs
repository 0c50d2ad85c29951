//! First-to-settle combinator.

use tracing::debug;

use crate::cell::CellRef;
use crate::error::NoContestants;
use crate::promise::Promise;

/// Settles with whichever source settles first, success or failure.
///
/// The race resolves to the *winning cell*, so a consumer of heterogeneous
/// sources recovers the concrete value with [`CellRef::is_value_of`] and
/// [`CellRef::value`]. Settlements after the first are no-ops. An empty
/// source list rejects immediately with [`NoContestants`] — a race nobody
/// entered cannot be won.
///
/// # Examples
///
/// ```
/// use promise_core::{any, Promise};
///
/// let slow: Promise<i32> = Promise::pending();
/// let fast: Promise<String> = Promise::pending();
///
/// let raced = any(vec![slow.cell(), fast.cell()]);
/// fast.resolve(String::from("Hello"));
///
/// let winner = raced.value().unwrap();
/// assert!(winner.is_value_of::<String>());
/// assert_eq!(*winner.value::<String>().unwrap(), "Hello");
/// ```
///
/// # Panics
///
/// Panics if any source is pending and already being awaited; the combinator
/// consumes its sources continuation-style.
pub fn any(sources: Vec<CellRef>) -> Promise<CellRef> {
    let raced = Promise::pending();
    if sources.is_empty() {
        raced.reject(NoContestants);
        return raced;
    }
    debug!(sources = sources.len(), "racing cells");

    for source in sources {
        let raced_on_resolve = raced.clone();
        let raced_on_reject = raced.clone();
        source.on_settled(
            Box::new(move |settled: &CellRef| raced_on_resolve.resolve(settled.clone())),
            Box::new(move |error| raced_on_reject.reject(error.clone())),
        );
        // A pre-settled source decides the race; the rest never matter.
        if !raced.is_pending() {
            break;
        }
    }
    raced
}

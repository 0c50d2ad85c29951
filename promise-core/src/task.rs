//! Entry point for promise-backed async computations.
//!
//! [`spawn`] is the bridge from Rust's native suspension feature (`async`
//! blocks) to a promise handle: the handle is materialized at invocation
//! time, the body runs on whatever single-threaded executor the caller
//! injects, and the body's final value settles the handle. An `Err` escaping
//! the body becomes a rejection; a body that completes with another promise
//! forwards its settlement instead.
//!
//! This crate contains no executor of its own. Any spawner implementing
//! [`futures::task::LocalSpawn`] works; tests use
//! [`futures::executor::LocalPool`].

use std::any::Any;
use std::future::Future;

use futures::task::{LocalSpawn, LocalSpawnExt};
use tracing::trace;

use crate::error::Rejection;
use crate::promise::Promise;

/// How a computation body's final value settles the handle returned at
/// invocation time.
pub trait IntoSettlement<T> {
    fn settle(self, target: &Promise<T>);
}

/// Normal completion: `Ok` resolves the handle, `Err` rejects it. This is
/// how an uncaught failure inside the computation surfaces — no failure
/// escapes silently.
impl<T: Any> IntoSettlement<T> for Result<T, Rejection> {
    fn settle(self, target: &Promise<T>) {
        match self {
            Ok(value) => target.resolve(value),
            Err(error) => target.reject(error),
        }
    }
}

/// Completion with another promise: the outer handle adopts the inner one
/// and settles when it does, however deep the forwarding chain goes.
impl<T: Any> IntoSettlement<T> for Promise<T> {
    fn settle(self, target: &Promise<T>) {
        target.adopt(&self);
    }
}

/// Runs `body` as a promise-backed computation on `spawner`.
///
/// The returned handle exists before the body starts; the body settles it by
/// completing (see [`IntoSettlement`]). If the spawner refuses the task, the
/// handle is rejected with the spawn error rather than left pending forever.
///
/// # Examples
///
/// ```
/// use futures::executor::LocalPool;
/// use promise_core::{task, Promise, Rejection};
///
/// let mut pool = LocalPool::new();
/// let spawner = pool.spawner();
///
/// let doubled = task::spawn(&spawner, async { Ok::<_, Rejection>(21 * 2) });
/// assert!(doubled.is_pending());
///
/// pool.run_until_stalled();
/// assert_eq!(*doubled.value().unwrap(), 42);
/// ```
pub fn spawn<T, O, F, S>(spawner: &S, body: F) -> Promise<T>
where
    T: Any,
    O: IntoSettlement<T>,
    F: Future<Output = O> + 'static,
    S: LocalSpawn + ?Sized,
{
    let promise = Promise::pending();
    let handle = promise.clone();
    let spawned = spawner.spawn_local(async move {
        body.await.settle(&handle);
        trace!("computation settled its handle");
    });
    if let Err(error) = spawned {
        promise.reject(error);
    }
    promise
}

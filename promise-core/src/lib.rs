//! JavaScript-style promises for single-threaded async Rust.
//!
//! This crate provides a single-assignment container for the eventual result
//! of a computation, consumed either through `then`/`catch` continuation
//! chains or through Rust's native `async`/`await`:
//!
//! - [`Promise<T>`]: the cloneable producer/consumer handle.
//! - [`CellRef`]: a type-erased reference to one settlement cell, with
//!   checked runtime recovery of the concrete value type.
//! - [`all`]: resolves when every source resolves, fail-fast on rejection.
//! - [`any`]: settles with whichever source settles first.
//! - [`task::spawn`]: runs an async body whose completion (or escaping
//!   error) settles a promise handle.
//!
//! # Concurrency model
//!
//! Everything here is single-threaded, cooperative, and re-entrant.
//! Settlement runs continuations synchronously on the caller's stack, and
//! handles are `Rc`-backed and not `Send`. Producers living on other threads
//! must funnel their `resolve`/`reject` calls onto the owning thread
//! themselves; there is no lock, scheduler, or thread pool in this crate.
//!
//! # Examples
//!
//! ```
//! use futures::executor::LocalPool;
//! use promise_core::{all, task, Promise, Rejection};
//!
//! let mut pool = LocalPool::new();
//! let spawner = pool.spawner();
//!
//! let port: Promise<i32> = Promise::pending();
//! let banner = Promise::resolved(String::from("ready"));
//!
//! let joined = all(vec![port.cell(), banner.cell()]);
//! let report = task::spawn(&spawner, async move {
//!     let states = joined.await?;
//!     Ok(format!(
//!         "{} on {}",
//!         states[1].value::<String>().unwrap(),
//!         states[0].value::<i32>().unwrap(),
//!     ))
//! });
//!
//! port.resolve(8080);
//! pool.run_until_stalled();
//! assert_eq!(*report.value().unwrap(), "ready on 8080");
//! ```

mod all;
mod any;
mod cell;
mod error;
mod promise;
pub mod task;

pub use all::all;
pub use any::any;
pub use cell::CellRef;
pub use error::{NoContestants, Rejection, ValueError};
pub use promise::{ContinuationOutcome, Promise};
pub use task::spawn;

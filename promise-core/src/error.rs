//! Error types for promise settlement and typed cell access.
//!
//! Two very different failure kinds live here:
//!
//! - [`Rejection`] is the payload a promise is *rejected* with. It flows
//!   through `catch` chains and is returned from await points, exactly like a
//!   resolution value flows through `then` chains.
//! - [`ValueError`] is a local programming error raised at the access site
//!   when typed access to a type-erased cell fails. It never rejects anything.

use std::error::Error as StdError;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// The error payload carried by a rejected promise.
///
/// A `Rejection` wraps any `std::error::Error` behind a shared pointer, so it
/// can be cloned cheaply into every `catch` continuation and chained cell that
/// observes it, the same way a resolution value is shared down a `then` chain.
///
/// Any error type converts into a `Rejection` implicitly:
///
/// ```
/// use promise_core::{Promise, Rejection};
///
/// let promise: Promise<i32> = Promise::pending();
/// promise.reject(std::io::Error::new(std::io::ErrorKind::TimedOut, "device went away"));
/// assert!(promise.is_rejected());
/// ```
#[derive(Clone)]
pub struct Rejection {
    inner: Rc<dyn StdError>,
}

impl Rejection {
    /// Wraps a concrete error.
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + 'static,
    {
        Self {
            inner: Rc::new(error),
        }
    }

    /// Builds a rejection from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::new(Message(message.into()))
    }

    /// Returns the concrete error this rejection wraps, if it is an `E`.
    ///
    /// ```
    /// use promise_core::{NoContestants, Rejection};
    ///
    /// let rejection = Rejection::new(NoContestants);
    /// assert!(rejection.downcast_ref::<NoContestants>().is_some());
    /// ```
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: StdError + 'static,
    {
        self.inner.as_ref().downcast_ref::<E>()
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl fmt::Debug for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Rejection").field(&self.inner).finish()
    }
}

// Rejection deliberately does not implement std::error::Error itself, which
// keeps this blanket conversion coherent.
impl<E> From<E> for Rejection
where
    E: StdError + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

/// Message-only error used by [`Rejection::msg`].
#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

/// Failure of typed access to a type-erased cell.
///
/// These are programming errors local to the access site. They are returned
/// to the caller instead of rejecting the cell that was being inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The cell has not resolved to a value (it is pending or rejected).
    #[error("cell has not resolved to a value")]
    Unresolved,

    /// The cell carries a value of a different type than the one requested.
    #[error("cell holds `{found}`, not `{expected}`")]
    TypeMismatch {
        /// The type the caller asked for.
        expected: &'static str,
        /// The type the cell was created for.
        found: &'static str,
    },
}

/// The rejection produced by [`any`](crate::any) when it is given no sources.
///
/// A race with no contestants can never be won, so it rejects immediately
/// rather than resolving to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("race constructed with no contestant promises")]
pub struct NoContestants;

//! # Error Types
//!
//! Three families of failure flow through the engine:
//!
//! * [`OperationError`]: domain failures raised by an operation's `resume`.
//!   They terminate the owning task, are recorded verbatim on its future and
//!   are never retried.
//! * [`FutureError`]: what a caller waiting on an `OperationFuture` sees.
//!   Cancellation is reported here but is not a failure of the operation.
//! * [`UsageError`]: programming misuse, reported synchronously at the call
//!   site instead of being deferred into a future.

use std::sync::Arc;

use cgmath::Point3;
use thiserror::Error;
use web_time::Duration;

/// A domain failure raised while resuming an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
    /// An edit session refused a change because its change limit was reached.
    #[error("max changes exceeded: the session allows {limit} changes")]
    MaxChangesExceeded {
        /// The configured limit.
        limit: usize,
    },

    /// A position fell outside the bounds an extent accepts.
    #[error("position ({}, {}, {}) is outside the extent", .0.x, .0.y, .0.z)]
    OutOfBounds(Point3<i32>),

    /// A failure re-wrapped by a legacy run-to-completion helper.
    #[error("operation failed: {0}")]
    Legacy(Box<OperationError>),

    /// Any other failure reported by an operation.
    #[error("{0}")]
    Other(String),
}

impl OperationError {
    /// Returns `true` for the resource-limit failure.
    pub fn is_limit_exceeded(&self) -> bool {
        matches!(self, OperationError::MaxChangesExceeded { .. })
    }
}

/// The outcome of waiting on an `OperationFuture` that did not succeed.
#[derive(Debug, Clone, Error)]
pub enum FutureError {
    /// The operation was cancelled before it completed.
    #[error("operation {operation} was cancelled")]
    Cancelled {
        /// Name of the root operation.
        operation: &'static str,
    },

    /// The operation raised a domain failure.
    #[error("error while executing operation {operation}: {cause}")]
    Failed {
        /// Name of the root operation.
        operation: &'static str,
        /// The failure exactly as the operation raised it.
        cause: Arc<OperationError>,
    },

    /// The wait ran out before the operation reached a terminal state.
    #[error("timed out waiting for the operation to complete - waited for {0:?}")]
    Timeout(Duration),

    /// A blocking wait was attempted on the thread that drives heartbeats.
    ///
    /// That thread is the only one that can ever complete the future, so the
    /// wait could never return.
    #[error("may not block on a pending operation future from the driving thread")]
    WouldDeadlock,
}

/// Misuse of the engine's API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    /// Work was submitted to an executor that has been shut down.
    #[error("operation executor is shut down")]
    Rejected,

    /// A count delegate was asked to report its own wrapped operation's count
    /// through the very same object.
    #[error("the wrapped operation and its counter must be different objects")]
    SelfCounting,
}

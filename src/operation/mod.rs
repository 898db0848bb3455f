//! # Operations
//!
//! An operation is a suspendable unit of bulk work: fill a region, copy it,
//! count blocks in it. Instead of running to completion in one call, an
//! operation is *resumed* repeatedly; every call does a bounded amount of
//! work and reports whether there is more to do. This lets a host loop with a
//! hard per-tick budget make progress on edits touching millions of cells
//! without ever stalling a tick.
//!
//! ## Architecture Overview
//!
//! - `Operation`: the resumable contract, an explicit state machine behind `resume`
//! - `RunContext`: answers "may I keep working right now"
//! - Composite operations (`ForwardExtentCopy`, `UnfairOperationInterleave`,
//!   `CountDelegatedOperation`, `OperationQueue`) build bigger operations out of smaller ones
//! - `OperationFuture`: the handle a submitter keeps to observe or cancel the work
//! - `OperationExecutorService`: the queue a heartbeat drains under a budget
//!
//! ## Operation Lifecycle
//! 1. Application code builds an operation tree
//! 2. The tree is submitted with its edit session and a future is handed back
//! 3. Each heartbeat resumes the head of the queue until the budget runs out
//! 4. When the root reports `Step::Done`, the session is flushed and the future completes
//! 5. The finished operation is dropped and never resumed again
//!
//! ## Example Usage
//! ```rust
//! use voxel_operations::operation::{complete::complete, Operation, RunContext, Step};
//! use voxel_operations::error::OperationError;
//!
//! struct Countdown(u32);
//!
//! impl Operation for Countdown {
//!     fn resume(&mut self, _run: &dyn RunContext) -> Result<Step, OperationError> {
//!         if self.0 == 0 {
//!             return Ok(Step::Done);
//!         }
//!         self.0 -= 1;
//!         Ok(Step::Continue)
//!     }
//! }
//!
//! complete(Box::new(Countdown(3))).unwrap();
//! ```

pub mod complete;
pub mod count_delegated;
pub mod executor;
pub mod forward_extent_copy;
pub mod future;
pub mod interleave;
pub mod operation_queue;
pub mod region_visitor;
pub mod run_context;

use crate::core::MtResource;
use crate::error::OperationError;

pub use count_delegated::CountDelegatedOperation;
pub use executor::{OperationExecutorService, PendingWork};
pub use forward_extent_copy::ForwardExtentCopy;
pub use future::{OperationFuture, OperationOutcome, PrimaryThread};
pub use interleave::UnfairOperationInterleave;
pub use operation_queue::OperationQueue;
pub use region_visitor::RegionVisitor;
pub use run_context::{
    CountdownRunContext, RunContext, TimedRunContext, UnconditionalRunContext, UNCONDITIONAL,
};

/// What an operation reports after one resumption.
pub enum Step {
    /// Not done; resume this same operation again.
    Continue,
    /// Not done; resume this operation instead from now on.
    Replace(Box<dyn Operation>),
    /// Done. The operation must not be resumed again.
    Done,
}

impl Step {
    /// Returns `true` for [`Step::Done`].
    pub fn is_done(&self) -> bool {
        matches!(self, Step::Done)
    }
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Continue => write!(f, "Continue"),
            Step::Replace(next) => write!(f, "Replace({})", next.name()),
            Step::Done => write!(f, "Done"),
        }
    }
}

/// A resumable unit of work.
///
/// `resume` is only ever called from one driving context at a time for a
/// given operation, and never again once it returned [`Step::Done`] or an
/// error. Each call must bound its own cost (cap the cells it touches):
/// the driver can only stop between calls, not inside one.
///
/// Operations mutate their edit session out of band, through the shared
/// extent handles they were built with.
pub trait Operation: Send {
    /// Does a bounded slice of work.
    ///
    /// # Arguments
    /// * `run` - The budget of the current slice. Composite operations pass
    ///   it down; leaves may poll it to stop early.
    ///
    /// # Returns
    /// The continuation, or `Step::Done`, or a domain failure that terminates
    /// the whole task.
    fn resume(&mut self, run: &dyn RunContext) -> Result<Step, OperationError>;

    /// Requests cancellation. Best-effort and idempotent.
    fn cancel(&mut self) {}

    /// Opportunistic work may be abandoned once nothing essential remains.
    fn is_opportunistic(&self) -> bool {
        false
    }

    /// Running count of affected cells, if this operation keeps one.
    fn affected(&self) -> Option<usize> {
        None
    }

    /// Name used in logs and error messages.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Address of the object holding this operation's state.
    ///
    /// Shared handles report the shared allocation, so two handles to the
    /// same operation compare equal.
    fn identity(&self) -> *const () {
        self as *const Self as *const ()
    }
}

/// Anything exposing a running count of affected cells.
pub trait AffectedCounter: Send + Sync {
    /// The count so far.
    fn affected(&self) -> usize;

    /// Address of the object holding the count. See [`Operation::identity`].
    fn identity(&self) -> *const () {
        self as *const Self as *const ()
    }
}

/// A shared operation: the executor drives it while other code keeps a
/// handle to observe it, typically its affected count.
impl<O: Operation + Sync + 'static> Operation for MtResource<O> {
    fn resume(&mut self, run: &dyn RunContext) -> Result<Step, OperationError> {
        self.get_mut().resume(run)
    }

    fn cancel(&mut self) {
        self.get_mut().cancel();
    }

    fn is_opportunistic(&self) -> bool {
        self.get().is_opportunistic()
    }

    fn affected(&self) -> Option<usize> {
        self.get().affected()
    }

    fn name(&self) -> &'static str {
        self.get().name()
    }

    fn identity(&self) -> *const () {
        self.shared_ptr()
    }
}

impl<C: AffectedCounter + ?Sized> AffectedCounter for MtResource<C> {
    fn affected(&self) -> usize {
        self.get().affected()
    }

    fn identity(&self) -> *const () {
        self.shared_ptr()
    }
}

/// The mutation buffer a submitted task writes through.
pub trait Session: Send + Sync {
    /// Commits every pending change.
    fn flush(&mut self);

    /// Marks whether a long-running operation currently owns the session.
    fn set_in_long_operation(&mut self, _in_long_operation: bool) {}
}

/// Shared handle to a task's mutation buffer.
pub type SharedSession = MtResource<dyn Session>;

/// A session with nothing to commit, for operations that write elsewhere.
#[derive(Debug, Default)]
pub struct NoopSession;

impl Session for NoopSession {
    fn flush(&mut self) {}
}

impl NoopSession {
    /// A fresh shared no-op session.
    pub fn shared() -> SharedSession {
        MtResource::<dyn Session>::from_shared(MtResource::new(NoopSession).resource)
    }
}

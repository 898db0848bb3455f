//! # Scheduling
//!
//! The host side of the engine. A host loop exposes a `SchedulingPlatform`
//! through which the runtime arranges for the executor's heartbeat to run
//! once per tick; `OperationRuntime` ties the two together.
//!
//! ## Key Components
//! - `SchedulingPlatform`: what the runtime needs from a host loop
//! - `NoScheduling`: a host that cannot schedule anything
//! - `TickScheduler`: an in-process tick loop driven by calling `tick`
//! - `OperationRuntime`: submits operations and keeps the heartbeat armed

pub mod runtime;
pub mod tick_scheduler;

pub use runtime::OperationRuntime;
pub use tick_scheduler::TickScheduler;

/// Identifier of a task scheduled on a platform.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(pub u64);

/// A host loop able to run tasks on its primary thread.
pub trait SchedulingPlatform: Send + Sync {
    /// Runs `task` every `period` ticks, starting `delay` ticks from now.
    ///
    /// # Returns
    /// `None` if the platform cannot schedule.
    fn schedule_repeating(&self, delay: u64, period: u64, task: Box<dyn FnMut() + Send>) -> Option<TaskId>;

    /// Runs `task` once on the next tick.
    fn schedule_next(&self, task: Box<dyn FnOnce() + Send>) -> Option<TaskId>;

    /// Cancels a scheduled task. Safe to call from inside the task itself.
    ///
    /// # Returns
    /// `true` if the task was still scheduled.
    fn cancel_scheduled(&self, id: TaskId) -> bool;

    /// Whether the calling thread is the host's primary thread.
    fn is_primary_thread(&self) -> bool;
}

/// A platform that cannot schedule anything.
///
/// Operations handed to a runtime on this platform run to completion right
/// away on the submitting thread.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoScheduling;

impl SchedulingPlatform for NoScheduling {
    fn schedule_repeating(&self, _delay: u64, _period: u64, _task: Box<dyn FnMut() + Send>) -> Option<TaskId> {
        None
    }

    fn schedule_next(&self, _task: Box<dyn FnOnce() + Send>) -> Option<TaskId> {
        None
    }

    fn cancel_scheduled(&self, _id: TaskId) -> bool {
        false
    }

    fn is_primary_thread(&self) -> bool {
        false
    }
}

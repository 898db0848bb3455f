//! # Operation Futures
//!
//! An `OperationFuture` is the submitter's view of a task: it can be polled,
//! waited on from another thread, cancelled, and decorated with listeners.
//!
//! ## States
//!
//! A future starts *pending* and moves exactly once to one of the terminal
//! states *succeeded*, *failed* or *cancelled*. Once terminal it never changes
//! again. "Started" is a flag on top of pending: set when the executor first
//! resumes the task.
//!
//! ## Waiting
//!
//! Blocking waits are refused on the primary thread, the thread that drives
//! heartbeats. A pending future can only make progress when that thread runs
//! a heartbeat, so waiting on it there could never return.

use std::sync::Arc;
use std::thread::{self, ThreadId};

use log::warn;
use parking_lot::{Condvar, Mutex};
use web_time::{Duration, Instant};

use crate::error::{FutureError, OperationError};
use crate::operation::AffectedCounter;
use crate::scheduling::SchedulingPlatform;

/// What a successful operation reports.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct OperationOutcome {
    /// The explicit counter's value if one was set, else the affected count
    /// of the last operation in the continuation chain.
    pub affected: Option<usize>,
    /// Time from submission to completion.
    pub elapsed: Duration,
}

/// The thread allowed to drive heartbeats. Clones share the designation.
#[derive(Clone, Debug, Default)]
pub struct PrimaryThread {
    id: Arc<Mutex<Option<ThreadId>>>,
}

impl PrimaryThread {
    /// Designates the calling thread.
    pub fn claim_current(&self) {
        self.designate(thread::current().id());
    }

    pub fn designate(&self, id: ThreadId) {
        *self.id.lock() = Some(id);
    }

    /// Whether the calling thread is the designated one.
    pub fn is_current(&self) -> bool {
        *self.id.lock() == Some(thread::current().id())
    }
}

type Listener = Box<dyn FnOnce(&OperationFuture) + Send>;

enum Status {
    Pending,
    Succeeded(OperationOutcome),
    Failed(Arc<OperationError>),
    Cancelled,
}

struct FutureState {
    status: Status,
    started: bool,
    delayed: bool,
    on_finish: Vec<Listener>,
    on_failure: Vec<Listener>,
    on_first_continue: Vec<Listener>,
    counter: Option<Arc<dyn AffectedCounter>>,
}

struct FutureInner {
    operation: &'static str,
    submitted_at: Instant,
    primary: PrimaryThread,
    platform: Option<Arc<dyn SchedulingPlatform>>,
    state: Mutex<FutureState>,
    terminal: Condvar,
}

/// Handle to a submitted operation. Clones observe the same task.
#[derive(Clone)]
pub struct OperationFuture {
    inner: Arc<FutureInner>,
}

impl std::fmt::Debug for OperationFuture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationFuture")
            .field("operation", &self.inner.operation)
            .field("started", &self.is_started())
            .field("done", &self.is_done())
            .finish()
    }
}

impl OperationFuture {
    pub(crate) fn new(
        operation: &'static str,
        primary: PrimaryThread,
        platform: Option<Arc<dyn SchedulingPlatform>>,
    ) -> Self {
        Self {
            inner: Arc::new(FutureInner {
                operation,
                submitted_at: Instant::now(),
                primary,
                platform,
                state: Mutex::new(FutureState {
                    status: Status::Pending,
                    started: false,
                    delayed: false,
                    on_finish: Vec::new(),
                    on_failure: Vec::new(),
                    on_first_continue: Vec::new(),
                    counter: None,
                }),
                terminal: Condvar::new(),
            }),
        }
    }

    /// Name of the root operation.
    pub fn operation_name(&self) -> &'static str {
        self.inner.operation
    }

    /// When the task was submitted.
    pub fn submitted_at(&self) -> Instant {
        self.inner.submitted_at
    }

    /// Makes the outcome report `counter` instead of the operation's own count.
    pub fn set_counter(&self, counter: Arc<dyn AffectedCounter>) -> &Self {
        self.inner.state.lock().counter = Some(counter);
        self
    }

    pub(crate) fn counted(&self) -> Option<usize> {
        let counter = self.inner.state.lock().counter.clone();
        counter.map(|counter| counter.affected())
    }

    /// Whether both handles observe the same task.
    pub fn same_task(&self, other: &OperationFuture) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether the task reached any terminal state.
    pub fn is_done(&self) -> bool {
        !matches!(self.inner.state.lock().status, Status::Pending)
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.inner.state.lock().status, Status::Cancelled)
    }

    pub fn is_success(&self) -> bool {
        matches!(self.inner.state.lock().status, Status::Succeeded(_))
    }

    /// Whether the executor resumed the task at least once.
    pub fn is_started(&self) -> bool {
        self.inner.state.lock().started
    }

    /// The failure that terminated the task, if it failed.
    pub fn get_thrown(&self) -> Option<Arc<OperationError>> {
        match &self.inner.state.lock().status {
            Status::Failed(cause) => Some(cause.clone()),
            _ => None,
        }
    }

    /// The result if the task is terminal, without blocking.
    pub fn try_get(&self) -> Option<Result<OperationOutcome, FutureError>> {
        self.result_of(&self.inner.state.lock())
    }

    /// Blocks until the task is terminal.
    ///
    /// # Returns
    /// * `Ok(outcome)` if the operation succeeded
    /// * `FutureError::Cancelled` or `FutureError::Failed` for the other terminal states
    /// * `FutureError::WouldDeadlock` if called on the primary thread while pending
    pub fn get(&self) -> Result<OperationOutcome, FutureError> {
        let mut state = self.inner.state.lock();
        if let Some(result) = self.result_of(&state) {
            return result;
        }
        if self.inner.primary.is_current() {
            return Err(FutureError::WouldDeadlock);
        }
        loop {
            self.inner.terminal.wait(&mut state);
            if let Some(result) = self.result_of(&state) {
                return result;
            }
        }
    }

    /// Like [`get`](Self::get), giving up with `FutureError::Timeout` after `timeout`.
    pub fn get_timeout(&self, timeout: Duration) -> Result<OperationOutcome, FutureError> {
        let deadline = Instant::now() + timeout;
        let mut state = self.inner.state.lock();
        if let Some(result) = self.result_of(&state) {
            return result;
        }
        if self.inner.primary.is_current() {
            return Err(FutureError::WouldDeadlock);
        }
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(FutureError::Timeout(timeout));
            }
            self.inner.terminal.wait_for(&mut state, remaining);
            if let Some(result) = self.result_of(&state) {
                return result;
            }
        }
    }

    /// Cancels the task.
    ///
    /// A task the executor already started is only cancelled when
    /// `may_interrupt` is set. The executor notices at its next check and
    /// never resumes the operation again.
    ///
    /// # Returns
    /// `true` if this call moved the future to cancelled.
    pub fn cancel(&self, may_interrupt: bool) -> bool {
        let listeners = {
            let mut state = self.inner.state.lock();
            if !matches!(state.status, Status::Pending) || (state.started && !may_interrupt) {
                return false;
            }
            state.status = Status::Cancelled;
            state.on_finish.clear();
            state.on_first_continue.clear();
            std::mem::take(&mut state.on_failure)
        };
        self.inner.terminal.notify_all();
        self.fire(listeners);
        true
    }

    /// Runs `listener` once the task succeeds.
    ///
    /// If it already has, the listener runs on the platform's next tick, or
    /// right away when there is no platform able to schedule it.
    pub fn on_finish(&self, listener: impl FnOnce(&OperationFuture) + Send + 'static) -> &Self {
        let mut state = self.inner.state.lock();
        if matches!(state.status, Status::Pending) {
            state.on_finish.push(Box::new(listener));
            return self;
        }
        let succeeded = matches!(state.status, Status::Succeeded(_));
        drop(state);
        if succeeded {
            self.fire_late(Box::new(listener));
        }
        self
    }

    /// Runs `listener` once the task fails or is cancelled. Late registration
    /// is handled as in [`on_finish`](Self::on_finish).
    pub fn on_failure(&self, listener: impl FnOnce(&OperationFuture) + Send + 'static) -> &Self {
        let mut state = self.inner.state.lock();
        if matches!(state.status, Status::Pending) {
            state.on_failure.push(Box::new(listener));
            return self;
        }
        let failed = !matches!(state.status, Status::Succeeded(_));
        drop(state);
        if failed {
            self.fire_late(Box::new(listener));
        }
        self
    }

    /// Runs `listener` the first time a heartbeat ends with the task unfinished.
    ///
    /// Registered after that moment, the listener runs right away.
    pub fn on_first_continue(&self, listener: impl FnOnce(&OperationFuture) + Send + 'static) -> &Self {
        let mut state = self.inner.state.lock();
        if state.delayed {
            drop(state);
            listener(self);
            return self;
        }
        if matches!(state.status, Status::Pending) {
            state.on_first_continue.push(Box::new(listener));
        }
        self
    }

    pub(crate) fn mark_started(&self) {
        self.inner.state.lock().started = true;
    }

    /// Records that a heartbeat ended with the task unfinished.
    ///
    /// # Returns
    /// `true` the first time.
    pub(crate) fn mark_delayed(&self) -> bool {
        let listeners = {
            let mut state = self.inner.state.lock();
            if state.delayed {
                return false;
            }
            state.delayed = true;
            std::mem::take(&mut state.on_first_continue)
        };
        self.fire(listeners);
        true
    }

    pub(crate) fn succeed(&self, outcome: OperationOutcome) {
        let listeners = {
            let mut state = self.inner.state.lock();
            if !matches!(state.status, Status::Pending) {
                return;
            }
            state.status = Status::Succeeded(outcome);
            state.on_failure.clear();
            state.on_first_continue.clear();
            std::mem::take(&mut state.on_finish)
        };
        self.inner.terminal.notify_all();
        self.fire(listeners);
    }

    pub(crate) fn fail(&self, cause: OperationError) {
        let listeners = {
            let mut state = self.inner.state.lock();
            if !matches!(state.status, Status::Pending) {
                warn!("Dropping failure of already finished operation {}: {}", self.inner.operation, cause);
                return;
            }
            state.status = Status::Failed(Arc::new(cause));
            state.on_finish.clear();
            state.on_first_continue.clear();
            std::mem::take(&mut state.on_failure)
        };
        self.inner.terminal.notify_all();
        self.fire(listeners);
    }

    fn result_of(&self, state: &FutureState) -> Option<Result<OperationOutcome, FutureError>> {
        match &state.status {
            Status::Pending => None,
            Status::Succeeded(outcome) => Some(Ok(*outcome)),
            Status::Failed(cause) => Some(Err(FutureError::Failed {
                operation: self.inner.operation,
                cause: cause.clone(),
            })),
            Status::Cancelled => Some(Err(FutureError::Cancelled {
                operation: self.inner.operation,
            })),
        }
    }

    fn fire_late(&self, listener: Listener) {
        let Some(platform) = &self.inner.platform else {
            listener(self);
            return;
        };
        let slot = Arc::new(Mutex::new(Some(listener)));
        let deferred = slot.clone();
        let future = self.clone();
        let scheduled = platform.schedule_next(Box::new(move || {
            if let Some(listener) = deferred.lock().take() {
                listener(&future);
            }
        }));
        if scheduled.is_none() {
            if let Some(listener) = slot.lock().take() {
                listener(self);
            }
        }
    }

    fn fire(&self, listeners: Vec<Listener>) {
        for listener in listeners {
            listener(self);
        }
    }
}

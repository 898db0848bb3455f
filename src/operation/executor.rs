//! # Operation Executor Service
//!
//! The executor owns every submitted task and advances them only when the
//! host gives it a heartbeat. It is modelled on a main-loop task manager: any
//! thread may submit, submissions travel through an MPSC channel, and the
//! driving thread drains that channel into its own queue at the start of each
//! heartbeat.
//!
//! ## Heartbeat
//!
//! 1. The calling thread becomes the primary thread
//! 2. New submissions are moved from the channel to the back of the task queue
//! 3. While the budget lasts, the head task is worked: resumed until it
//!    finishes or the budget runs out
//! 4. A task left unfinished goes back to the *front* of the queue, so one
//!    task runs at a time, to completion, before the next one starts
//! 5. Any budget left over runs queued callbacks, each isolated so a
//!    panicking callback cannot take the heartbeat down
//!
//! ## Task Completion
//!
//! Whenever a task reaches a terminal state its session is flushed, then its
//! future is completed. Cancelled tasks have their operation cancelled and
//! are never resumed again.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

use log::{debug, error, info, warn};
use parking_lot::Mutex;

use crate::core::config::EngineConfig;
use crate::error::{FutureError, OperationError, UsageError};
use crate::operation::future::{OperationFuture, OperationOutcome, PrimaryThread};
use crate::operation::{Operation, RunContext, SharedSession, Step, TimedRunContext, UNCONDITIONAL};
use crate::scheduling::SchedulingPlatform;

type Callback = Box<dyn FnOnce() + Send>;

/// A submitted operation together with what is needed to finish it.
struct OpTask {
    operation: Box<dyn Operation>,
    session: SharedSession,
    future: OperationFuture,
}

enum Submission {
    Task(OpTask),
    Callback(Callback),
}

/// Whether a task left the queue during `work`.
enum TaskStatus {
    Finished,
    Unfinished,
}

struct ExecutorShared {
    sender: Mutex<Sender<Submission>>,
    inbox: Mutex<Receiver<Submission>>,
    tasks: Mutex<VecDeque<OpTask>>,
    callbacks: Mutex<VecDeque<Callback>>,
    shutdown: AtomicBool,
    primary: PrimaryThread,
    platform: Option<Arc<dyn SchedulingPlatform>>,
    config: EngineConfig,
}

/// Cooperative executor for resumable operations. Clones share one executor.
#[derive(Clone)]
pub struct OperationExecutorService {
    shared: Arc<ExecutorShared>,
}

impl Default for OperationExecutorService {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl OperationExecutorService {
    /// Creates an idle executor.
    ///
    /// # Arguments
    /// * `config` - Supplies the slice length used by [`tick`](Self::tick)
    pub fn new(config: EngineConfig) -> Self {
        Self::build(config, None)
    }

    /// Creates an idle executor whose futures hand late listeners to `platform`.
    pub fn with_platform(config: EngineConfig, platform: Arc<dyn SchedulingPlatform>) -> Self {
        Self::build(config, Some(platform))
    }

    fn build(config: EngineConfig, platform: Option<Arc<dyn SchedulingPlatform>>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            shared: Arc::new(ExecutorShared {
                sender: Mutex::new(sender),
                inbox: Mutex::new(receiver),
                tasks: Mutex::new(VecDeque::new()),
                callbacks: Mutex::new(VecDeque::new()),
                shutdown: AtomicBool::new(false),
                primary: PrimaryThread::default(),
                platform,
                config,
            }),
        }
    }

    /// The thread blocking waits are refused on.
    pub fn primary_thread(&self) -> &PrimaryThread {
        &self.shared.primary
    }

    /// Queues an operation, to be flushed into `session` once it finishes.
    ///
    /// # Returns
    /// A future observing the task, or `UsageError::Rejected` after shutdown.
    pub fn submit(&self, operation: Box<dyn Operation>, session: SharedSession) -> Result<OperationFuture, UsageError> {
        let future = OperationFuture::new(
            operation.name(),
            self.shared.primary.clone(),
            self.shared.platform.clone(),
        );
        self.send(Submission::Task(OpTask {
            operation,
            session,
            future: future.clone(),
        }))?;
        debug!("Submitted operation {}", future.operation_name());
        Ok(future)
    }

    /// Queues a callback to run with whatever budget the operations leave over.
    pub fn execute(&self, callback: impl FnOnce() + Send + 'static) -> Result<(), UsageError> {
        self.send(Submission::Callback(Box::new(callback)))
    }

    fn send(&self, submission: Submission) -> Result<(), UsageError> {
        // The shutdown flag only flips under this lock, so anything sent here
        // is in the channel before `shutdown_now` drains it.
        let sender = self.shared.sender.lock();
        if self.is_shutdown() {
            return Err(UsageError::Rejected);
        }
        sender.send(submission).map_err(|_| UsageError::Rejected)
    }

    fn drain_inbox(&self) {
        let inbox = self.shared.inbox.lock();
        while let Ok(submission) = inbox.try_recv() {
            match submission {
                Submission::Task(task) => self.shared.tasks.lock().push_back(task),
                Submission::Callback(callback) => self.shared.callbacks.lock().push_back(callback),
            }
        }
    }

    /// Runs one heartbeat on the calling thread, bounded by `run`.
    ///
    /// The calling thread becomes the primary thread.
    pub fn heartbeat(&self, run: &dyn RunContext) {
        self.shared.primary.claim_current();
        self.drive(run);
    }

    /// Runs one heartbeat with the configured slice.
    pub fn tick(&self) {
        self.heartbeat(&TimedRunContext::new(self.shared.config.heartbeat_slice()));
    }

    fn drive(&self, run: &dyn RunContext) {
        self.drain_inbox();

        while run.should_continue() {
            let Some(mut task) = self.shared.tasks.lock().pop_front() else {
                break;
            };
            match self.work(&mut task, run) {
                TaskStatus::Finished => {}
                TaskStatus::Unfinished => {
                    if task.future.mark_delayed() {
                        info!("Performing long operation {}...", task.future.operation_name());
                    }
                    self.shared.tasks.lock().push_front(task);
                    break;
                }
            }
        }

        while run.should_continue() {
            let Some(callback) = self.shared.callbacks.lock().pop_front() else {
                break;
            };
            run_isolated(callback);
        }
    }

    fn work(&self, task: &mut OpTask, run: &dyn RunContext) -> TaskStatus {
        if task.future.is_cancelled() {
            retire_cancelled(task);
            return TaskStatus::Finished;
        }
        task.future.mark_started();

        while run.should_continue() {
            if task.future.is_cancelled() {
                retire_cancelled(task);
                return TaskStatus::Finished;
            }
            match task.operation.resume(run) {
                Ok(Step::Continue) => {}
                Ok(Step::Replace(next)) => task.operation = next,
                Ok(Step::Done) => {
                    succeed(task);
                    return TaskStatus::Finished;
                }
                Err(err) => {
                    fail(task, err);
                    return TaskStatus::Finished;
                }
            }
        }
        TaskStatus::Unfinished
    }

    /// Stops accepting work. Queued work still runs on later heartbeats.
    pub fn shutdown(&self) {
        let _sender = self.shared.sender.lock();
        if !self.shared.shutdown.swap(true, Ordering::SeqCst) {
            info!("Operation executor shutting down");
        }
    }

    /// Stops accepting work and hands back everything not yet finished.
    ///
    /// The returned work can be run to completion on the caller's thread.
    pub fn shutdown_now(&self) -> Vec<PendingWork> {
        self.shutdown();
        self.drain_inbox();
        let tasks: Vec<OpTask> = self.shared.tasks.lock().drain(..).collect();
        let callbacks: Vec<Callback> = self.shared.callbacks.lock().drain(..).collect();
        info!(
            "Operation executor stopped with {} operations and {} callbacks pending",
            tasks.len(),
            callbacks.len()
        );
        tasks
            .into_iter()
            .map(|task| PendingWork::Operation(ForceDrain { task }))
            .chain(callbacks.into_iter().map(PendingWork::Callback))
            .collect()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::SeqCst)
    }

    /// Shut down with nothing left to run.
    pub fn is_terminated(&self) -> bool {
        if !self.is_shutdown() {
            return false;
        }
        self.drain_inbox();
        self.shared.tasks.lock().is_empty() && self.shared.callbacks.lock().is_empty()
    }

    /// Works through the queues for at most `timeout` on the calling thread.
    ///
    /// # Returns
    /// Whether the executor is terminated afterwards.
    pub fn await_termination(&self, timeout: web_time::Duration) -> bool {
        let run = TimedRunContext::new(timeout);
        while run.should_continue() && !self.is_idle() {
            self.drive(&run);
        }
        self.is_terminated()
    }

    /// Removes the task observed by `future` from the queue and runs it to
    /// completion on the calling thread.
    ///
    /// A task that is already terminal just reports its result. A task that
    /// is not queued (another thread is driving it right now) is waited for.
    pub fn finish_now(&self, future: &OperationFuture) -> Result<OperationOutcome, FutureError> {
        if let Some(result) = future.try_get() {
            return result;
        }
        self.drain_inbox();
        let task = {
            let mut tasks = self.shared.tasks.lock();
            let index = tasks.iter().position(|task| task.future.same_task(future));
            index.and_then(|index| tasks.remove(index))
        };
        match task {
            Some(task) => {
                // The failure is recorded on the future; the result below reports it.
                let _ = ForceDrain { task }.run();
                future.try_get().unwrap_or(Err(FutureError::Cancelled {
                    operation: future.operation_name(),
                }))
            }
            None => future.get(),
        }
    }

    /// Futures of the queued tasks, head first.
    pub fn queue_snapshot(&self) -> Vec<OperationFuture> {
        self.drain_inbox();
        self.shared.tasks.lock().iter().map(|task| task.future.clone()).collect()
    }

    /// Number of queued tasks.
    pub fn len(&self) -> usize {
        self.drain_inbox();
        self.shared.tasks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// No queued tasks and no queued callbacks.
    pub fn is_idle(&self) -> bool {
        self.drain_inbox();
        self.shared.tasks.lock().is_empty() && self.shared.callbacks.lock().is_empty()
    }
}

fn succeed(task: &mut OpTask) {
    finish_session(task);
    let outcome = OperationOutcome {
        affected: task.future.counted().or_else(|| task.operation.affected()),
        elapsed: task.future.submitted_at().elapsed(),
    };
    debug!(
        "Operation {} completed in {:?}",
        task.future.operation_name(),
        outcome.elapsed
    );
    task.future.succeed(outcome);
}

fn fail(task: &mut OpTask, err: OperationError) {
    error!("Operation {} failed: {}", task.future.operation_name(), err);
    finish_session(task);
    task.future.fail(err);
}

fn retire_cancelled(task: &mut OpTask) {
    info!("Operation {} was cancelled", task.future.operation_name());
    task.operation.cancel();
    finish_session(task);
}

fn finish_session(task: &OpTask) {
    let mut session = task.session.get_mut();
    session.flush();
    session.set_in_long_operation(false);
}

fn run_isolated(callback: Callback) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(callback)) {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        warn!("Queued callback panicked: {}", message);
    }
}

/// A task taken out of a stopped executor.
pub struct ForceDrain {
    task: OpTask,
}

impl ForceDrain {
    /// The future observing this task.
    pub fn future(&self) -> &OperationFuture {
        &self.task.future
    }

    /// Resumes the operation until it finishes, ignoring any budget.
    ///
    /// The session is flushed and the future completed as a heartbeat would.
    pub fn run(mut self) -> Result<(), OperationError> {
        let task = &mut self.task;
        if task.future.is_cancelled() {
            retire_cancelled(task);
            return Ok(());
        }
        task.future.mark_started();
        loop {
            if task.future.is_cancelled() {
                retire_cancelled(task);
                return Ok(());
            }
            match task.operation.resume(&UNCONDITIONAL) {
                Ok(Step::Continue) => {}
                Ok(Step::Replace(next)) => task.operation = next,
                Ok(Step::Done) => {
                    succeed(task);
                    return Ok(());
                }
                Err(err) => {
                    fail(task, err.clone());
                    return Err(err);
                }
            }
        }
    }
}

/// Work handed back by [`OperationExecutorService::shutdown_now`].
pub enum PendingWork {
    Operation(ForceDrain),
    Callback(Box<dyn FnOnce() + Send>),
}

impl PendingWork {
    /// Runs this piece of work to completion on the calling thread.
    pub fn run(self) -> Result<(), OperationError> {
        match self {
            PendingWork::Operation(drain) => drain.run(),
            PendingWork::Callback(callback) => {
                callback();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use std::thread;

    use super::*;
    use crate::operation::testing::{Failing, Scripted};
    use crate::operation::{AffectedCounter, CountdownRunContext, NoopSession};

    /// Hands over to a scripted operation on its first resumption.
    struct HandOff(Option<Scripted>);

    impl Operation for HandOff {
        fn resume(&mut self, _run: &dyn RunContext) -> Result<Step, OperationError> {
            match self.0.take() {
                Some(next) => Ok(Step::Replace(Box::new(next))),
                None => Ok(Step::Done),
            }
        }
    }

    struct Fixed(usize);

    impl AffectedCounter for Fixed {
        fn affected(&self) -> usize {
            self.0
        }
    }

    #[test]
    fn tasks_run_one_at_a_time_in_submission_order() {
        let executor = OperationExecutorService::default();
        let first = Scripted::new(3);
        let second = Scripted::new(1);
        let (first_resumes, second_resumes) = (first.resumes.clone(), second.resumes.clone());
        let first = executor.submit(Box::new(first), NoopSession::shared()).unwrap();
        let second = executor.submit(Box::new(second), NoopSession::shared()).unwrap();

        // heartbeat poll, work poll: one resume.
        executor.heartbeat(&CountdownRunContext::new(2));
        assert_eq!(first_resumes.load(Ordering::SeqCst), 1);
        assert_eq!(second_resumes.load(Ordering::SeqCst), 0);
        assert!(first.is_started() && !second.is_started());

        executor.heartbeat(&UNCONDITIONAL);
        assert!(first.is_success() && second.is_success());
        assert_eq!(first_resumes.load(Ordering::SeqCst), 3);
        assert_eq!(second_resumes.load(Ordering::SeqCst), 1);
        assert_eq!(first.get().unwrap().affected, Some(3));
    }

    #[test]
    fn spent_budget_leaves_everything_untouched() {
        let executor = OperationExecutorService::default();
        let future = executor.submit(Box::new(Scripted::new(1)), NoopSession::shared()).unwrap();
        executor.heartbeat(&CountdownRunContext::new(0));
        assert!(!future.is_started());
        assert_eq!(executor.len(), 1);
    }

    #[test]
    fn failure_completes_the_future_with_the_cause() {
        let executor = OperationExecutorService::default();
        let future = executor
            .submit(
                Box::new(Failing(OperationError::MaxChangesExceeded { limit: 1 })),
                NoopSession::shared(),
            )
            .unwrap();
        executor.heartbeat(&UNCONDITIONAL);
        assert_eq!(
            future.get_thrown().as_deref(),
            Some(&OperationError::MaxChangesExceeded { limit: 1 })
        );
        assert!(executor.is_empty());
    }

    #[test]
    fn cancelled_task_is_never_resumed_again() {
        let executor = OperationExecutorService::default();
        let operation = Scripted::endless();
        let (resumes, cancels) = (operation.resumes.clone(), operation.cancelled.clone());
        let future = executor.submit(Box::new(operation), NoopSession::shared()).unwrap();

        executor.heartbeat(&CountdownRunContext::new(3));
        let before = resumes.load(Ordering::SeqCst);
        assert!(before > 0);

        assert!(future.cancel(true));
        executor.heartbeat(&UNCONDITIONAL);
        assert_eq!(resumes.load(Ordering::SeqCst), before);
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
        assert!(executor.is_empty());
    }

    #[test]
    fn callbacks_run_after_operations_and_panics_are_contained() {
        let executor = OperationExecutorService::default();
        let ran = Arc::new(AtomicUsize::new(0));
        executor.execute(|| panic!("callback failure")).unwrap();
        let counted = ran.clone();
        executor
            .execute(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        executor.heartbeat(&UNCONDITIONAL);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert!(executor.is_idle());
    }

    #[test]
    fn shutdown_rejects_and_hands_back_pending_work() {
        let executor = OperationExecutorService::default();
        let future = executor.submit(Box::new(Scripted::new(4)), NoopSession::shared()).unwrap();
        executor.execute(|| {}).unwrap();

        let pending = executor.shutdown_now();
        assert_eq!(pending.len(), 2);
        assert!(executor.is_terminated());
        assert_eq!(
            executor.submit(Box::new(Scripted::new(1)), NoopSession::shared()).err(),
            Some(UsageError::Rejected)
        );

        for work in pending {
            work.run().unwrap();
        }
        assert!(future.is_success());
    }

    #[test]
    fn shutdown_is_not_termination_while_work_remains() {
        let executor = OperationExecutorService::default();
        let future = executor.submit(Box::new(Scripted::new(2)), NoopSession::shared()).unwrap();
        executor.shutdown();
        assert!(!executor.is_terminated());
        assert!(executor.await_termination(web_time::Duration::from_secs(5)));
        assert!(future.is_success());
    }

    #[test]
    fn submissions_racing_shutdown_are_rejected_or_handed_back() {
        let executor = OperationExecutorService::default();
        let submitter = {
            let executor = executor.clone();
            thread::spawn(move || {
                let mut accepted = Vec::new();
                while let Ok(future) = executor.submit(Box::new(Scripted::new(1)), NoopSession::shared()) {
                    accepted.push(future);
                }
                accepted
            })
        };
        while executor.len() < 16 {
            thread::yield_now();
        }

        let pending = executor.shutdown_now();
        let accepted = submitter.join().unwrap();
        assert_eq!(pending.len(), accepted.len());
        assert!(executor.is_terminated());

        for work in pending {
            work.run().unwrap();
        }
        assert!(accepted.iter().all(OperationFuture::is_success));
    }

    #[test]
    fn explicit_counter_outlives_replacement() {
        let executor = OperationExecutorService::default();
        let counted = executor
            .submit(Box::new(HandOff(Some(Scripted::new(1)))), NoopSession::shared())
            .unwrap();
        counted.set_counter(Arc::new(Fixed(42)));
        let plain = executor
            .submit(Box::new(HandOff(Some(Scripted::new(1)))), NoopSession::shared())
            .unwrap();

        executor.heartbeat(&UNCONDITIONAL);
        assert_eq!(counted.get().unwrap().affected, Some(42));
        // Without a counter the last operation in the chain reports.
        assert_eq!(plain.get().unwrap().affected, Some(1));
    }

    #[test]
    fn finish_now_pulls_the_task_out_of_the_queue() {
        let executor = OperationExecutorService::default();
        let blocker = executor.submit(Box::new(Scripted::endless()), NoopSession::shared()).unwrap();
        let wanted = executor.submit(Box::new(Scripted::new(5)), NoopSession::shared()).unwrap();

        let outcome = executor.finish_now(&wanted).unwrap();
        assert_eq!(outcome.affected, Some(5));
        assert_eq!(executor.len(), 1);
        assert!(executor.queue_snapshot()[0].same_task(&blocker));
    }
}

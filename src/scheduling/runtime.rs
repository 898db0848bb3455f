//! # Operation Runtime
//!
//! Owns an executor and keeps its heartbeat scheduled on a host platform
//! while there is work to do.
//!
//! ## Heartbeat Lifecycle
//! 1. The first `complete_slowly` arms a repeating heartbeat on the platform
//! 2. Every heartbeat gives the executor one configured slice
//! 3. After enough consecutive idle heartbeats the heartbeat is cancelled
//! 4. The next submission arms it again
//!
//! A platform that cannot schedule makes `complete_slowly` run the operation
//! to completion immediately on the submitting thread.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use log::{debug, info};
use parking_lot::Mutex;

use crate::core::config::EngineConfig;
use crate::error::UsageError;
use crate::operation::executor::PendingWork;
use crate::operation::{Operation, OperationExecutorService, OperationFuture, SharedSession, TimedRunContext};
use crate::scheduling::{SchedulingPlatform, TaskId};

struct RuntimeInner {
    executor: OperationExecutorService,
    platform: Arc<dyn SchedulingPlatform>,
    heartbeat: Mutex<Option<TaskId>>,
    idle_heartbeats: AtomicU32,
    config: EngineConfig,
}

/// Submits operations to an executor driven by a host platform.
#[derive(Clone)]
pub struct OperationRuntime {
    inner: Arc<RuntimeInner>,
}

impl OperationRuntime {
    /// Creates a runtime on `platform`.
    ///
    /// If called on the platform's primary thread, that thread is designated
    /// as the executor's primary thread right away.
    pub fn new(platform: Arc<dyn SchedulingPlatform>, config: EngineConfig) -> Self {
        let executor = OperationExecutorService::with_platform(config.clone(), platform.clone());
        if platform.is_primary_thread() {
            executor.primary_thread().claim_current();
        }
        Self {
            inner: Arc::new(RuntimeInner {
                executor,
                platform,
                heartbeat: Mutex::new(None),
                idle_heartbeats: AtomicU32::new(0),
                config,
            }),
        }
    }

    pub fn executor(&self) -> &OperationExecutorService {
        &self.inner.executor
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Whether a heartbeat is currently scheduled.
    pub fn is_heartbeat_armed(&self) -> bool {
        self.inner.heartbeat.lock().is_some()
    }

    /// Submits `operation` to run across heartbeats, flushing `session` at the end.
    ///
    /// # Returns
    /// A future observing the task. When the platform cannot schedule, the
    /// operation has already run and the future is terminal.
    pub fn complete_slowly(
        &self,
        session: SharedSession,
        operation: Box<dyn Operation>,
    ) -> Result<OperationFuture, UsageError> {
        if self.inner.executor.is_shutdown() {
            return Err(UsageError::Rejected);
        }
        let mut heartbeat = self.inner.heartbeat.lock();
        if !self.inner.ensure_heartbeat(&mut heartbeat) {
            drop(heartbeat);
            debug!("Platform cannot schedule a heartbeat; completing {} now", operation.name());
            let future = self.inner.executor.submit(operation, session)?;
            // The outcome stays on the future.
            let _ = self.inner.executor.finish_now(&future);
            return Ok(future);
        }
        // Submitted under the heartbeat lock: an idle heartbeat cannot park
        // between arming and the task reaching the queue.
        session.get_mut().set_in_long_operation(true);
        let submitted = self.inner.executor.submit(operation, session.clone());
        if submitted.is_err() {
            session.get_mut().set_in_long_operation(false);
        }
        submitted
    }

    /// Cancels the heartbeat and stops accepting work.
    pub fn shutdown(&self) {
        self.inner.park(false);
        self.inner.executor.shutdown();
    }

    /// Like [`shutdown`](Self::shutdown), handing back unfinished work.
    pub fn shutdown_now(&self) -> Vec<PendingWork> {
        self.inner.park(false);
        self.inner.executor.shutdown_now()
    }
}

impl RuntimeInner {
    /// Makes sure a heartbeat is scheduled.
    ///
    /// # Returns
    /// `false` if the platform refused to schedule one.
    fn ensure_heartbeat(self: &Arc<Self>, heartbeat: &mut Option<TaskId>) -> bool {
        if heartbeat.is_some() {
            self.idle_heartbeats.store(0, Ordering::SeqCst);
            return true;
        }
        let weak: Weak<RuntimeInner> = Arc::downgrade(self);
        let task = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.on_heartbeat();
            }
        });
        match self.platform.schedule_repeating(0, self.config.heartbeat_period_ticks, task) {
            Some(id) => {
                info!("Operation heartbeat scheduled");
                self.idle_heartbeats.store(0, Ordering::SeqCst);
                *heartbeat = Some(id);
                true
            }
            None => false,
        }
    }

    fn on_heartbeat(&self) {
        if self.executor.is_idle() {
            let idle = self.idle_heartbeats.fetch_add(1, Ordering::SeqCst) + 1;
            if idle >= self.config.idle_heartbeats_before_park {
                self.park(true);
            }
            return;
        }
        self.idle_heartbeats.store(0, Ordering::SeqCst);
        self.executor.heartbeat(&TimedRunContext::new(self.config.heartbeat_slice()));
    }

    /// Cancels the heartbeat. With `only_if_idle`, work queued since the
    /// idle check keeps it armed.
    fn park(&self, only_if_idle: bool) {
        let mut heartbeat = self.heartbeat.lock();
        if only_if_idle && !self.executor.is_idle() {
            self.idle_heartbeats.store(0, Ordering::SeqCst);
            return;
        }
        if let Some(id) = heartbeat.take() {
            self.platform.cancel_scheduled(id);
            self.idle_heartbeats.store(0, Ordering::SeqCst);
            info!("Operation heartbeat parked");
        }
    }
}

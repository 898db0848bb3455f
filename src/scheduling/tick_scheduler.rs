//! # Tick Scheduler
//!
//! A minimal host loop: tasks are registered against a tick counter and run
//! whenever the owner calls [`TickScheduler::tick`]. The scheduler's lock is
//! never held while a task runs, so tasks may schedule or cancel other tasks,
//! themselves included.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};

use log::trace;
use parking_lot::Mutex;

use crate::scheduling::{SchedulingPlatform, TaskId};

struct Repeating {
    id: TaskId,
    next_due: u64,
    period: u64,
    task: Box<dyn FnMut() + Send>,
}

struct Once {
    id: TaskId,
    task: Box<dyn FnOnce() + Send>,
}

#[derive(Default)]
struct TickState {
    current_tick: u64,
    repeating: Vec<Repeating>,
    once: Vec<Once>,
    running: HashSet<TaskId>,
    cancelled_while_running: HashSet<TaskId>,
}

/// An in-process tick loop.
pub struct TickScheduler {
    state: Mutex<TickState>,
    next_id: AtomicU64,
    primary: ThreadId,
}

impl Default for TickScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TickScheduler {
    /// Creates a scheduler whose primary thread is the calling thread.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TickState::default()),
            next_id: AtomicU64::new(1),
            primary: thread::current().id(),
        }
    }

    /// Ticks elapsed so far.
    pub fn current_tick(&self) -> u64 {
        self.state.lock().current_tick
    }

    /// Number of tasks still scheduled.
    pub fn scheduled_count(&self) -> usize {
        let state = self.state.lock();
        state.repeating.len() + state.once.len() + state.running.len()
            - state.cancelled_while_running.len()
    }

    /// Advances one tick and runs every task due on it.
    pub fn tick(&self) {
        let (due, once) = {
            let mut state = self.state.lock();
            state.current_tick += 1;
            let tick = state.current_tick;
            let (due, waiting): (Vec<Repeating>, Vec<Repeating>) =
                state.repeating.drain(..).partition(|task| task.next_due <= tick);
            state.repeating = waiting;
            let once: Vec<Once> = state.once.drain(..).collect();
            state.running.extend(due.iter().map(|task| task.id));
            (due, once)
        };
        trace!("Tick: running {} repeating and {} one-shot tasks", due.len(), once.len());

        for once in once {
            (once.task)();
        }

        let mut finished = Vec::with_capacity(due.len());
        for mut repeating in due {
            (repeating.task)();
            finished.push(repeating);
        }

        let mut state = self.state.lock();
        let tick = state.current_tick;
        for mut repeating in finished {
            state.running.remove(&repeating.id);
            if state.cancelled_while_running.remove(&repeating.id) {
                continue;
            }
            repeating.next_due = tick + repeating.period.max(1);
            state.repeating.push(repeating);
        }
    }

    fn next_task_id(&self) -> TaskId {
        TaskId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl SchedulingPlatform for TickScheduler {
    fn schedule_repeating(&self, delay: u64, period: u64, task: Box<dyn FnMut() + Send>) -> Option<TaskId> {
        let id = self.next_task_id();
        let mut state = self.state.lock();
        let next_due = state.current_tick + delay.max(1);
        state.repeating.push(Repeating {
            id,
            next_due,
            period,
            task,
        });
        Some(id)
    }

    fn schedule_next(&self, task: Box<dyn FnOnce() + Send>) -> Option<TaskId> {
        let id = self.next_task_id();
        self.state.lock().once.push(Once { id, task });
        Some(id)
    }

    fn cancel_scheduled(&self, id: TaskId) -> bool {
        let mut state = self.state.lock();
        if let Some(index) = state.repeating.iter().position(|task| task.id == id) {
            state.repeating.remove(index);
            return true;
        }
        if let Some(index) = state.once.iter().position(|task| task.id == id) {
            state.once.remove(index);
            return true;
        }
        if state.running.contains(&id) {
            return state.cancelled_while_running.insert(id);
        }
        false
    }

    fn is_primary_thread(&self) -> bool {
        thread::current().id() == self.primary
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn repeating_task_honours_delay_and_period() {
        let scheduler = TickScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counted = runs.clone();
        scheduler.schedule_repeating(
            2,
            3,
            Box::new(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let mut seen = Vec::new();
        for _ in 0..8 {
            scheduler.tick();
            seen.push(runs.load(Ordering::SeqCst));
        }
        // Runs on ticks 2, 5 and 8.
        assert_eq!(seen, vec![0, 1, 1, 1, 2, 2, 2, 3]);
    }

    #[test]
    fn one_shot_runs_on_the_next_tick_only() {
        let scheduler = TickScheduler::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let counted = runs.clone();
        scheduler.schedule_next(Box::new(move || {
            counted.fetch_add(1, Ordering::SeqCst);
        }));
        scheduler.tick();
        scheduler.tick();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.scheduled_count(), 0);
    }

    #[test]
    fn task_may_cancel_itself() {
        let scheduler = Arc::new(TickScheduler::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let own_id = Arc::new(Mutex::new(None));

        let (counted, handle, id_slot) = (runs.clone(), scheduler.clone(), own_id.clone());
        let id = scheduler
            .schedule_repeating(
                0,
                1,
                Box::new(move || {
                    if counted.fetch_add(1, Ordering::SeqCst) == 1 {
                        if let Some(id) = *id_slot.lock() {
                            assert!(handle.cancel_scheduled(id));
                        }
                    }
                }),
            )
            .unwrap();
        *own_id.lock() = Some(id);

        for _ in 0..5 {
            scheduler.tick();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(!scheduler.cancel_scheduled(id));
    }

    #[test]
    fn creating_thread_is_primary() {
        let scheduler = Arc::new(TickScheduler::new());
        assert!(scheduler.is_primary_thread());
        let other = scheduler.clone();
        assert!(!std::thread::spawn(move || other.is_primary_thread()).join().unwrap());
    }
}

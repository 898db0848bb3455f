//! # Run Contexts
//!
//! A run context is the budget of one slice of work. Drivers poll it between
//! resumptions, and long-running composites poll it between their own inner
//! steps. Polling is allowed to have side effects: the countdown context
//! spends one unit per poll, which is what makes its slices reproducible.

use std::sync::atomic::{AtomicUsize, Ordering};

use web_time::{Duration, Instant};

/// Answers "may I keep working right now".
pub trait RunContext: Send + Sync {
    fn should_continue(&self) -> bool;
}

/// Continues until a wall-clock deadline passes.
#[derive(Copy, Clone, Debug)]
pub struct TimedRunContext {
    deadline: Instant,
}

impl TimedRunContext {
    /// A budget of `duration` starting now. A zero duration is already spent.
    pub fn new(duration: Duration) -> Self {
        Self {
            deadline: Instant::now() + duration,
        }
    }

    /// A budget ending at `deadline`, which may already be in the past.
    pub fn until(deadline: Instant) -> Self {
        Self { deadline }
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }
}

impl RunContext for TimedRunContext {
    fn should_continue(&self) -> bool {
        Instant::now() < self.deadline
    }
}

/// Always continues. Used by the synchronous completion helpers.
#[derive(Copy, Clone, Debug, Default)]
pub struct UnconditionalRunContext;

/// The shared unconditional context.
pub const UNCONDITIONAL: UnconditionalRunContext = UnconditionalRunContext;

impl RunContext for UnconditionalRunContext {
    fn should_continue(&self) -> bool {
        true
    }
}

/// Continues for a fixed number of polls, then stops for good.
#[derive(Debug)]
pub struct CountdownRunContext {
    remaining: AtomicUsize,
}

impl CountdownRunContext {
    pub fn new(polls: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(polls),
        }
    }

    /// Polls left before the context says stop.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }
}

impl RunContext for CountdownRunContext {
    fn should_continue(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_is_already_spent() {
        let run = TimedRunContext::new(Duration::ZERO);
        assert!(!run.should_continue());
        assert_eq!(run.remaining(), Duration::ZERO);
    }

    #[test]
    fn past_deadline_never_continues() {
        let now = Instant::now();
        let run = TimedRunContext::until(now);
        assert!(!run.should_continue());
    }

    #[test]
    fn generous_budget_continues() {
        let run = TimedRunContext::new(Duration::from_secs(60));
        assert!(run.should_continue());
    }

    #[test]
    fn countdown_spends_one_poll_per_call() {
        let run = CountdownRunContext::new(2);
        assert!(run.should_continue());
        assert!(run.should_continue());
        assert!(!run.should_continue());
        assert!(!run.should_continue());
        assert_eq!(run.remaining(), 0);
    }

    #[test]
    fn unconditional_always_continues() {
        assert!((0..1000).all(|_| UNCONDITIONAL.should_continue()));
    }
}

//! Runs operations one after another.

use std::collections::VecDeque;

use crate::error::OperationError;
use crate::operation::{Operation, RunContext, Step};

/// Runs its operations in order, each to completion before the next starts.
#[derive(Default)]
pub struct OperationQueue {
    queue: VecDeque<Box<dyn Operation>>,
}

impl OperationQueue {
    pub fn new(operations: Vec<Box<dyn Operation>>) -> Self {
        Self {
            queue: operations.into(),
        }
    }

    /// Appends an operation to run after everything already queued.
    pub fn offer(&mut self, operation: Box<dyn Operation>) {
        self.queue.push_back(operation);
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Operation for OperationQueue {
    fn resume(&mut self, run: &dyn RunContext) -> Result<Step, OperationError> {
        let Some(current) = self.queue.front_mut() else {
            return Ok(Step::Done);
        };
        match current.resume(run)? {
            Step::Continue => {}
            Step::Replace(next) => *current = next,
            Step::Done => {
                self.queue.pop_front();
            }
        }
        if self.queue.is_empty() {
            Ok(Step::Done)
        } else {
            Ok(Step::Continue)
        }
    }

    fn cancel(&mut self) {
        for operation in self.queue.iter_mut() {
            operation.cancel();
        }
        self.queue.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::operation::testing::Scripted;
    use crate::operation::UNCONDITIONAL;

    #[test]
    fn runs_operations_in_order() {
        let first = Scripted::new(2);
        let second = Scripted::new(1);
        let (first_resumes, second_resumes) = (first.resumes.clone(), second.resumes.clone());

        let mut queue = OperationQueue::new(vec![Box::new(first)]);
        queue.offer(Box::new(second));

        assert!(!queue.resume(&UNCONDITIONAL).unwrap().is_done());
        assert_eq!(second_resumes.load(Ordering::SeqCst), 0);
        assert!(!queue.resume(&UNCONDITIONAL).unwrap().is_done());
        assert!(queue.resume(&UNCONDITIONAL).unwrap().is_done());
        assert_eq!(first_resumes.load(Ordering::SeqCst), 2);
        assert_eq!(second_resumes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn empty_queue_is_done() {
        assert!(OperationQueue::default().resume(&UNCONDITIONAL).unwrap().is_done());
    }
}

//! Round-robin interleaving of several operations.

use std::collections::VecDeque;

use crate::error::OperationError;
use crate::operation::{Operation, RunContext, Step};

/// Resumes its operations one at a time in round-robin order.
///
/// "Unfair" because a sub-operation that does more per resumption gets more
/// of the budget. The interleave finishes as soon as only opportunistic
/// operations remain; those are dropped unfinished.
#[derive(Default)]
pub struct UnfairOperationInterleave {
    queue: VecDeque<Box<dyn Operation>>,
}

impl UnfairOperationInterleave {
    pub fn new(operations: Vec<Box<dyn Operation>>) -> Self {
        Self {
            queue: operations.into(),
        }
    }

    /// Adds an operation at the back of the rotation.
    pub fn push(&mut self, operation: Box<dyn Operation>) {
        self.queue.push_back(operation);
    }

    /// Operations still in the rotation.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn only_opportunistic_left(&self) -> bool {
        self.queue.iter().all(|operation| operation.is_opportunistic())
    }
}

impl Operation for UnfairOperationInterleave {
    fn resume(&mut self, run: &dyn RunContext) -> Result<Step, OperationError> {
        if let Some(mut operation) = self.queue.pop_front() {
            match operation.resume(run)? {
                Step::Continue => self.queue.push_back(operation),
                Step::Replace(next) => self.queue.push_back(next),
                Step::Done => {}
            }
        }

        if self.only_opportunistic_left() {
            self.queue.clear();
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

    fn is_opportunistic(&self) -> bool {
        self.only_opportunistic_left()
    }
}

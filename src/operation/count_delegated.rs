//! Reports another object's affected count for a wrapped operation.

use std::sync::Arc;

use crate::error::{OperationError, UsageError};
use crate::operation::{AffectedCounter, Operation, RunContext, Step};

/// Runs an operation while reporting the affected count of a separate counter.
///
/// Useful when the interesting count lives in a function deep inside the
/// wrapped tree, such as a `BlockCounter` fed by a region visitor.
pub struct CountDelegatedOperation {
    operation: Box<dyn Operation>,
    counter: Arc<dyn AffectedCounter>,
}

impl CountDelegatedOperation {
    /// Wraps `operation`, reporting `counter`'s count.
    ///
    /// # Returns
    /// `UsageError::SelfCounting` if `counter` is the wrapped operation itself.
    pub fn new(operation: Box<dyn Operation>, counter: Arc<dyn AffectedCounter>) -> Result<Self, UsageError> {
        if std::ptr::eq(operation.identity(), counter.identity()) {
            return Err(UsageError::SelfCounting);
        }
        Ok(Self { operation, counter })
    }
}

impl Operation for CountDelegatedOperation {
    fn resume(&mut self, run: &dyn RunContext) -> Result<Step, OperationError> {
        match self.operation.resume(run)? {
            Step::Replace(next) => {
                self.operation = next;
                Ok(Step::Continue)
            }
            step => Ok(step),
        }
    }

    fn cancel(&mut self) {
        self.operation.cancel();
    }

    fn is_opportunistic(&self) -> bool {
        self.operation.is_opportunistic()
    }

    fn affected(&self) -> Option<usize> {
        Some(self.counter.affected())
    }

    fn name(&self) -> &'static str {
        self.operation.name()
    }
}

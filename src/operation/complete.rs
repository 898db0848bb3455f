//! Synchronous helpers that run an operation to completion on the calling
//! thread, ignoring any budget. Meant for tests, tools, and callers that
//! are not on a ticking host.

use crate::error::OperationError;
use crate::operation::{Operation, Step, UNCONDITIONAL};

/// Resumes `operation` until it is done.
///
/// # Returns
/// The affected count of the last operation in the continuation chain, or
/// the first failure exactly as it was raised.
pub fn complete(mut operation: Box<dyn Operation>) -> Result<Option<usize>, OperationError> {
    loop {
        match operation.resume(&UNCONDITIONAL)? {
            Step::Continue => {}
            Step::Replace(next) => operation = next,
            Step::Done => return Ok(operation.affected()),
        }
    }
}

/// Like [`complete`], for callers that only distinguish "hit the change
/// limit" from "something else went wrong".
///
/// The change-limit failure passes through unchanged; every other failure is
/// wrapped in `OperationError::Legacy`.
pub fn complete_legacy(operation: Box<dyn Operation>) -> Result<Option<usize>, OperationError> {
    complete(operation).map_err(|err| {
        if err.is_limit_exceeded() {
            err
        } else {
            OperationError::Legacy(Box::new(err))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::testing::{Failing, Scripted};
    use crate::operation::RunContext;

    struct Handoff;

    impl Operation for Handoff {
        fn resume(&mut self, _run: &dyn RunContext) -> Result<Step, OperationError> {
            Ok(Step::Replace(Box::new(Scripted::new(4))))
        }
    }

    #[test]
    fn follows_the_continuation_chain() {
        assert_eq!(complete(Box::new(Handoff)).unwrap(), Some(4));
    }

    #[test]
    fn legacy_keeps_the_limit_failure_as_is() {
        let err = complete_legacy(Box::new(Failing(OperationError::MaxChangesExceeded { limit: 7 }))).unwrap_err();
        assert_eq!(err, OperationError::MaxChangesExceeded { limit: 7 });
    }

    #[test]
    fn legacy_wraps_other_failures() {
        let err = complete_legacy(Box::new(Failing(OperationError::Other("bad".into())))).unwrap_err();
        assert_eq!(err, OperationError::Legacy(Box::new(OperationError::Other("bad".into()))));
    }
}

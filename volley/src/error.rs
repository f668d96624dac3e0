use thiserror::Error;

/// Errors returned by task and collector operations.
///
/// Every variant describes a lifecycle precondition that was not met, or a
/// wait that ran out of time. Errors are compared by kind, so callers can
/// match on them directly.
///
/// Errors produced by a task function itself are never reported through
/// this type; they travel inside the task's result value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Error {
    /// A wait elapsed before the awaited condition was satisfied.
    ///
    /// The awaited task or collector remains valid and can be waited on
    /// again.
    #[error("execution timed out")]
    Timeout,

    /// A start was requested on a task that is already executing.
    #[error("execution has already started")]
    AlreadyExecuting,

    /// A start or a collector wait was requested on something that has
    /// already completed and been consumed.
    #[error("execution has already finished")]
    AlreadyFinished,

    /// A stop or wait was requested on a task that never started, was
    /// already signalled to stop, or whose result was discarded.
    #[error("task is not executing")]
    NotExecuting,
}

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::Error;

    #[test]
    fn test_error_messages() {
        assert_eq!(Error::Timeout.to_string(), "execution timed out");
        assert_eq!(
            Error::AlreadyExecuting.to_string(),
            "execution has already started"
        );
        assert_eq!(
            Error::AlreadyFinished.to_string(),
            "execution has already finished"
        );
        assert_eq!(Error::NotExecuting.to_string(), "task is not executing");
    }

    #[test]
    fn test_errors_compare_by_kind() {
        let first = Error::Timeout;
        let second = Error::Timeout;

        assert_eq!(first, second);
        assert_ne!(Error::AlreadyExecuting, Error::AlreadyFinished);
    }
}

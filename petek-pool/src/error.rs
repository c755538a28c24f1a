use std::fmt;

/// Typed errors for pool submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    /// The pool has stopped; the task was not enqueued.
    Stopped,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Stopped => write!(f, "worker pool stopped; submission rejected"),
        }
    }
}

impl std::error::Error for SubmitError {}

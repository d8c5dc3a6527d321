use thiserror::Error;

/// Errors from the shared state event queue
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateEventError {
    /// A thread panicked while holding the queue lock
    #[error("State event queue lock poisoned")]
    SinkLockPoisoned,
}

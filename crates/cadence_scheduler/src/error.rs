//! Scheduler errors.

use cadence_hooks::HookError;

use crate::scheduler::SystemId;

/// Errors returned while registering or running systems.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// A hook called by a system failed.
    #[error("hook error: {0}")]
    Hook(#[from] HookError),

    /// No system is registered under this id.
    #[error("unknown system {0}")]
    UnknownSystem(SystemId),

    /// A system reported a failure of its own.
    #[error("system error: {0}")]
    System(String),
}

impl SchedulerError {
    /// Creates a [`SchedulerError::System`] from any displayable message.
    #[must_use]
    pub fn system(message: impl Into<String>) -> Self {
        Self::System(message.into())
    }
}

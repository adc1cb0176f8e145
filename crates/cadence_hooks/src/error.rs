//! Errors raised by hook primitives.

use crate::key::{Discriminator, HookKey};

/// Errors that can occur while resolving or releasing hook state.
///
/// [`ContextMissing`](Self::ContextMissing), [`MissingKey`](Self::MissingKey)
/// and [`StateTypeMismatch`](Self::StateTypeMismatch) signal caller misuse and
/// are never recovered from. [`UnsupportedSource`](Self::UnsupportedSource) is
/// raised when subscribing. [`UnsupportedConnection`](Self::UnsupportedConnection)
/// is raised when disconnecting; during eviction it is logged instead, and the
/// state it belongs to is evicted regardless.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    /// A hook was called while no execution context was active.
    #[error("hook called outside of an execution context")]
    ContextMissing,

    /// A hook was called without a usable call-site key.
    #[error("hook called without a call-site key")]
    MissingKey,

    /// The event source refused the subscription.
    #[error("unsupported event source: {0}")]
    UnsupportedSource(String),

    /// The connection handle has no way to disconnect.
    #[error("unsupported connection: {0}")]
    UnsupportedConnection(String),

    /// The same composite key was requested with two different state types.
    #[error("hook state {key}/{discriminator} holds {stored}, requested as {requested}")]
    StateTypeMismatch {
        /// Call-site key of the conflicting request.
        key: HookKey,
        /// Effective discriminator of the conflicting request.
        discriminator: Discriminator,
        /// Type name the slot was created with.
        stored: &'static str,
        /// Type name of the conflicting request.
        requested: &'static str,
    },
}

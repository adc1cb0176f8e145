//! Reusable hooks built on `cadence_hooks` (Layer 2).
//!
//! - [`use_event`] - Buffers events from a source between invocations
//! - [`use_throttle`] - Says yes at most once per period
//! - [`Signal`] - A simple event source usable with [`use_event`]
//!
//! Both hooks take a key (usually [`call_site!`](cadence_hooks::call_site))
//! and an optional discriminator, and must be called from inside
//! [`start`](cadence_hooks::start).

mod event;
mod signal;
mod throttle;

pub use event::{Connection, Disconnectable, EventReader, Listener, Subscribable, use_event};
pub use signal::Signal;
pub use throttle::{use_throttle, use_throttle_secs};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::{
        Connection, Disconnectable, EventReader, Signal, Subscribable, use_event, use_throttle,
        use_throttle_secs,
    };
}

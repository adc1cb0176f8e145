//! # Cadence Internal Library
//!
//! Re-exports the core cadence crates for convenience.

/// Layer 1: context stack and hook state storage.
pub use cadence_hooks;

/// Layer 2: event and throttle hooks.
pub use cadence_std;

/// Layer 3: frame-phase scheduler.
pub use cadence_scheduler;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use cadence_hooks::prelude::*;
    pub use cadence_scheduler::prelude::*;
    pub use cadence_std::prelude::*;
}

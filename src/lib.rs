//! Call-site scoped hook state for callbacks that run every frame.
//!

pub use cadence_internal::*;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use cadence_internal::prelude::*;
}

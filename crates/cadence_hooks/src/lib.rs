//! Call-site scoped state retention for callbacks run on a fixed cadence (Layer 1).
//!
//! `cadence_hooks` lets a callback that runs once per frame keep small pieces
//! of state (a subscription, a timer, a buffer) keyed by the call site that
//! created them, and reclaims that state once it is no longer wanted:
//!
//! - [`HookStore`] - Caller-owned backing store, one per scheduled callback
//! - [`start`] - Runs a callback inside an execution context bound to a store
//! - [`use_hook_state`] - Fetches or creates the state cell for a call site
//! - [`StateCell`] - Handle to a retained piece of state
//! - [`evict`] - Ready-made eviction predicates
//! - [`Clock`] - Mockable time source carried by every store
//!
//! # Architecture
//!
//! - **Layer 1** (`cadence_hooks`): context stack and state storage (this crate)
//! - **Layer 2** (`cadence_std`): reusable hooks such as `use_event` and `use_throttle`
//! - **Layer 3** (`cadence_scheduler`): drives callbacks through per-frame phases
//!
//! # Example
//!
//! ```
//! use cadence_hooks::{HookError, HookStore, evict, start, use_hook_state};
//!
//! #[derive(Default)]
//! struct Seen {
//!     frames: u32,
//! }
//!
//! fn on_frame(entity: u64) -> Result<u32, HookError> {
//!     let seen = use_hook_state::<Seen, _>(
//!         "seen",
//!         Some(entity.into()),
//!         evict::when_untouched,
//!     )?;
//!     seen.borrow_mut().frames += 1;
//!     let frames = seen.borrow().frames;
//!     Ok(frames)
//! }
//!
//! let store = HookStore::new();
//! assert_eq!(start(&store, || on_frame(1)).unwrap(), 1);
//! assert_eq!(start(&store, || on_frame(1)).unwrap(), 2);
//! assert_eq!(start(&store, || on_frame(2)).unwrap(), 1);
//! // Entity 1 went untouched in the last frame and was reclaimed.
//! assert_eq!(store.len(), 1);
//! ```

mod context;
mod error;
mod key;
mod store;
mod time;

pub use context::{context_depth, is_active, now, start, touched_count, use_hook_state};
pub use error::HookError;
pub use key::{Discriminator, HookKey};
pub use store::{EvictionContext, HookStore, StateCell, evict};
pub use time::{Clock, ClockProvider};

#[cfg(any(test, feature = "test-utils"))]
pub use time::MockClock;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::call_site;
    pub use crate::{
        Clock, ClockProvider, Discriminator, EvictionContext, HookError, HookKey, HookStore,
        StateCell, evict, start, use_hook_state,
    };
}

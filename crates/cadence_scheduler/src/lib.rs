//! Frame-phase driver for cadence systems (Layer 3).
//!
//! A [`Scheduler`] owns a list of systems, each registered in one
//! [`Phase`]. Every system gets its own hook store, and each run happens
//! inside [`start`](cadence_hooks::start) against that store, so hooks from
//! `cadence_std` work unchanged inside systems.
//!
//! - [`Scheduler`] - Registers systems and runs phases or whole frames
//! - [`Phase`], [`PhaseId`] - Phase markers; the built-ins are
//!   [`PreRender`], [`PreAnimation`], [`PreUpdate`], [`OnUpdate`], [`PostUpdate`]
//! - [`System`], [`IntoSystem`] - Per-frame callbacks
//! - [`TracingConfig`] - Installs a `tracing` subscriber

mod error;
mod phase;
mod scheduler;
mod system;
mod tracing_config;

pub use error::SchedulerError;
pub use phase::{
    FramePhases, IntoPhaseIds, OnUpdate, Phase, PhaseId, PostUpdate, PreAnimation, PreRender,
    PreUpdate,
};
pub use scheduler::{Scheduler, SystemId};
pub use system::{
    BoxedSystem, DeltaMarker, FallibleDeltaMarker, FallibleFrameMarker, FrameInfo, FrameMarker,
    FunctionSystem, IntoSystem, SelfMarker, System,
};
pub use tracing_config::{TracingConfig, TracingFormat};

/// Re-export all common types for easy access.
pub mod prelude {
    pub use crate::{
        FrameInfo, IntoSystem, OnUpdate, Phase, PostUpdate, PreAnimation, PreRender, PreUpdate,
        Scheduler, SchedulerError, System, SystemId, TracingConfig, TracingFormat,
    };
}

//! Systems: the callbacks a [`Scheduler`](crate::Scheduler) drives.
//!
//! A system runs once per phase it is registered in, every frame, inside an
//! execution context bound to its own hook store. Hooks called from a system
//! therefore keep their state from one frame to the next.
//!
//! Closures become systems through [`IntoSystem`]. Four shapes are accepted:
//!
//! ```ignore
//! |dt: f64| { .. }                                   // infallible, delta only
//! |dt: f64| -> Result<(), SchedulerError> { .. }     // fallible, delta only
//! |frame: FrameInfo| { .. }                          // infallible, full frame info
//! |frame: FrameInfo| -> Result<(), SchedulerError> { .. }
//! ```
//!
//! The argument type must be spelled out on the closure so the shape can be
//! picked.

use core::marker::PhantomData;

use crate::error::SchedulerError;
use crate::phase::PhaseId;

/// Per-run information handed to a system.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Seconds since the previous frame, as passed by the caller.
    pub dt: f64,
    /// The phase being run.
    pub phase: PhaseId,
    /// Zero-based index of the current frame.
    pub frame: u64,
}

/// A unit of per-frame work.
pub trait System: 'static {
    /// Runs the system once.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError`] if a hook fails or the system reports an
    /// error; the scheduler aborts the phase.
    fn run(&mut self, frame: FrameInfo) -> Result<(), SchedulerError>;

    /// Returns the system's name for tracing.
    fn name(&self) -> &'static str;
}

/// Boxed type-erased system.
pub type BoxedSystem = Box<dyn System>;

/// Converts a type into a [`System`].
///
/// The `Marker` type parameter keeps the closure shapes from overlapping.
pub trait IntoSystem<Marker>: Sized {
    /// The resulting system type.
    type System: System;

    /// Converts this into a system.
    fn into_system(self) -> Self::System;
}

/// Every [`System`] converts into itself.
pub struct SelfMarker;

impl<S: System> IntoSystem<SelfMarker> for S {
    type System = S;

    fn into_system(self) -> S {
        self
    }
}

/// A system wrapping a closure.
pub struct FunctionSystem<F, Marker> {
    func: F,
    name: &'static str,
    _marker: PhantomData<fn() -> Marker>,
}

impl<F, Marker> FunctionSystem<F, Marker> {
    /// Wraps `func` under the given name.
    pub fn new(func: F, name: &'static str) -> Self {
        Self {
            func,
            name,
            _marker: PhantomData,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Closure shapes
// ─────────────────────────────────────────────────────────────────────────────

/// Marker for `FnMut(f64)`.
pub struct DeltaMarker;
/// Marker for `FnMut(f64) -> Result<(), SchedulerError>`.
pub struct FallibleDeltaMarker;
/// Marker for `FnMut(FrameInfo)`.
pub struct FrameMarker;
/// Marker for `FnMut(FrameInfo) -> Result<(), SchedulerError>`.
pub struct FallibleFrameMarker;

fn infallible((): ()) -> Result<(), SchedulerError> {
    Ok(())
}

fn fallible(result: Result<(), SchedulerError>) -> Result<(), SchedulerError> {
    result
}

macro_rules! impl_function_system {
    ($marker:ident, $arg:ty, $ret:ty, |$frame:ident| $input:expr, $finish:ident) => {
        impl<F> IntoSystem<$marker> for F
        where
            F: FnMut($arg) -> $ret + 'static,
        {
            type System = FunctionSystem<F, $marker>;

            fn into_system(self) -> Self::System {
                FunctionSystem::new(self, core::any::type_name::<F>())
            }
        }

        impl<F> System for FunctionSystem<F, $marker>
        where
            F: FnMut($arg) -> $ret + 'static,
        {
            fn run(&mut self, $frame: FrameInfo) -> Result<(), SchedulerError> {
                $finish((self.func)($input))
            }

            fn name(&self) -> &'static str {
                self.name
            }
        }
    };
}

impl_function_system!(DeltaMarker, f64, (), |frame| frame.dt, infallible);
impl_function_system!(
    FallibleDeltaMarker,
    f64,
    Result<(), SchedulerError>,
    |frame| frame.dt,
    fallible
);
impl_function_system!(FrameMarker, FrameInfo, (), |frame| frame, infallible);
impl_function_system!(
    FallibleFrameMarker,
    FrameInfo,
    Result<(), SchedulerError>,
    |frame| frame,
    fallible
);

//! Frame phases.
//!
//! A frame is split into phases that run in a fixed order. Each phase is
//! identified by a marker type wrapped in a [`PhaseId`]:
//!
//! | Phase | Runs |
//! |-------|------|
//! | [`PreRender`] | Before the frame is drawn |
//! | [`PreAnimation`] | Before animations are stepped |
//! | [`PreUpdate`] | Before the simulation step |
//! | [`OnUpdate`] | Main per-frame logic |
//! | [`PostUpdate`] | After the main logic |
//!
//! Custom phases are any `'static` type implementing [`Phase`]; they run only
//! when asked for through [`Scheduler::run_phase`](crate::Scheduler::run_phase).

use core::any::TypeId;
use core::fmt;
use variadics_please::all_tuples;

/// Identifier for a phase, derived from a marker type.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhaseId {
    type_id: TypeId,
    type_name: &'static str,
}

impl PhaseId {
    /// Creates a `PhaseId` for the given phase marker type.
    #[must_use]
    pub fn of<P: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            type_name: core::any::type_name::<P>(),
        }
    }

    /// Returns the underlying `TypeId`.
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the marker's type name, without its module path.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.type_name
            .rsplit("::")
            .next()
            .unwrap_or(self.type_name)
    }
}

impl fmt::Debug for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhaseId({})", self.name())
    }
}

impl fmt::Display for PhaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Phase Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Marker trait for phase types.
pub trait Phase: 'static {}

/// Runs before the frame is drawn.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreRender;

/// Runs before animations are stepped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreAnimation;

/// Runs before the simulation step.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreUpdate;

/// Main per-frame logic.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnUpdate;

/// Runs after the main logic.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostUpdate;

impl Phase for PreRender {}
impl Phase for PreAnimation {}
impl Phase for PreUpdate {}
impl Phase for OnUpdate {}
impl Phase for PostUpdate {}

/// The built-in phases in the order [`Scheduler::frame`](crate::Scheduler::frame)
/// runs them.
pub type FramePhases = (PreRender, PreAnimation, PreUpdate, OnUpdate, PostUpdate);

// ─────────────────────────────────────────────────────────────────────────────
// IntoPhaseIds Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Types that name an ordered list of phases.
///
/// Implemented for single phases and tuples of up to 16 phases.
pub trait IntoPhaseIds {
    /// Returns the phase IDs in declaration order.
    fn phase_ids() -> Vec<PhaseId>;
}

impl<P: Phase> IntoPhaseIds for P {
    fn phase_ids() -> Vec<PhaseId> {
        vec![PhaseId::of::<P>()]
    }
}

macro_rules! impl_into_phase_ids_for_tuple {
    ($($P:ident),*) => {
        impl<$($P: Phase),*> IntoPhaseIds for ($($P,)*) {
            fn phase_ids() -> Vec<PhaseId> {
                vec![$(PhaseId::of::<$P>()),*]
            }
        }
    };
}

all_tuples!(impl_into_phase_ids_for_tuple, 2, 16, P);

#[cfg(test)]
mod tests {
    use super::*;

    struct Custom;
    impl Phase for Custom {}

    #[test]
    fn phase_id_equality() {
        assert_eq!(PhaseId::of::<OnUpdate>(), PhaseId::of::<OnUpdate>());
        assert_ne!(PhaseId::of::<OnUpdate>(), PhaseId::of::<PostUpdate>());
    }

    #[test]
    fn phase_id_name_drops_module_path() {
        assert_eq!(PhaseId::of::<PreAnimation>().name(), "PreAnimation");
        assert_eq!(PhaseId::of::<Custom>().to_string(), "Custom");
    }

    #[test]
    fn frame_phases_are_ordered() {
        let names: Vec<_> = FramePhases::phase_ids()
            .iter()
            .map(PhaseId::name)
            .collect();
        assert_eq!(
            names,
            ["PreRender", "PreAnimation", "PreUpdate", "OnUpdate", "PostUpdate"]
        );
    }

    #[test]
    fn single_phase_ids() {
        assert_eq!(Custom::phase_ids(), vec![PhaseId::of::<Custom>()]);
    }
}

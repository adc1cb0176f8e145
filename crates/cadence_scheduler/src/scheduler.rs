//! The frame driver.

use core::fmt;

use cadence_hooks::{Clock, HookStore, start};

use crate::error::SchedulerError;
use crate::phase::{FramePhases, IntoPhaseIds, Phase, PhaseId};
use crate::system::{BoxedSystem, FrameInfo, IntoSystem, System};

/// Handle to a registered system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SystemId(u64);

impl fmt::Display for SystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system#{}", self.0)
    }
}

struct SystemEntry {
    id: SystemId,
    phase: PhaseId,
    name: &'static str,
    system: BoxedSystem,
    store: HookStore,
}

/// Runs systems phase by phase, each inside its own execution context.
///
/// Every registered system owns a [`HookStore`], created with the
/// scheduler's clock. State kept by hooks inside a system lives in that store
/// and is dropped with it when the system is removed.
///
/// # Example
///
/// ```
/// use cadence_scheduler::{OnUpdate, PreUpdate, Scheduler, SchedulerError};
/// use cadence_std::use_throttle_secs;
///
/// let mut scheduler = Scheduler::new();
///
/// scheduler.add_system(PreUpdate, |_dt: f64| {
///     // input polling
/// });
/// scheduler.add_system(OnUpdate, |_dt: f64| -> Result<(), SchedulerError> {
///     if use_throttle_secs("autosave", 30.0, None)? {
///         // save
///     }
///     Ok(())
/// });
///
/// scheduler.frame(1.0 / 60.0).unwrap();
/// ```
pub struct Scheduler {
    clock: Clock,
    systems: Vec<SystemEntry>,
    next_id: u64,
    frame: u64,
}

impl Scheduler {
    /// Creates an empty scheduler on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Clock::system())
    }

    /// Creates an empty scheduler whose system stores all read `clock`.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            clock,
            systems: Vec::new(),
            next_id: 0,
            frame: 0,
        }
    }

    /// Returns the clock handed to every system store.
    #[must_use]
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Registers `system` to run in `phase`.
    ///
    /// Systems in the same phase run in registration order.
    pub fn add_system<P, M, S>(&mut self, _phase: P, system: S) -> SystemId
    where
        P: Phase,
        S: IntoSystem<M>,
    {
        self.insert(PhaseId::of::<P>(), Box::new(system.into_system()))
    }

    /// Registers an already boxed system under a phase id.
    pub fn add_boxed_system(&mut self, phase: PhaseId, system: BoxedSystem) -> SystemId {
        self.insert(phase, system)
    }

    fn insert(&mut self, phase: PhaseId, system: BoxedSystem) -> SystemId {
        let id = SystemId(self.next_id);
        self.next_id += 1;

        let name = system.name();
        tracing::debug!(%id, %phase, system = name, "system added");

        self.systems.push(SystemEntry {
            id,
            phase,
            name,
            system,
            store: HookStore::with_clock(self.clock.clone()),
        });
        id
    }

    /// Unregisters a system and drops its hook store.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownSystem`] if `id` is not registered.
    pub fn remove_system(&mut self, id: SystemId) -> Result<(), SchedulerError> {
        let index = self
            .systems
            .iter()
            .position(|entry| entry.id == id)
            .ok_or(SchedulerError::UnknownSystem(id))?;

        let entry = self.systems.remove(index);
        tracing::debug!(%id, system = entry.name, cells = entry.store.len(), "system removed");
        Ok(())
    }

    /// Returns `true` if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: SystemId) -> bool {
        self.systems.iter().any(|entry| entry.id == id)
    }

    /// Number of registered systems across all phases.
    #[must_use]
    pub fn system_count(&self) -> usize {
        self.systems.len()
    }

    /// Returns the hook store owned by `id`.
    #[must_use]
    pub fn store(&self, id: SystemId) -> Option<&HookStore> {
        self.systems
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.store)
    }

    /// Index of the frame the next [`frame`](Self::frame) call runs.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Runs every system registered in phase `P`.
    ///
    /// # Errors
    ///
    /// Returns the first error a system reports; later systems in the phase
    /// do not run.
    pub fn run_phase<P: Phase>(&mut self, dt: f64) -> Result<(), SchedulerError> {
        self.run_phase_id(PhaseId::of::<P>(), dt)
    }

    /// Runs each phase in `Ps`, in order.
    ///
    /// # Errors
    ///
    /// Returns the first error a system reports; later phases do not run.
    pub fn run_phases<Ps: IntoPhaseIds>(&mut self, dt: f64) -> Result<(), SchedulerError> {
        Ps::phase_ids()
            .into_iter()
            .try_for_each(|phase| self.run_phase_id(phase, dt))
    }

    /// Runs one frame: every built-in phase in [`FramePhases`] order.
    ///
    /// The frame counter advances even if a system fails.
    ///
    /// # Errors
    ///
    /// Returns the first error a system reports; the rest of the frame is
    /// skipped.
    pub fn frame(&mut self, dt: f64) -> Result<(), SchedulerError> {
        let span = tracing::trace_span!("frame", frame = self.frame, dt);
        let _entered = span.enter();

        let result = self.run_phases::<FramePhases>(dt);
        self.frame += 1;
        result
    }

    /// Runs the systems of `phase`.
    ///
    /// # Errors
    ///
    /// Returns the first error a system reports.
    pub fn run_phase_id(&mut self, phase: PhaseId, dt: f64) -> Result<(), SchedulerError> {
        let info = FrameInfo {
            dt,
            phase,
            frame: self.frame,
        };

        for entry in self.systems.iter_mut().filter(|entry| entry.phase == phase) {
            let SystemEntry {
                id, name, system, store, ..
            } = entry;

            if let Err(err) = start(store, || system.run(info)) {
                tracing::warn!(%id, system = *name, %phase, %err, "system failed");
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("systems", &self.systems.len())
            .field("frame", &self.frame)
            .field("clock", &self.clock)
            .finish()
    }
}

//! Example frame loop built with cadence.
//!
//! A toy arena: a spawner adds a combatant on a fixed interval, damage
//! arrives through a [`Signal`], and every combatant regenerates on its own
//! throttle. Each piece is a system; its hook state lives in the scheduler's
//! per-system store.
//!
//! ```text
//! ┌──────────────────────────── frame ───────────────────────────┐
//! │                                                              │
//! │  PreUpdate          OnUpdate             PostUpdate          │
//! │  ┌─────────┐        ┌──────────────┐     ┌────────────────┐  │
//! │  │ spawner │──────▶ │ apply damage │───▶ │ regen (per id) │  │
//! │  └─────────┘        └──────▲───────┘     └────────────────┘  │
//! │   use_throttle             │ use_event     use_throttle      │
//! │                            │               + discriminator   │
//! └────────────────────────────┼─────────────────────────────────┘
//!                        Signal<Damage>
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use cadence_hooks::call_site;
use cadence_scheduler::{OnUpdate, PostUpdate, PreUpdate, Scheduler, SchedulerError};
use cadence_std::{Signal, use_event, use_throttle};

/// Health a freshly spawned combatant starts with.
pub const MAX_HEALTH: u32 = 100;

/// A hit landed on a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Damage {
    /// Combatant id.
    pub target: u64,
    /// Health removed.
    pub amount: u32,
}

/// Timing knobs for the arena systems.
#[derive(Debug, Clone, Copy)]
pub struct ArenaConfig {
    /// Interval between spawns.
    pub spawn_every: Duration,
    /// Interval between regeneration ticks, per combatant.
    pub regen_every: Duration,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            spawn_every: Duration::from_millis(500),
            regen_every: Duration::from_secs(1),
        }
    }
}

/// Shared arena state the systems read and write.
#[derive(Debug, Default)]
pub struct Arena {
    /// Remaining health by combatant id.
    pub health: BTreeMap<u64, u32>,
    next_id: u64,
}

impl Arena {
    fn spawn(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.health.insert(id, MAX_HEALTH);
        id
    }
}

/// Registers the arena systems and returns the damage source they listen to.
pub fn install(
    scheduler: &mut Scheduler,
    arena: &Rc<RefCell<Arena>>,
    config: ArenaConfig,
) -> Signal<Damage> {
    let damage: Signal<Damage> = Signal::new();

    let spawner = Rc::clone(arena);
    scheduler.add_system(PreUpdate, move |_dt: f64| -> Result<(), SchedulerError> {
        if use_throttle(call_site!(), config.spawn_every, None)? {
            let id = spawner.borrow_mut().spawn();
            tracing::info!(id, "combatant spawned");
        }
        Ok(())
    });

    let target = Rc::clone(arena);
    let source = damage.clone();
    scheduler.add_system(OnUpdate, move |_dt: f64| -> Result<(), SchedulerError> {
        let mut arena = target.borrow_mut();
        for hit in use_event(call_site!(), &source, None)? {
            if let Some(health) = arena.health.get_mut(&hit.target) {
                *health = health.saturating_sub(hit.amount);
            }
        }
        arena.health.retain(|id, health| {
            if *health == 0 {
                tracing::info!(id, "combatant defeated");
            }
            *health > 0
        });
        Ok(())
    });

    // One throttle per living combatant; throttles of defeated combatants
    // expire and are reclaimed on their own.
    let healer = Rc::clone(arena);
    scheduler.add_system(PostUpdate, move |_dt: f64| -> Result<(), SchedulerError> {
        let mut arena = healer.borrow_mut();
        for (id, health) in &mut arena.health {
            if use_throttle(call_site!(), config.regen_every, Some((*id).into()))? {
                *health = (*health + 1).min(MAX_HEALTH);
            }
        }
        Ok(())
    });

    damage
}

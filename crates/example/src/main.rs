//! Example frame loop CLI.
//!
//! Runs the arena for a number of frames at 60 frames per second, landing a
//! hit on the oldest combatant every tenth frame.
//!
//! # Usage
//!
//! ```bash
//! frame_loop [frames]
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use cadence_scheduler::{Scheduler, TracingConfig, TracingFormat};
use example::{Arena, ArenaConfig, Damage};
use tracing::Level;

const FRAME: Duration = Duration::from_micros(16_667);

fn main() {
    TracingConfig::new()
        .with_level(Level::INFO)
        .with_format(TracingFormat::Compact)
        .init();

    let frames: u64 = match std::env::args().nth(1).map(|arg| arg.parse()) {
        None => 180,
        Some(Ok(frames)) => frames,
        Some(Err(err)) => {
            tracing::error!(%err, "frames must be a whole number");
            std::process::exit(1);
        }
    };

    let mut scheduler = Scheduler::new();
    let arena = Rc::new(RefCell::new(Arena::default()));
    let damage = example::install(&mut scheduler, &arena, ArenaConfig::default());

    for frame in 0..frames {
        if frame % 10 == 9 {
            let oldest = arena.borrow().health.keys().next().copied();
            if let Some(target) = oldest {
                damage.fire(Damage { target, amount: 35 });
            }
        }

        if let Err(err) = scheduler.frame(FRAME.as_secs_f64()) {
            tracing::error!(frame, %err, "frame failed");
            std::process::exit(1);
        }
        std::thread::sleep(FRAME);
    }

    tracing::info!(
        frames,
        alive = arena.borrow().health.len(),
        "arena finished"
    );
}

//! Rate limiting hook.
//!
//! [`use_throttle`] answers "has at least `period` elapsed since this call
//! site last said yes?". The first call for a `(key, discriminator)` always
//! says yes. Time comes from the clock of the store driving the current
//! invocation, so tests can swap in a [`MockClock`](cadence_hooks::MockClock).
//!
//! Throttle state outlives invocations that skip the call site; it is
//! reclaimed once its window has closed. A window too long to end on the
//! clock is reclaimed by the first invocation that skips the call site.

use core::time::Duration;
use std::time::Instant;

use cadence_hooks::{Discriminator, EvictionContext, HookError, HookKey, use_hook_state};

#[derive(Debug, Default)]
struct ThrottleState {
    last_fire: Option<Instant>,
    /// `None` before the first fire, or when the window ends past the
    /// latest representable instant.
    expiry: Option<Instant>,
}

fn window_closed(state: &mut ThrottleState, ctx: &EvictionContext<'_>) -> bool {
    match state.expiry {
        Some(expiry) => ctx.now() >= expiry,
        None => !ctx.touched(),
    }
}

/// Returns `true` at most once per `period` for the current call site.
///
/// A zero `period` returns `true` on every call.
///
/// # Errors
///
/// - [`HookError::ContextMissing`] if no execution context is active
/// - [`HookError::MissingKey`] if `key` is empty
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use cadence_hooks::{HookStore, start};
/// use cadence_std::use_throttle;
///
/// let store = HookStore::new();
/// let fired = start(&store, || use_throttle("autosave", Duration::from_secs(30), None));
/// assert!(fired.unwrap());
///
/// // Same frame time, still inside the window.
/// let fired = start(&store, || use_throttle("autosave", Duration::from_secs(30), None));
/// assert!(!fired.unwrap());
/// ```
pub fn use_throttle(
    key: impl Into<HookKey>,
    period: Duration,
    discriminator: Option<Discriminator>,
) -> Result<bool, HookError> {
    let cell = use_hook_state::<ThrottleState, _>(key, discriminator, window_closed)?;
    let now = cadence_hooks::now()?;
    let mut state = cell.borrow_mut();

    let due = state
        .last_fire
        .is_none_or(|last| now.saturating_duration_since(last) >= period);
    if due {
        state.last_fire = Some(now);
        state.expiry = now.checked_add(period);
    }
    Ok(due)
}

/// [`use_throttle`] with the period given in seconds.
///
/// Negative and NaN periods act as zero; periods too large to represent
/// never reopen while the call site keeps running.
///
/// # Errors
///
/// Same as [`use_throttle`].
pub fn use_throttle_secs(
    key: impl Into<HookKey>,
    seconds: f64,
    discriminator: Option<Discriminator>,
) -> Result<bool, HookError> {
    use_throttle(key, period_from_secs(seconds), discriminator)
}

fn period_from_secs(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(if seconds > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seconds_are_clamped() {
        assert_eq!(period_from_secs(1.5), Duration::from_millis(1500));
        assert_eq!(period_from_secs(-3.0), Duration::ZERO);
        assert_eq!(period_from_secs(f64::NAN), Duration::ZERO);
        assert_eq!(period_from_secs(f64::INFINITY), Duration::MAX);
    }

    #[test]
    fn throttle_needs_a_context() {
        let result = use_throttle("orphan", Duration::from_secs(1), None);
        assert!(matches!(result, Err(HookError::ContextMissing)));
    }
}

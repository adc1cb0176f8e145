//! Time source for hook decisions.
//!
//! Every [`HookStore`](crate::HookStore) carries a [`Clock`]. Hooks read the
//! current instant through [`now()`](crate::now), and eviction predicates
//! receive it via [`EvictionContext::now`](crate::EvictionContext::now), so a
//! store built with a mock clock is fully deterministic.

use std::sync::Arc;
use std::time::Instant;

#[cfg(any(test, feature = "test-utils"))]
use std::time::Duration;

/// Source of the instants a [`Clock`] hands out.
///
/// A host that wants hooks to see one instant per frame, rather than the wall
/// clock at each call, implements this over its own frame timestamp:
///
/// ```
/// use std::sync::Arc;
/// use std::time::Instant;
/// use cadence_hooks::{Clock, ClockProvider, HookStore};
///
/// struct FrameStamp(parking_lot::RwLock<Instant>);
///
/// impl ClockProvider for FrameStamp {
///     fn now(&self) -> Instant {
///         *self.0.read()
///     }
/// }
///
/// let stamp = Arc::new(FrameStamp(parking_lot::RwLock::new(Instant::now())));
/// let store = HookStore::with_clock(Clock::with_provider(stamp));
/// ```
pub trait ClockProvider: Send + Sync + 'static {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

struct WallClock;

impl ClockProvider for WallClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Cloneable handle to a [`ClockProvider`].
///
/// Clones read the same provider, so a scheduler can hand one clock to all
/// of its stores.
#[derive(Clone)]
pub struct Clock {
    provider: Arc<dyn ClockProvider>,
}

impl Clock {
    /// The wall clock.
    #[must_use]
    pub fn system() -> Self {
        Self {
            provider: Arc::new(WallClock),
        }
    }

    /// A clock reading from `provider`.
    #[must_use]
    pub fn with_provider(provider: Arc<dyn ClockProvider>) -> Self {
        Self { provider }
    }

    /// Returns the provider's current instant.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.provider.now()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl core::fmt::Debug for Clock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Clock").finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// MockClock
// ─────────────────────────────────────────────────────────────────────────────

/// Hand-driven time for tests.
///
/// Share it with a store through [`Clock::with_provider`]; the store then
/// sees time move only when the test calls [`advance`](Self::advance),
/// [`advance_secs`](Self::advance_secs) or [`set`](Self::set).
#[cfg(any(test, feature = "test-utils"))]
pub struct MockClock {
    current: parking_lot::RwLock<Instant>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockClock {
    /// A mock clock stopped at `start`.
    #[must_use]
    pub fn new(start: Instant) -> Self {
        Self {
            current: parking_lot::RwLock::new(start),
        }
    }

    /// Moves time forward by `step`.
    pub fn advance(&self, step: Duration) {
        *self.current.write() += step;
    }

    /// Moves time forward by `seconds`, the unit frame deltas come in.
    ///
    /// Negative or NaN steps are ignored.
    pub fn advance_secs(&self, seconds: f64) {
        if let Ok(step) = Duration::try_from_secs_f64(seconds) {
            self.advance(step);
        }
    }

    /// Jumps to `instant`, which may lie in the past.
    pub fn set(&self, instant: Instant) {
        *self.current.write() = instant;
    }

    /// The instant the clock is stopped at.
    #[must_use]
    pub fn current(&self) -> Instant {
        *self.current.read()
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl ClockProvider for MockClock {
    fn now(&self) -> Instant {
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_tracks_wall_time() {
        let before = Instant::now();
        let reading = Clock::default().now();
        assert!(reading >= before);
        assert!(reading <= Instant::now());
    }

    #[test]
    fn mock_clock_only_moves_when_told() {
        let start = Instant::now();
        let mock = MockClock::new(start);

        assert_eq!(mock.current(), start);
        mock.advance(Duration::from_secs(2));
        mock.advance_secs(0.25);
        mock.advance_secs(-1.0);
        mock.advance_secs(f64::NAN);

        assert_eq!(mock.current() - start, Duration::from_millis(2250));
    }

    #[test]
    fn mock_clock_can_rewind() {
        let start = Instant::now();
        let mock = MockClock::new(start + Duration::from_secs(10));
        mock.set(start);
        assert_eq!(mock.current(), start);
    }

    #[test]
    fn clones_read_one_provider() {
        let mock = Arc::new(MockClock::new(Instant::now()));
        let clock = Clock::with_provider(mock.clone());
        let copy = clock.clone();

        mock.advance(Duration::from_millis(16));

        assert_eq!(clock.now(), mock.current());
        assert_eq!(copy.now(), mock.current());
    }

    #[test]
    fn store_reads_the_mock_clock() {
        let mock = Arc::new(MockClock::new(Instant::now()));
        let store = crate::HookStore::with_clock(Clock::with_provider(mock.clone()));

        let before = store.clock().now();
        mock.advance_secs(0.5);

        assert_eq!(store.clock().now() - before, Duration::from_millis(500));
    }
}

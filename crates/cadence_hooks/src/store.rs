//! Backing store for hook state.
//!
//! A [`HookStore`] holds one slot per call-site key. Each slot maps
//! effective discriminators to type-erased state cells and carries the
//! eviction predicate the slot was created with.
//!
//! # Ownership
//!
//! The store is owned by whoever schedules the callback (one store per
//! distinct callback) and outlives every single invocation. Cells are handed
//! out as [`StateCell`] handles that keep pointing at the same allocation
//! until the eviction pass condemns it.
//!
//! # Eviction
//!
//! After each invocation, every cell's predicate is asked whether the cell
//! may be reclaimed. The predicate alone decides; whether the cell was
//! touched during the invocation is passed in as [`EvictionContext::touched`]
//! so predicates can condemn idle state when that is what they want.

use core::any::{Any, TypeId};
use core::cell::{Ref, RefCell, RefMut};
use core::fmt;
use std::rc::Rc;
use std::time::Instant;

use hashbrown::{HashMap, HashSet};

use crate::error::HookError;
use crate::key::{CompositeKey, Discriminator, HookKey};
use crate::time::Clock;

// ─────────────────────────────────────────────────────────────────────────────
// StateCell
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to one retained piece of hook state.
///
/// Returned by [`use_hook_state`](crate::use_hook_state). Two handles for the
/// same composite key compare equal under [`ptr_eq`](Self::ptr_eq) for as long
/// as the cell stays alive.
pub struct StateCell<S> {
    inner: Rc<RefCell<S>>,
}

impl<S> StateCell<S> {
    /// Immutably borrows the state.
    ///
    /// # Panics
    ///
    /// Panics if the state is currently mutably borrowed.
    #[must_use]
    pub fn borrow(&self) -> Ref<'_, S> {
        self.inner.borrow()
    }

    /// Mutably borrows the state.
    ///
    /// # Panics
    ///
    /// Panics if the state is currently borrowed.
    #[must_use]
    pub fn borrow_mut(&self) -> RefMut<'_, S> {
        self.inner.borrow_mut()
    }

    /// Runs `f` with mutable access to the state and returns its result.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    /// Returns `true` if both handles point at the same cell.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<S> Clone for StateCell<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for StateCell<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateCell").field(&self.inner).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EvictionContext
// ─────────────────────────────────────────────────────────────────────────────

/// Information handed to an eviction predicate for one cell.
#[derive(Debug)]
pub struct EvictionContext<'a> {
    key: &'a HookKey,
    discriminator: &'a Discriminator,
    touched: bool,
    now: Instant,
}

impl<'a> EvictionContext<'a> {
    /// Call-site key of the cell under review.
    #[must_use]
    pub fn key(&self) -> &'a HookKey {
        self.key
    }

    /// Effective discriminator of the cell under review.
    #[must_use]
    pub fn discriminator(&self) -> &'a Discriminator {
        self.discriminator
    }

    /// Whether the cell was accessed during the invocation that just ended.
    #[must_use]
    pub fn touched(&self) -> bool {
        self.touched
    }

    /// The store clock's reading at the start of the eviction pass.
    #[must_use]
    pub fn now(&self) -> Instant {
        self.now
    }
}

/// Ready-made eviction predicates.
pub mod evict {
    use super::EvictionContext;

    /// Condemns a cell as soon as an invocation ends without touching it.
    #[must_use]
    pub fn when_untouched<S>(_state: &mut S, ctx: &EvictionContext<'_>) -> bool {
        !ctx.touched()
    }

    /// Never condemns; the cell lives as long as its store.
    #[must_use]
    pub fn never<S>(_state: &mut S, _ctx: &EvictionContext<'_>) -> bool {
        false
    }

    /// Condemns at the end of every invocation.
    #[must_use]
    pub fn always<S>(_state: &mut S, _ctx: &EvictionContext<'_>) -> bool {
        true
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookSlot
// ─────────────────────────────────────────────────────────────────────────────

/// Type-erased predicate. `None` means the cell could not be inspected.
type ErasedPredicate = dyn Fn(&dyn Any, &EvictionContext<'_>) -> Option<bool>;

/// Storage for one call site: discriminator → cell, plus its predicate.
pub(crate) struct HookSlot {
    state_type: TypeId,
    state_type_name: &'static str,
    predicate: Rc<ErasedPredicate>,
    cells: HashMap<Discriminator, Rc<dyn Any>>,
}

impl HookSlot {
    fn new<S, F>(predicate: F) -> Self
    where
        S: 'static,
        F: Fn(&mut S, &EvictionContext<'_>) -> bool + 'static,
    {
        let erased = move |cell: &dyn Any, ctx: &EvictionContext<'_>| {
            let cell = cell.downcast_ref::<RefCell<S>>()?;
            let mut state = cell.try_borrow_mut().ok()?;
            Some(predicate(&mut state, ctx))
        };

        Self {
            state_type: TypeId::of::<S>(),
            state_type_name: core::any::type_name::<S>(),
            predicate: Rc::new(erased),
            cells: HashMap::new(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HookStore
// ─────────────────────────────────────────────────────────────────────────────

struct StoreInner {
    slots: HashMap<HookKey, HookSlot>,
    clock: Clock,
}

/// Caller-owned collection of hook slots.
///
/// Pass the same store to [`start`](crate::start) on every invocation of a
/// callback; state created during one invocation is found again by the next.
///
/// # Example
///
/// ```
/// use cadence_hooks::{HookStore, evict, start, use_hook_state};
///
/// let store = HookStore::new();
///
/// for expected in 1..=3 {
///     let count = start(&store, || {
///         let cell = use_hook_state::<u32, _>("frames", None, evict::never)?;
///         *cell.borrow_mut() += 1;
///         let count = *cell.borrow();
///         Ok::<_, cadence_hooks::HookError>(count)
///     })
///     .unwrap();
///     assert_eq!(count, expected);
/// }
/// ```
pub struct HookStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl HookStore {
    /// Creates an empty store backed by the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Clock::system())
    }

    /// Creates an empty store that reads time from `clock`.
    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                slots: HashMap::new(),
                clock,
            })),
        }
    }

    /// Returns the clock this store reads time from.
    #[must_use]
    pub fn clock(&self) -> Clock {
        self.inner.borrow().clock.clone()
    }

    /// Returns the number of live state cells across all slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner
            .borrow()
            .slots
            .values()
            .map(|slot| slot.cells.len())
            .sum()
    }

    /// Returns `true` if no state cell is alive.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the number of slots (call sites seen so far).
    ///
    /// Slots outlive their cells: a call site keeps its slot, and with it the
    /// predicate it was first created with, for the lifetime of the store.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.inner.borrow().slots.len()
    }

    /// Returns `true` if a live cell exists for the given address.
    ///
    /// `None` looks up the implicit singleton instance of `key`.
    #[must_use]
    pub fn contains(&self, key: &HookKey, discriminator: Option<&Discriminator>) -> bool {
        let inner = self.inner.borrow();
        let Some(slot) = inner.slots.get(key) else {
            return false;
        };
        match discriminator {
            Some(discriminator) => slot.cells.contains_key(discriminator),
            None => slot
                .cells
                .contains_key(&Discriminator::Implicit(key.clone())),
        }
    }

    /// Drops every slot and cell.
    ///
    /// Predicates are not consulted; state that owns external resources
    /// releases them through its own `Drop`.
    pub fn clear(&self) {
        let drained: Vec<HookSlot> = {
            let mut inner = self.inner.borrow_mut();
            inner.slots.drain().map(|(_, slot)| slot).collect()
        };
        tracing::debug!(slots = drained.len(), "hook store cleared");
        drop(drained);
    }

    /// Returns a second handle to the same storage, for the context stack.
    pub(crate) fn share(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }

    /// Returns `true` if both handles refer to the same storage.
    pub(crate) fn same_store(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Fetches the cell at `(key, discriminator)`, creating slot and cell on
    /// first access.
    pub(crate) fn fetch_or_create<S, F>(
        &self,
        key: &HookKey,
        discriminator: &Discriminator,
        predicate: F,
    ) -> Result<StateCell<S>, HookError>
    where
        S: Default + 'static,
        F: Fn(&mut S, &EvictionContext<'_>) -> bool + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let slot = inner
            .slots
            .entry(key.clone())
            .or_insert_with(|| HookSlot::new::<S, F>(predicate));

        if slot.state_type != TypeId::of::<S>() {
            return Err(HookError::StateTypeMismatch {
                key: key.clone(),
                discriminator: discriminator.clone(),
                stored: slot.state_type_name,
                requested: core::any::type_name::<S>(),
            });
        }

        let cell = slot
            .cells
            .entry(discriminator.clone())
            .or_insert_with(|| {
                tracing::debug!(%key, %discriminator, "hook state created");
                Rc::new(RefCell::new(S::default())) as Rc<dyn Any>
            })
            .clone();

        let inner = cell
            .downcast::<RefCell<S>>()
            .map_err(|_| HookError::StateTypeMismatch {
                key: key.clone(),
                discriminator: discriminator.clone(),
                stored: slot.state_type_name,
                requested: core::any::type_name::<S>(),
            })?;

        Ok(StateCell { inner })
    }

    /// Runs the eviction pass and returns the number of cells removed.
    ///
    /// Predicates run with no borrow of the store held, so a predicate that
    /// drops other hook state does not trip over the store.
    pub(crate) fn evict(&self, touched: &HashSet<CompositeKey>) -> usize {
        let (now, candidates) = {
            let inner = self.inner.borrow();
            let now = inner.clock.now();
            let candidates: Vec<_> = inner
                .slots
                .iter()
                .flat_map(|(key, slot)| {
                    slot.cells.iter().map(move |(discriminator, cell)| {
                        (
                            key.clone(),
                            discriminator.clone(),
                            Rc::clone(cell),
                            Rc::clone(&slot.predicate),
                        )
                    })
                })
                .collect();
            (now, candidates)
        };

        let mut condemned = Vec::new();
        for (key, discriminator, cell, predicate) in candidates {
            let composite = (key, discriminator);
            let ctx = EvictionContext {
                key: &composite.0,
                discriminator: &composite.1,
                touched: touched.contains(&composite),
                now,
            };
            match predicate(&*cell, &ctx) {
                Some(true) => condemned.push(composite),
                Some(false) => {}
                None => {
                    tracing::warn!(
                        key = %composite.0,
                        discriminator = %composite.1,
                        "hook state still borrowed during eviction, keeping it"
                    );
                }
            }
        }

        let removed: Vec<Rc<dyn Any>> = {
            let mut inner = self.inner.borrow_mut();
            condemned
                .iter()
                .filter_map(|(key, discriminator)| {
                    let cell = inner.slots.get_mut(key)?.cells.remove(discriminator)?;
                    tracing::debug!(%key, %discriminator, "hook state evicted");
                    Some(cell)
                })
                .collect()
        };

        let count = removed.len();
        drop(removed);
        count
    }
}

impl Default for HookStore {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HookStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("HookStore")
                .field("slots", &inner.slots.len())
                .finish_non_exhaustive(),
            Err(_) => f.debug_struct("HookStore").finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        value: i32,
    }

    fn touched(entries: &[(&'static str, Discriminator)]) -> HashSet<CompositeKey> {
        entries
            .iter()
            .map(|(key, discriminator)| (HookKey::from(*key), discriminator.clone()))
            .collect()
    }

    #[test]
    fn fetch_creates_default_state() {
        let store = HookStore::new();
        let key = HookKey::from("counter");
        let implicit = Discriminator::Implicit(key.clone());

        let cell = store
            .fetch_or_create::<Counter, _>(&key, &implicit, evict::never)
            .unwrap();

        assert_eq!(cell.borrow().value, 0);
        assert_eq!(store.len(), 1);
        assert_eq!(store.slot_count(), 1);
        assert!(store.contains(&key, None));
    }

    #[test]
    fn fetch_returns_same_cell() {
        let store = HookStore::new();
        let key = HookKey::from("counter");
        let d = Discriminator::from(1_u64);

        let first = store
            .fetch_or_create::<Counter, _>(&key, &d, evict::never)
            .unwrap();
        first.borrow_mut().value = 9;
        let second = store
            .fetch_or_create::<Counter, _>(&key, &d, evict::never)
            .unwrap();

        assert!(first.ptr_eq(&second));
        assert_eq!(second.borrow().value, 9);
    }

    #[test]
    fn type_mismatch_is_reported() {
        let store = HookStore::new();
        let key = HookKey::from("shared");
        let d = Discriminator::from(1_u64);

        store
            .fetch_or_create::<Counter, _>(&key, &d, evict::never)
            .unwrap();
        let result = store.fetch_or_create::<String, _>(&key, &d, evict::never);

        assert!(matches!(result, Err(HookError::StateTypeMismatch { .. })));
    }

    #[test]
    fn predicate_is_fixed_at_first_creation() {
        let store = HookStore::new();
        let key = HookKey::from("site");
        let d = Discriminator::from(1_u64);

        store
            .fetch_or_create::<Counter, _>(&key, &d, evict::never)
            .unwrap();
        // A later request with a different predicate does not replace it.
        store
            .fetch_or_create::<Counter, _>(&key, &d, evict::always)
            .unwrap();

        assert_eq!(store.evict(&HashSet::new()), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn untouched_cells_are_condemned_by_untouched_predicate() {
        let store = HookStore::new();
        let key = HookKey::from("site");
        let kept = Discriminator::from(1_u64);
        let dropped = Discriminator::from(2_u64);

        for d in [&kept, &dropped] {
            store
                .fetch_or_create::<Counter, _>(&key, d, evict::when_untouched)
                .unwrap();
        }

        let removed = store.evict(&touched(&[("site", kept.clone())]));

        assert_eq!(removed, 1);
        assert!(store.contains(&key, Some(&kept)));
        assert!(!store.contains(&key, Some(&dropped)));
        // The slot itself survives.
        assert_eq!(store.slot_count(), 1);
    }

    #[test]
    fn predicate_sees_state() {
        let store = HookStore::new();
        let key = HookKey::from("site");
        let d = Discriminator::from(1_u64);

        let cell = store
            .fetch_or_create::<Counter, _>(&key, &d, |state: &mut Counter, _| state.value > 2)
            .unwrap();

        cell.borrow_mut().value = 1;
        assert_eq!(store.evict(&HashSet::new()), 0);

        cell.borrow_mut().value = 3;
        assert_eq!(store.evict(&HashSet::new()), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn borrowed_cell_survives_eviction() {
        let store = HookStore::new();
        let key = HookKey::from("site");
        let d = Discriminator::from(1_u64);

        let cell = store
            .fetch_or_create::<Counter, _>(&key, &d, evict::always)
            .unwrap();
        let guard = cell.borrow_mut();

        assert_eq!(store.evict(&HashSet::new()), 0);
        drop(guard);
        assert_eq!(store.evict(&HashSet::new()), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let store = HookStore::new();
        let key = HookKey::from("site");
        store
            .fetch_or_create::<Counter, _>(&key, &Discriminator::from(1_u64), evict::never)
            .unwrap();

        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.slot_count(), 0);
    }
}

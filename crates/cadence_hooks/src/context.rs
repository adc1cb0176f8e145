//! Execution contexts and the context stack.
//!
//! [`start`] pushes an execution context for the duration of one callback
//! invocation. Hooks called anywhere below that callback resolve against the
//! innermost context, whatever the call depth.
//!
//! # Single-thread contract
//!
//! The stack is thread-local. A context is only visible to hooks running on
//! the thread that pushed it, and [`HookStore`] is neither `Send` nor `Sync`,
//! so a store cannot be driven from two threads at once.
//!
//! # Nesting
//!
//! `start` may be called from inside another `start`'s callback, against the
//! same store or a different one. Contexts pop in exact reverse order of
//! their push:
//!
//! ```text
//! start(outer) ─┬─ use_hook_state(..)      → outer context
//!               ├─ start(inner) ─── hooks  → inner context
//!               │        └─ evict(inner), pop
//!               └─ use_hook_state(..)      → outer context again
//!          evict(outer), pop
//! ```
//!
//! When the inner context is bound to a store an enclosing context also
//! holds, it skips its eviction pass. The outermost context on that store
//! runs a single pass at its own exit, keeping every key touched by it or by
//! any context nested inside it.

use core::cell::RefCell;
use std::time::Instant;

use hashbrown::HashSet;

use crate::error::HookError;
use crate::key::{CompositeKey, Discriminator, HookKey};
use crate::store::{EvictionContext, HookStore, StateCell};

/// Activation record for one callback invocation.
///
/// Owns the set of composite keys touched during the invocation. The state
/// itself lives in the store, which outlives the context.
pub(crate) struct ExecutionContext {
    store: HookStore,
    touched: HashSet<CompositeKey>,
    /// Keys touched by finished inner contexts on the same store. They are
    /// kept alive by this context's eviction pass but are not its own touches.
    deferred: HashSet<CompositeKey>,
    depth: usize,
}

impl ExecutionContext {
    fn new(store: &HookStore, depth: usize) -> Self {
        Self {
            store: store.share(),
            touched: HashSet::new(),
            deferred: HashSet::new(),
            depth,
        }
    }

    fn touched_count(&self) -> usize {
        self.touched.len()
    }
}

/// LIFO stack of execution contexts.
#[derive(Default)]
struct ContextStack {
    frames: RefCell<Vec<ExecutionContext>>,
}

impl ContextStack {
    fn push(&self, store: &HookStore) -> usize {
        let mut frames = self.frames.borrow_mut();
        let depth = frames.len() + 1;
        frames.push(ExecutionContext::new(store, depth));
        depth
    }

    /// Closes the top frame's touched-set.
    ///
    /// Only the outermost context on a store runs its eviction pass. An inner
    /// context on a store that an enclosing context also holds hands its keys
    /// to the nearest such context and returns `None`; otherwise the store and
    /// the keys to keep are returned.
    fn finish_top(&self) -> Option<(HookStore, HashSet<CompositeKey>)> {
        let mut frames = self.frames.borrow_mut();
        let (top, enclosing) = frames.split_last_mut()?;
        let mut touched = core::mem::take(&mut top.touched);
        touched.extend(top.deferred.drain());

        match enclosing
            .iter_mut()
            .rev()
            .find(|frame| frame.store.same_store(&top.store))
        {
            Some(owner) => {
                owner.deferred.extend(touched);
                None
            }
            None => Some((top.store.share(), touched)),
        }
    }

    fn pop(&self, expected_depth: usize) {
        let popped = self.frames.borrow_mut().pop();
        debug_assert_eq!(
            popped.map(|frame| frame.depth),
            Some(expected_depth),
            "execution contexts must pop in reverse order of their push"
        );
    }
}

thread_local! {
    static STACK: ContextStack = ContextStack::default();
}

/// Runs the eviction pass and pops the context on every exit path.
struct ContextGuard {
    depth: usize,
    _span: tracing::span::EnteredSpan,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        match STACK.with(ContextStack::finish_top) {
            Some((store, touched)) => {
                let evicted = store.evict(&touched);
                tracing::trace!(
                    depth = self.depth,
                    touched = touched.len(),
                    evicted,
                    "execution context finished"
                );
            }
            None => {
                tracing::trace!(
                    depth = self.depth,
                    "execution context finished, eviction left to enclosing context"
                );
            }
        }
        STACK.with(|stack| stack.pop(self.depth));
    }
}

/// Runs `callback` inside a fresh execution context bound to `store`.
///
/// When `callback` returns (or unwinds), the eviction pass runs against
/// `store` and the context is popped. If an enclosing context already holds
/// `store`, the pass is left to that context instead. The callback's return
/// value is passed through unchanged.
///
/// # Example
///
/// ```
/// use cadence_hooks::{HookStore, evict, start, use_hook_state};
///
/// let store = HookStore::new();
///
/// start(&store, || {
///     let buffer = use_hook_state::<Vec<u8>, _>("buffer", None, evict::when_untouched)
///         .unwrap();
///     buffer.borrow_mut().push(1);
/// });
///
/// assert_eq!(store.len(), 1);
///
/// // Not touched this time, so the untouched predicate reclaims it.
/// start(&store, || {});
/// assert!(store.is_empty());
/// ```
pub fn start<R>(store: &HookStore, callback: impl FnOnce() -> R) -> R {
    let depth = STACK.with(|stack| stack.push(store));
    let span = tracing::trace_span!("hook_context", depth).entered();
    let _guard = ContextGuard { depth, _span: span };
    callback()
}

/// Fetches or creates the state cell for `(key, discriminator)` in the
/// innermost execution context's store.
///
/// An absent discriminator selects the call site's implicit singleton
/// instance. The slot for `key` is created on first access with `predicate`
/// as its eviction predicate; later calls reuse the slot and ignore the
/// predicate they pass. The composite key is marked as touched for the
/// current invocation.
///
/// # Errors
///
/// - [`HookError::ContextMissing`] if no context is active on this thread
/// - [`HookError::MissingKey`] if `key` is empty
/// - [`HookError::StateTypeMismatch`] if the slot was created for another type
pub fn use_hook_state<S, F>(
    key: impl Into<HookKey>,
    discriminator: Option<Discriminator>,
    predicate: F,
) -> Result<StateCell<S>, HookError>
where
    S: Default + 'static,
    F: Fn(&mut S, &EvictionContext<'_>) -> bool + 'static,
{
    let key = key.into();
    let store = STACK.with(|stack| {
        stack
            .frames
            .borrow()
            .last()
            .map(|frame| frame.store.share())
            .ok_or(HookError::ContextMissing)
    })?;

    if key.is_empty() {
        return Err(HookError::MissingKey);
    }

    let discriminator = Discriminator::effective(discriminator, &key);
    let cell = store.fetch_or_create(&key, &discriminator, predicate)?;

    STACK.with(|stack| {
        if let Some(frame) = stack.frames.borrow_mut().last_mut() {
            frame.touched.insert((key, discriminator));
        }
    });

    Ok(cell)
}

/// Reads the clock of the innermost context's store.
///
/// # Errors
///
/// Returns [`HookError::ContextMissing`] if no context is active.
pub fn now() -> Result<Instant, HookError> {
    STACK.with(|stack| {
        stack
            .frames
            .borrow()
            .last()
            .map(|frame| frame.store.clock())
            .ok_or(HookError::ContextMissing)
    })
    .map(|clock| clock.now())
}

/// Returns the number of active execution contexts on this thread.
#[must_use]
pub fn context_depth() -> usize {
    STACK.with(|stack| stack.frames.borrow().len())
}

/// Returns `true` if an execution context is active on this thread.
#[must_use]
pub fn is_active() -> bool {
    context_depth() > 0
}

/// Returns how many composite keys the innermost context has touched.
///
/// # Errors
///
/// Returns [`HookError::ContextMissing`] if no context is active.
pub fn touched_count() -> Result<usize, HookError> {
    STACK.with(|stack| {
        stack
            .frames
            .borrow()
            .last()
            .map(ExecutionContext::touched_count)
            .ok_or(HookError::ContextMissing)
    })
}

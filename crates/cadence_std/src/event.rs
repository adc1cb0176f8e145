//! Event capture hook.
//!
//! [`use_event`] subscribes to an event source the first time a call site
//! (and discriminator) runs, buffers every event the source delivers, and
//! hands back an [`EventReader`] that drains the buffer in arrival order.
//! When an invocation ends without reaching the call site, the subscription
//! is disconnected and the buffer dropped.
//!
//! # Sources and connections
//!
//! Sources implement [`Subscribable`]. Any `Fn(Listener<T>) -> Connection`
//! closure is a source, and so is [`Signal`](crate::Signal). A source hands
//! back a [`Connection`] describing how to undo the subscription:
//!
//! | Constructor | Disconnects by |
//! |-------------|----------------|
//! | [`Connection::from_fn`] | Calling a closure once |
//! | [`Connection::from_handle`] | Calling [`Disconnectable::disconnect`] |
//! | [`Connection::detached`] | Nothing; disconnecting logs a warning |
//!
//! # Example
//!
//! ```
//! use cadence_hooks::{HookStore, start};
//! use cadence_std::{Signal, use_event};
//!
//! let damage = Signal::<(u64, f32)>::new();
//! let store = HookStore::new();
//!
//! // First frame: subscribe, nothing buffered yet.
//! start(&store, || {
//!     let events = use_event("damage", &damage, None).unwrap();
//!     assert!(events.is_empty());
//! });
//!
//! damage.fire((7, 12.5));
//! damage.fire((9, 3.0));
//!
//! // Second frame: drain what arrived in between.
//! let seen: Vec<_> = start(&store, || use_event("damage", &damage, None).unwrap().collect());
//! assert_eq!(seen, vec![(7, 12.5), (9, 3.0)]);
//! ```

use core::fmt;
use std::collections::VecDeque;
use std::sync::Arc;

use cadence_hooks::{Discriminator, EvictionContext, HookError, HookKey, use_hook_state};
use parking_lot::Mutex;

/// Callback a source invokes once per delivered event.
pub type Listener<T> = Arc<dyn Fn(T) + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Subscribable / Disconnectable
// ─────────────────────────────────────────────────────────────────────────────

/// An event source that accepts listeners.
pub trait Subscribable<T> {
    /// Registers `listener` and returns the connection that removes it.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::UnsupportedSource`] if the source cannot accept
    /// listeners.
    fn subscribe(&self, listener: Listener<T>) -> Result<Connection, HookError>;
}

impl<T, F> Subscribable<T> for F
where
    F: Fn(Listener<T>) -> Connection,
{
    fn subscribe(&self, listener: Listener<T>) -> Result<Connection, HookError> {
        Ok(self(listener))
    }
}

/// A handle that can undo a subscription.
pub trait Disconnectable: Send {
    /// Removes the listener this handle was created for.
    fn disconnect(&mut self);
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection
// ─────────────────────────────────────────────────────────────────────────────

enum ConnectionKind {
    Callback(Box<dyn FnOnce() + Send>),
    Handle(Box<dyn Disconnectable>),
    Detached(&'static str),
}

/// Result of subscribing to a source.
///
/// A connection is disconnected at most once. Dropping a connection that is
/// still live disconnects it.
pub struct Connection {
    kind: Option<ConnectionKind>,
}

impl Connection {
    /// A connection undone by calling `disconnect` once.
    #[must_use]
    pub fn from_fn(disconnect: impl FnOnce() + Send + 'static) -> Self {
        Self {
            kind: Some(ConnectionKind::Callback(Box::new(disconnect))),
        }
    }

    /// A connection undone through a [`Disconnectable`] handle.
    #[must_use]
    pub fn from_handle(handle: impl Disconnectable + 'static) -> Self {
        Self {
            kind: Some(ConnectionKind::Handle(Box::new(handle))),
        }
    }

    /// A connection that cannot be undone.
    ///
    /// `source` describes the source for the warning logged on disconnect.
    #[must_use]
    pub fn detached(source: &'static str) -> Self {
        Self {
            kind: Some(ConnectionKind::Detached(source)),
        }
    }

    /// Returns `true` until the connection has been disconnected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.kind.is_some()
    }

    /// Undoes the subscription. Later calls do nothing.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::UnsupportedConnection`] for detached connections.
    /// The connection counts as disconnected afterwards either way.
    pub fn disconnect(&mut self) -> Result<(), HookError> {
        match self.kind.take() {
            None => Ok(()),
            Some(ConnectionKind::Callback(disconnect)) => {
                disconnect();
                Ok(())
            }
            Some(ConnectionKind::Handle(mut handle)) => {
                handle.disconnect();
                Ok(())
            }
            Some(ConnectionKind::Detached(source)) => {
                Err(HookError::UnsupportedConnection(source.to_owned()))
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Err(err) = self.disconnect() {
            tracing::warn!(%err, "connection dropped without a way to disconnect");
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            None => "disconnected",
            Some(ConnectionKind::Callback(_)) => "callback",
            Some(ConnectionKind::Handle(_)) => "handle",
            Some(ConnectionKind::Detached(_)) => "detached",
        };
        f.debug_struct("Connection").field("kind", &kind).finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventReader
// ─────────────────────────────────────────────────────────────────────────────

type EventQueue<T> = Arc<Mutex<VecDeque<T>>>;

/// Pull side of a [`use_event`] buffer.
///
/// Each pull removes and returns the oldest buffered event; `None` means the
/// buffer is empty for now. Also usable as an [`Iterator`] that stops once
/// the buffer is drained.
pub struct EventReader<T> {
    queue: EventQueue<T>,
}

impl<T> EventReader<T> {
    /// Removes and returns the oldest buffered event.
    #[must_use]
    pub fn pull(&self) -> Option<T> {
        self.queue.lock().pop_front()
    }

    /// Number of events waiting to be pulled.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns `true` if no event is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl<T> Iterator for EventReader<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.pull()
    }
}

impl<T> fmt::Debug for EventReader<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventReader")
            .field("pending", &self.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// use_event
// ─────────────────────────────────────────────────────────────────────────────

struct EventState<T> {
    queue: EventQueue<T>,
    connection: Option<Connection>,
}

impl<T> Default for EventState<T> {
    fn default() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            connection: None,
        }
    }
}

/// Disconnects and condemns the subscription once its call site goes idle.
fn release_when_untouched<T>(state: &mut EventState<T>, ctx: &EvictionContext<'_>) -> bool {
    if ctx.touched() {
        return false;
    }
    if let Some(mut connection) = state.connection.take()
        && let Err(err) = connection.disconnect()
    {
        tracing::warn!(
            key = %ctx.key(),
            discriminator = %ctx.discriminator(),
            %err,
            "event subscription evicted without disconnecting"
        );
    }
    true
}

/// Captures events from `source` for the current call site.
///
/// Subscribes on the first call for `(key, discriminator)` and keeps the
/// subscription for as long as every invocation reaches this call. Events
/// delivered between invocations are buffered without bound.
///
/// # Errors
///
/// - [`HookError::ContextMissing`] / [`HookError::MissingKey`] as for
///   [`use_hook_state`]
/// - [`HookError::UnsupportedSource`] if `source` refuses the subscription;
///   the next call retries
pub fn use_event<T, S>(
    key: impl Into<HookKey>,
    source: &S,
    discriminator: Option<Discriminator>,
) -> Result<EventReader<T>, HookError>
where
    T: Send + 'static,
    S: Subscribable<T> + ?Sized,
{
    let cell = use_hook_state::<EventState<T>, _>(key, discriminator, release_when_untouched)?;
    let mut state = cell.borrow_mut();

    if state.connection.is_none() {
        let queue = Arc::clone(&state.queue);
        let listener: Listener<T> = Arc::new(move |event: T| queue.lock().push_back(event));
        state.connection = Some(source.subscribe(listener)?);
    }

    Ok(EventReader {
        queue: Arc::clone(&state.queue),
    })
}

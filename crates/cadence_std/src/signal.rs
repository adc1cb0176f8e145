//! A minimal multi-listener event source.

use core::fmt;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use cadence_hooks::HookError;
use parking_lot::RwLock;

use crate::event::{Connection, Listener, Subscribable};

struct SignalShared<T> {
    listeners: RwLock<Vec<(u64, Listener<T>)>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

/// Broadcasts each fired value to every connected listener.
///
/// Cloning a signal yields another handle to the same listener list.
/// Listeners connected while a fire is in progress do not see that fire.
pub struct Signal<T> {
    shared: Arc<SignalShared<T>>,
}

impl<T: 'static> Signal<T> {
    /// Creates a signal with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shared: Arc::new(SignalShared {
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Connects `listener`; the returned [`Connection`] removes it again.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::UnsupportedSource`] once the signal is closed.
    pub fn connect(
        &self,
        listener: impl Fn(T) + Send + Sync + 'static,
    ) -> Result<Connection, HookError> {
        self.subscribe(Arc::new(listener))
    }

    /// Number of connected listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.shared.listeners.read().len()
    }

    /// Drops every listener and refuses new ones.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.listeners.write().clear();
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}

impl<T: Clone + 'static> Signal<T> {
    /// Delivers `value` to every listener connected at the time of the call.
    pub fn fire(&self, value: T) {
        let listeners: Vec<Listener<T>> = self
            .shared
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        tracing::trace!(listeners = listeners.len(), "signal fired");
        for listener in listeners {
            listener(value.clone());
        }
    }
}

impl<T: 'static> Subscribable<T> for Signal<T> {
    fn subscribe(&self, listener: Listener<T>) -> Result<Connection, HookError> {
        if self.is_closed() {
            return Err(HookError::UnsupportedSource("signal is closed".to_owned()));
        }

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.listeners.write().push((id, listener));

        let shared: Weak<SignalShared<T>> = Arc::downgrade(&self.shared);
        Ok(Connection::from_fn(move || {
            if let Some(shared) = shared.upgrade() {
                shared.listeners.write().retain(|(other, _)| *other != id);
            }
        }))
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.shared.listeners.read().len())
            .field("closed", &self.shared.closed.load(Ordering::Acquire))
            .finish()
    }
}

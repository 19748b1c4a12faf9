//! Typed event channels
//!
//! A [`Signal`] is a synchronous dispatch channel: `emit` invokes every
//! connected listener in subscription order, on the caller's stack. Contract
//! consumers react to sequential mutations, so delivery order is part of the
//! contract, not an implementation detail.
//!
//! Listeners are held behind `Arc` and the listener list is snapshotted
//! before dispatch, so a listener may connect or disconnect listeners (on
//! this or any other signal) without deadlocking the emitting call.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Handle to a connected listener, used to disconnect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct SignalInner<T> {
    next_id: u64,
    listeners: Vec<(ListenerId, Callback<T>)>,
}

/// A synchronous, subscription-ordered event channel.
pub struct Signal<T> {
    inner: Mutex<SignalInner<T>>,
}

impl<T> Signal<T> {
    /// Create a channel with no listeners.
    pub fn new() -> Self {
        Signal {
            inner: Mutex::new(SignalInner {
                next_id: 0,
                listeners: Vec::new(),
            }),
        }
    }

    /// Connect a listener. Listeners fire in connection order.
    pub fn connect<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut inner = self.inner.lock();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.listeners.push((id, Arc::new(listener)));
        id
    }

    /// Disconnect a listener. Disconnecting an unknown id is a no-op.
    pub fn disconnect(&self, id: ListenerId) {
        self.inner.lock().listeners.retain(|(lid, _)| *lid != id);
    }

    /// Invoke every listener with `event`, in subscription order.
    pub fn emit(&self, event: &T) {
        // Snapshot so listeners can touch the signal re-entrantly.
        let listeners: Vec<Callback<T>> = self
            .inner
            .lock()
            .listeners
            .iter()
            .map(|(_, cb)| cb.clone())
            .collect();
        for listener in listeners {
            listener(event);
        }
    }

    /// Number of connected listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}

impl<T> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

//! Publish/subscribe channel for telemetry and settings changes
//!
//! Each `connect` returns a [`Subscription`] handle. Dropping the handle or
//! calling [`Subscription::revoke`] disconnects that callback only.

use std::sync::{Arc, Mutex, Weak};

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Slots<T> {
    next_id: u64,
    callbacks: Vec<(u64, Callback<T>)>,
}

/// Multi-subscriber signal
pub struct Signal<T> {
    slots: Arc<Mutex<Slots<T>>>,
}

impl<T: 'static> Signal<T> {
    pub fn new() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                next_id: 0,
                callbacks: Vec::new(),
            })),
        }
    }

    /// Register a callback invoked on every [`emit`](Self::emit)
    pub fn connect<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = {
            let mut slots = self.slots.lock().unwrap_or_else(|p| p.into_inner());
            let id = slots.next_id;
            slots.next_id += 1;
            slots.callbacks.push((id, Arc::new(callback)));
            id
        };

        let slots: Arc<Mutex<Slots<T>>> = Arc::clone(&self.slots);
        let slots: Weak<Mutex<dyn Disconnect + Send>> = {
            let erased: Arc<Mutex<dyn Disconnect + Send>> = slots;
            Arc::downgrade(&erased)
        };

        Subscription {
            slots: Some(slots),
            id,
        }
    }

    /// Call every connected callback with `value`
    ///
    /// Callbacks run outside the internal lock, so they may connect or revoke
    /// subscriptions themselves.
    pub fn emit(&self, value: &T) {
        let callbacks: Vec<Callback<T>> = match self.slots.lock() {
            Ok(slots) => slots.callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect(),
            Err(_) => return,
        };

        for callback in callbacks {
            callback(value);
        }
    }

    /// Number of live subscriptions
    pub fn subscriber_count(&self) -> usize {
        self.slots.lock().map(|s| s.callbacks.len()).unwrap_or(0)
    }
}

impl<T: 'static> Default for Signal<T> {
    fn default() -> Self {
        Self::new()
    }
}

trait Disconnect {
    fn disconnect(&mut self, id: u64);
}

impl<T> Disconnect for Slots<T> {
    fn disconnect(&mut self, id: u64) {
        self.callbacks.retain(|(slot_id, _)| *slot_id != id);
    }
}

/// Handle to a connected callback
///
/// The callback stays connected until the handle is revoked or dropped.
#[must_use = "dropping a Subscription disconnects its callback"]
pub struct Subscription {
    slots: Option<Weak<Mutex<dyn Disconnect + Send>>>,
    id: u64,
}

impl Subscription {
    /// Disconnect the callback
    pub fn revoke(mut self) {
        self.disconnect();
    }

    /// Whether the owning signal still exists
    pub fn is_connected(&self) -> bool {
        self.slots
            .as_ref()
            .map(|weak| weak.strong_count() > 0)
            .unwrap_or(false)
    }

    fn disconnect(&mut self) {
        if let Some(slots) = self.slots.take().and_then(|weak| weak.upgrade()) {
            let mut slots = slots.lock().unwrap_or_else(|p| p.into_inner());
            slots.disconnect(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

//! Change notification for translation state.
//!
//! Two ways to observe the state manager:
//! - callbacks registered with `Notifier::subscribe`, invoked synchronously
//!   after each published change
//! - a `tokio::sync::watch` receiver for async consumers
//!
//! Neither replays: a new subscriber sees only changes published after it
//! subscribed and must read the current state itself.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::watch;

use crate::state::TranslationState;

type Listener = Arc<dyn Fn(&TranslationState) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    next_id: u64,
    entries: BTreeMap<u64, Listener>,
}

/// Fan-out of published translation states.
pub struct Notifier {
    listeners: Arc<Mutex<Listeners>>,
    sender: watch::Sender<TranslationState>,
}

impl Notifier {
    pub fn new(initial: TranslationState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self {
            listeners: Arc::new(Mutex::new(Listeners::default())),
            sender,
        }
    }

    /// Register a callback for future changes.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&TranslationState) + Send + Sync + 'static,
    {
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        let id = listeners.next_id;
        listeners.next_id += 1;
        listeners.entries.insert(id, Arc::new(callback));

        Subscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// A receiver whose current value is the latest published state, already marked seen.
    pub fn watch(&self) -> watch::Receiver<TranslationState> {
        self.sender.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Deliver `state` to every listener.
    ///
    /// Must not be called while holding the state lock. The listener list is
    /// copied first, so callbacks may subscribe or unsubscribe while running.
    pub fn notify(&self, state: &TranslationState) {
        self.sender.send_replace(state.clone());

        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .values()
            .cloned()
            .collect();

        for listener in listeners {
            listener(state);
        }
    }
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle to a registered callback. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes immediately"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    listeners: Weak<Mutex<Listeners>>,
}

impl Subscription {
    /// Remove the callback. Safe to call repeatedly and after the notifier is gone.
    pub fn unsubscribe(&self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entries
                .remove(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.entries.len())
            .finish()
    }
}

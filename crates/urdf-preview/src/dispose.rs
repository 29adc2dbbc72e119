//! Disposal notification and listener release
//!
//! A [`DisposeEmitter`] delivers its event at most once. Observers registered
//! after delivery are never invoked. Unsubscribing is idempotent and safe
//! after the emitter is gone.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Observer = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct EmitterState {
    observers: Vec<(u64, Observer)>,
    fired: bool,
}

/// Fire-once event with explicit observer registration
#[derive(Default)]
pub struct DisposeEmitter {
    state: Arc<Mutex<EmitterState>>,
    next_id: AtomicU64,
}

impl DisposeEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `observer`; it runs on the first [`fire`](Self::fire) only
    pub fn subscribe(&self, observer: impl FnOnce() + Send + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();
        if !state.fired {
            state.observers.push((id, Box::new(observer)));
        }
        Subscription {
            id,
            state: Arc::downgrade(&self.state),
        }
    }

    /// Deliver the event, returning how many observers ran
    ///
    /// Every call after the first is a no-op.
    pub fn fire(&self) -> usize {
        let observers = {
            let mut state = self.state.lock();
            if state.fired {
                return 0;
            }
            state.fired = true;
            std::mem::take(&mut state.observers)
        };

        let count = observers.len();
        for (_, observer) in observers {
            observer();
        }
        count
    }

    pub fn has_fired(&self) -> bool {
        self.state.lock().fired
    }

    pub fn observer_count(&self) -> usize {
        self.state.lock().observers.len()
    }
}

/// Handle returned by [`DisposeEmitter::subscribe`]
pub struct Subscription {
    id: u64,
    state: Weak<Mutex<EmitterState>>,
}

impl Subscription {
    /// Remove the observer if it has not run yet
    pub fn unsubscribe(&self) {
        if let Some(state) = self.state.upgrade() {
            state.lock().observers.retain(|(id, _)| *id != self.id);
        }
    }
}

/// A registered listener released when its session is disposed
pub struct Listener {
    name: String,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Listener {
    pub fn new(name: impl Into<String>, release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            name: name.into(),
            release: Some(Box::new(release)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn release(&mut self) {
        if let Some(release) = self.release.take() {
            tracing::debug!("Releasing listener {}", self.name);
            release();
        }
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.release();
    }
}

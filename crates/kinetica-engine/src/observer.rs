//! Token-keyed observer channels.
//!
//! Each point carries two of these: one for position updates, one for
//! prediction updates. Observers register a callback under an identity
//! token and deregister with the same token. Emission snapshots the
//! callback list before invoking anything, so a callback may not observe a
//! subscription change made concurrently with the emit that is already in
//! flight.

use std::sync::{Arc, Mutex};

use kinetica_models::{PointId, Polynomial};

/// Callback held by value; `Arc` so emission can run outside the list lock.
pub type ObserverCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Payload of a point's `PositionChanged` channel.
#[derive(Clone, Debug)]
pub struct PositionUpdate {
    pub point: PointId,
    pub positions: Vec<f64>,
    pub now: f64,
}

/// Payload of a point's `PredictionChanged` channel.
#[derive(Clone, Debug)]
pub struct PredictionUpdate {
    pub point: PointId,
    pub predicted: Vec<Polynomial>,
    pub now: f64,
}

/// An ordered list of `(token, callback)` observers.
pub struct ObserverList<T> {
    observers: Mutex<Vec<(u64, ObserverCallback<T>)>>,
}

impl<T> Default for ObserverList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ObserverList<T> {
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
        }
    }

    /// Register `callback` under `token`. Tokens are caller-chosen identity
    /// values; registering the same token twice keeps both entries, and one
    /// `unsubscribe` removes them all.
    pub fn subscribe(&self, token: u64, callback: ObserverCallback<T>) {
        self.observers.lock().unwrap().push((token, callback));
    }

    /// Remove every callback registered under `token`. Returns whether
    /// anything was removed.
    pub fn unsubscribe(&self, token: u64) -> bool {
        let mut observers = self.observers.lock().unwrap();
        let before = observers.len();
        observers.retain(|(t, _)| *t != token);
        observers.len() != before
    }

    /// Invoke every registered callback with `payload`.
    pub fn emit(&self, payload: &T) {
        let snapshot: Vec<ObserverCallback<T>> = self
            .observers
            .lock()
            .unwrap()
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        for callback in snapshot {
            callback(payload);
        }
    }

    pub fn len(&self) -> usize {
        self.observers.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[test]
    fn subscribe_emit_unsubscribe() {
        let list: ObserverList<u64> = ObserverList::new();
        let hits = Arc::new(AtomicU64::new(0));

        let h = hits.clone();
        list.subscribe(1, Arc::new(move |v| {
            h.fetch_add(*v, Ordering::SeqCst);
        }));
        assert_eq!(list.len(), 1);

        list.emit(&5);
        assert_eq!(hits.load(Ordering::SeqCst), 5);

        assert!(list.unsubscribe(1));
        assert!(list.is_empty());
        list.emit(&5);
        assert_eq!(hits.load(Ordering::SeqCst), 5);

        // Second unsubscribe is a no-op.
        assert!(!list.unsubscribe(1));
    }

    #[test]
    fn unsubscribe_only_matching_token() {
        let list: ObserverList<()> = ObserverList::new();
        list.subscribe(1, Arc::new(|_| {}));
        list.subscribe(2, Arc::new(|_| {}));
        assert!(list.unsubscribe(1));
        assert_eq!(list.len(), 1);
    }
}

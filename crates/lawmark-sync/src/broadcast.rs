//! Multi-listener event fan-out.
//!
//! [`Broadcast`] decouples the session manager from the preview-side
//! bridge: either side subscribes without owning the other's lifecycle.
//! Delivery is synchronous and in subscription order, over a snapshot of
//! the listener set, so a listener may subscribe or unsubscribe during
//! delivery without disturbing the round in flight.

use std::sync::{Arc, Mutex, PoisonError};

/// A subscribed callback. The `Arc` identity doubles as the
/// subscription handle: subscribing the same handle twice is a no-op,
/// and unsubscribing takes the same handle back.
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// A multi-listener broadcast channel with explicit subscription.
pub struct Broadcast<T> {
    listeners: Mutex<Vec<Listener<T>>>,
}

impl<T> Default for Broadcast<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Broadcast<T> {
    /// Create a broadcast with no listeners.
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Add a listener. Re-subscribing an already-subscribed handle is
    /// idempotent.
    pub fn subscribe(&self, listener: Listener<T>) {
        let mut listeners = self.lock();
        if !listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            listeners.push(listener);
        }
    }

    /// Remove a listener by handle. Unknown handles are ignored.
    pub fn unsubscribe(&self, listener: &Listener<T>) {
        self.lock().retain(|l| !Arc::ptr_eq(l, listener));
    }

    /// Deliver `event` to every listener subscribed at emit time, in
    /// subscription order.
    pub fn emit(&self, event: &T) {
        let snapshot: Vec<Listener<T>> = self.lock().clone();
        for listener in snapshot {
            listener(event);
        }
    }

    /// Number of current subscriptions.
    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Listener<T>>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn push_listener(log: &Arc<Mutex<Vec<String>>>, name: &str) -> Listener<u32> {
        let log = Arc::clone(log);
        let name = name.to_owned();
        Arc::new(move |n| log.lock().unwrap().push(format!("{name}:{n}")))
    }

    #[test]
    fn test_fan_out_in_subscription_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = Broadcast::new();
        let (a, b, c) = (
            push_listener(&log, "a"),
            push_listener(&log, "b"),
            push_listener(&log, "c"),
        );

        bus.subscribe(a);
        bus.subscribe(b.clone());
        bus.subscribe(c);
        bus.emit(&1);
        assert_eq!(*log.lock().unwrap(), vec!["a:1", "b:1", "c:1"]);

        log.lock().unwrap().clear();
        bus.unsubscribe(&b);
        bus.emit(&2);
        assert_eq!(*log.lock().unwrap(), vec!["a:2", "c:2"]);
    }

    #[test]
    fn test_duplicate_subscribe_is_idempotent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = Broadcast::new();
        let a = push_listener(&log, "a");

        bus.subscribe(a.clone());
        bus.subscribe(a);
        assert_eq!(bus.listener_count(), 1);

        bus.emit(&7);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_subscribe_during_emit_misses_current_round() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = Arc::new(Broadcast::new());

        let late = push_listener(&log, "late");
        let recruiter: Listener<u32> = {
            let bus = Arc::clone(&bus);
            let log = Arc::clone(&log);
            let late = late.clone();
            Arc::new(move |n| {
                log.lock().unwrap().push(format!("recruiter:{n}"));
                bus.subscribe(late.clone());
            })
        };

        bus.subscribe(recruiter);
        bus.emit(&1);
        assert_eq!(*log.lock().unwrap(), vec!["recruiter:1"]);

        bus.emit(&2);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["recruiter:1", "recruiter:2", "late:2"]
        );
    }

    #[test]
    fn test_unsubscribe_during_emit_still_delivers_round() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let bus = Arc::new(Broadcast::new());

        let b = push_listener(&log, "b");
        let quitter: Listener<u32> = {
            let bus = Arc::clone(&bus);
            let log = Arc::clone(&log);
            let b = b.clone();
            Arc::new(move |n| {
                log.lock().unwrap().push(format!("quitter:{n}"));
                bus.unsubscribe(&b);
            })
        };

        bus.subscribe(quitter);
        bus.subscribe(b);
        bus.emit(&1);
        // b was unsubscribed mid-round but the snapshot still delivers.
        assert_eq!(*log.lock().unwrap(), vec!["quitter:1", "b:1"]);
        assert_eq!(bus.listener_count(), 1);
    }
}

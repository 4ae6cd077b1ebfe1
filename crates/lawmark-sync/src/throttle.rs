//! Trailing-edge rate limiting for high-frequency events.
//!
//! A [`Throttle`] invokes its callback at most once per window, always
//! with the arguments of the most recent [`trigger`](Throttle::trigger)
//! call. Unlike a drop-while-pending throttle, a trigger that lands
//! mid-window is never lost: it is re-dispatched when the window ends.
//! When a full window passes with no trigger, the timer parks and the
//! next trigger starts a fresh one.

use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

type Callback<T> = Box<dyn Fn(T) + Send + Sync>;

/// A trailing-edge rate limiter over tokio time.
///
/// Cheap to clone; all clones share the same window and pending state.
/// Must be triggered from within a tokio runtime (the timer is a spawned
/// task). Dropping every handle lets an in-flight timer expire as a
/// no-op, so teardown needs no explicit cancellation.
pub struct Throttle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Throttle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<T> {
    state: Mutex<State<T>>,
    window: Duration,
    lead_in: Option<Duration>,
    callback: Callback<T>,
}

struct State<T> {
    /// Latest pending arguments; overwritten by each trigger.
    pending: Option<T>,
    /// Whether a timer task is currently alive for this throttle.
    running: bool,
}

impl<T: Send + 'static> Throttle<T> {
    /// Create a throttle firing at most once per `window`.
    pub fn new(window: Duration, callback: impl Fn(T) + Send + Sync + 'static) -> Self {
        Self::build(window, None, callback)
    }

    /// Create a throttle whose first fire in a burst comes after
    /// `lead_in` instead of a full window. A zero lead-in makes the
    /// first event in a burst fire (nearly) immediately while the rest
    /// still coalesce.
    pub fn with_lead_in(
        window: Duration,
        lead_in: Duration,
        callback: impl Fn(T) + Send + Sync + 'static,
    ) -> Self {
        Self::build(window, Some(lead_in), callback)
    }

    fn build(
        window: Duration,
        lead_in: Option<Duration>,
        callback: impl Fn(T) + Send + Sync + 'static,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    pending: None,
                    running: false,
                }),
                window,
                lead_in,
                callback: Box::new(callback),
            }),
        }
    }

    /// Record `args` as the latest pending arguments and make sure a
    /// timer is running to dispatch them.
    pub fn trigger(&self, args: T) {
        let start_timer = {
            let mut state = lock(&self.shared.state);
            state.pending = Some(args);
            if state.running {
                false
            } else {
                state.running = true;
                true
            }
        };

        if start_timer {
            let first_delay = self.shared.lead_in.unwrap_or(self.shared.window);
            let shared = Arc::downgrade(&self.shared);
            tokio::spawn(run_timer(shared, first_delay));
        }
    }
}

/// Timer loop: fire with the latest pending args once per window until a
/// window passes with nothing pending. Holds only a weak handle while
/// sleeping so a dropped throttle does not keep the task alive.
async fn run_timer<T: Send + 'static>(shared: Weak<Shared<T>>, first_delay: Duration) {
    let mut delay = first_delay;
    loop {
        tokio::time::sleep(delay).await;

        let Some(shared) = shared.upgrade() else {
            // Throttle dropped mid-window; late fire is a no-op.
            return;
        };

        let args = {
            let mut state = lock(&shared.state);
            match state.pending.take() {
                Some(args) => args,
                None => {
                    state.running = false;
                    return;
                }
            }
        };

        (shared.callback)(args);
        delay = shared.window;
    }
}

fn lock<T>(mutex: &Mutex<State<T>>) -> std::sync::MutexGuard<'_, State<T>> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn recording() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) + Send + Sync) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&calls);
        (calls, move |n| sink.lock().unwrap().push(n))
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_coalesces_to_last_args() {
        let (calls, sink) = recording();
        let throttle = Throttle::new(Duration::from_millis(100), sink);

        for n in 0..10 {
            throttle.trigger(n);
        }

        // Nothing fires before the window ends.
        tokio::time::sleep(Duration::from_millis(99)).await;
        assert_eq!(*calls.lock().unwrap(), Vec::<u32>::new());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(*calls.lock().unwrap(), vec![9]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_trailing_trigger_is_not_dropped() {
        let (calls, sink) = recording();
        let throttle = Throttle::new(Duration::from_millis(100), sink);

        throttle.trigger(1);
        tokio::time::sleep(Duration::from_millis(101)).await;
        assert_eq!(*calls.lock().unwrap(), vec![1]);

        // Mid-window trigger fires at the next window boundary, not never.
        throttle.trigger(2);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(*calls.lock().unwrap(), vec![1]);
        tokio::time::sleep(Duration::from_millis(51)).await;
        assert_eq!(*calls.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_fire_per_window() {
        let (calls, sink) = recording();
        let throttle = Throttle::new(Duration::from_millis(100), sink);

        // Trigger continuously across two and a half windows, then let
        // the trailing fire flush.
        for step in 0..25u32 {
            throttle.trigger(step);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Fires at 100, 200, and the trailing 300; then the timer parks.
        assert_eq!(calls.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lead_in_fires_early_then_windows() {
        let (calls, sink) = recording();
        let throttle = Throttle::with_lead_in(Duration::from_millis(100), Duration::ZERO, sink);

        throttle.trigger(1);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(*calls.lock().unwrap(), vec![1]);

        // Subsequent triggers in the burst coalesce on the full window.
        throttle.trigger(2);
        throttle.trigger(3);
        tokio::time::sleep(Duration::from_millis(98)).await;
        assert_eq!(*calls.lock().unwrap(), vec![1]);
        tokio::time::sleep(Duration::from_millis(3)).await;
        assert_eq!(*calls.lock().unwrap(), vec![1, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_window_parks_then_lead_in_applies_again() {
        let (calls, sink) = recording();
        let throttle = Throttle::with_lead_in(Duration::from_millis(100), Duration::from_millis(10), sink);

        throttle.trigger(1);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*calls.lock().unwrap(), vec![1]);

        // The timer parked after the empty window; a new burst gets the
        // short lead-in again.
        throttle.trigger(2);
        tokio::time::sleep(Duration::from_millis(11)).await;
        assert_eq!(*calls.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_throttle_timer_is_noop() {
        let (calls, sink) = recording();
        let throttle = Throttle::new(Duration::from_millis(100), sink);

        throttle.trigger(1);
        drop(throttle);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(*calls.lock().unwrap(), Vec::<u32>::new());
    }
}

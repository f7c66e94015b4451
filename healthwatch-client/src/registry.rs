//! Subscriber registry with join-in-progress delivery.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use healthwatch_types::StatusSnapshot;
use parking_lot::{Mutex, ReentrantMutex, RwLock};

/// Delivery callback. Receives `None` only on registration, when nothing has
/// been accepted yet.
pub type Callback = Box<dyn Fn(Option<&StatusSnapshot>) + Send + Sync>;

/// Handle returned by [`SubscriptionRegistry::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

struct Entry {
    id: SubscriptionId,
    active: AtomicBool,
    callback: Callback,
}

/// Fan-out of accepted snapshots to any number of observers.
///
/// Registration, removal and broadcast all run under one re-entrant delivery
/// lock. A callback may therefore subscribe or unsubscribe from inside a
/// broadcast on the same thread, while callers on other threads wait for the
/// broadcast in progress to finish. Once `unsubscribe` returns, the callback
/// is never invoked again.
pub struct SubscriptionRegistry {
    delivery: ReentrantMutex<()>,
    subscribers: Mutex<Vec<Arc<Entry>>>,
    latest: RwLock<Option<StatusSnapshot>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    /// Create an empty registry with no current status.
    pub fn new() -> Self {
        Self {
            delivery: ReentrantMutex::new(()),
            subscribers: Mutex::new(Vec::new()),
            latest: RwLock::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a callback and deliver the current status to it.
    ///
    /// The immediate delivery happens before this returns and before any
    /// later broadcast reaches the new subscriber.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Option<&StatusSnapshot>) + Send + Sync + 'static,
    {
        let _delivery = self.delivery.lock();

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = Arc::new(Entry {
            id,
            active: AtomicBool::new(true),
            callback: Box::new(callback),
        });
        self.subscribers.lock().push(entry.clone());

        let current = self.latest.read().clone();
        (entry.callback)(current.as_ref());

        id
    }

    /// Remove a registration.
    ///
    /// Returns `false` if the handle was already removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let _delivery = self.delivery.lock();

        let mut subscribers = self.subscribers.lock();
        match subscribers.iter().position(|entry| entry.id == id) {
            Some(index) => {
                let entry = subscribers.remove(index);
                entry.active.store(false, Ordering::Release);
                true
            }
            None => false,
        }
    }

    /// Record `snapshot` as the current status and deliver it.
    ///
    /// Delivery goes to the subscribers registered when the broadcast starts,
    /// in registration order. Subscribers added by a callback during the
    /// broadcast are not part of it; subscribers removed during it are
    /// skipped if not yet visited.
    pub fn broadcast(&self, snapshot: StatusSnapshot) {
        let _delivery = self.delivery.lock();

        *self.latest.write() = Some(snapshot.clone());
        let targets: Vec<Arc<Entry>> = self.subscribers.lock().clone();

        for entry in targets {
            if entry.active.load(Ordering::Acquire) {
                (entry.callback)(Some(&snapshot));
            }
        }
    }

    /// The most recently broadcast snapshot.
    pub fn latest(&self) -> Option<StatusSnapshot> {
        self.latest.read().clone()
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Whether nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("subscribers", &self.len())
            .field("has_latest", &self.latest.read().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use healthwatch_types::OverallStatus;

    fn snapshot(message: &str) -> StatusSnapshot {
        StatusSnapshot::builder()
            .status(OverallStatus::Ok)
            .status_code(200)
            .message(message)
            .build()
    }

    /// Callback that appends each delivery's message (or "<none>") to a log.
    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        tag: &'static str,
    ) -> impl Fn(Option<&StatusSnapshot>) + Send + Sync + 'static {
        let log = log.clone();
        move |s| {
            let message = s.map(|s| s.message.clone()).unwrap_or_else(|| "<none>".into());
            log.lock().push(format!("{tag}:{message}"));
        }
    }

    #[test]
    fn subscribe_delivers_none_before_any_snapshot() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.subscribe(recorder(&log, "a"));

        assert_eq!(*log.lock(), vec!["a:<none>"]);
    }

    #[test]
    fn subscribe_delivers_current_status() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.broadcast(snapshot("first"));
        registry.broadcast(snapshot("second"));
        registry.subscribe(recorder(&log, "late"));

        assert_eq!(*log.lock(), vec!["late:second"]);
    }

    #[test]
    fn broadcast_in_registration_order() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.subscribe(recorder(&log, "a"));
        registry.subscribe(recorder(&log, "b"));
        registry.subscribe(recorder(&log, "c"));
        log.lock().clear();

        registry.broadcast(snapshot("x"));

        assert_eq!(*log.lock(), vec!["a:x", "b:x", "c:x"]);
        assert_eq!(registry.latest().unwrap().message, "x");
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let registry = SubscriptionRegistry::new();
        let id = registry.subscribe(|_| {});

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn no_delivery_after_unsubscribe() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let a = registry.subscribe(recorder(&log, "a"));
        registry.subscribe(recorder(&log, "b"));
        registry.unsubscribe(a);
        log.lock().clear();

        registry.broadcast(snapshot("x"));

        assert_eq!(*log.lock(), vec!["b:x"]);
    }

    #[test]
    fn unsubscribe_unvisited_subscriber_mid_broadcast() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));
        let victim: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let reg = registry.clone();
        let target = victim.clone();
        let first_log = log.clone();
        registry.subscribe(move |s| {
            if let Some(s) = s {
                first_log.lock().push(format!("a:{}", s.message));
                if let Some(id) = target.lock().take() {
                    reg.unsubscribe(id);
                }
            }
        });
        let b = registry.subscribe(recorder(&log, "b"));
        registry.subscribe(recorder(&log, "c"));
        *victim.lock() = Some(b);
        log.lock().clear();

        registry.broadcast(snapshot("x"));

        assert_eq!(*log.lock(), vec!["a:x", "c:x"]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn subscriber_can_remove_itself() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let own_id: Arc<Mutex<Option<SubscriptionId>>> = Arc::new(Mutex::new(None));

        let reg = registry.clone();
        let counter = calls.clone();
        let slot = own_id.clone();
        let id = registry.subscribe(move |s| {
            if s.is_some() {
                counter.fetch_add(1, Ordering::SeqCst);
                if let Some(id) = *slot.lock() {
                    reg.unsubscribe(id);
                }
            }
        });
        *own_id.lock() = Some(id);

        registry.broadcast(snapshot("x"));
        registry.broadcast(snapshot("y"));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn subscriber_added_mid_broadcast_waits_for_next_one() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let log = Arc::new(Mutex::new(Vec::new()));

        let reg = registry.clone();
        let late_log = log.clone();
        let added = Arc::new(AtomicBool::new(false));
        registry.subscribe(move |s| {
            if s.is_some() && !added.swap(true, Ordering::SeqCst) {
                reg.subscribe(recorder(&late_log, "late"));
            }
        });

        registry.broadcast(snapshot("C"));
        registry.broadcast(snapshot("D"));

        // Join-in-progress hands it C once; the broadcast of C itself skips it.
        assert_eq!(*log.lock(), vec!["late:C", "late:D"]);
    }

    #[test]
    fn cross_thread_unsubscribe_stops_delivery() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let stop = Arc::new(AtomicBool::new(false));

        let counter = calls.clone();
        let id = registry.subscribe(move |s| {
            if s.is_some() {
                counter.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_micros(50));
            }
        });

        let broadcaster = {
            let registry = registry.clone();
            let stop = stop.clone();
            std::thread::spawn(move || {
                let mut n = 0u64;
                while !stop.load(Ordering::SeqCst) {
                    registry.broadcast(snapshot(&n.to_string()));
                    n += 1;
                }
            })
        };

        while calls.load(Ordering::SeqCst) < 10 {
            std::thread::yield_now();
        }
        assert!(registry.unsubscribe(id));
        let after_unsubscribe = calls.load(Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));

        stop.store(true, Ordering::SeqCst);
        broadcaster.join().unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), after_unsubscribe);
    }

    #[test]
    fn later_subscriber_does_not_see_earlier_broadcasts() {
        let registry = SubscriptionRegistry::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.subscribe(recorder(&log, "a"));
        registry.broadcast(snapshot("x"));
        registry.subscribe(recorder(&log, "b"));
        registry.broadcast(snapshot("y"));

        assert_eq!(*log.lock(), vec!["a:<none>", "a:x", "b:x", "a:y", "b:y"]);
    }
}

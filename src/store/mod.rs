//! Persisted reactive value containers
//!
//! Each container holds one value, mirrors it into a storage backend as
//! JSON, and notifies subscribers synchronously on every change. The
//! backend is picked once at startup (see [`backend::detect`]), so the rest
//! of the app never checks what environment it runs in.

pub mod backend;

#[cfg(target_arch = "wasm32")]
pub use backend::LocalStorage;
pub use backend::{MemoryStorage, StorageBackend, detect};

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors surfaced by [`Persisted::set`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The new value could not be encoded as JSON.
    #[error("failed to encode value for key {key:?}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

type Callback<T> = Rc<dyn Fn(&T)>;

struct Subscriber<T> {
    id: u64,
    callback: Callback<T>,
}

struct Inner<T> {
    key: String,
    backend: Rc<dyn StorageBackend>,
    value: T,
    subscribers: Vec<Subscriber<T>>,
    next_id: u64,
}

/// A value persisted under a fixed key, with synchronous change
/// notification.
///
/// Cloning yields another handle to the same container; the composition
/// root builds one and hands clones to whatever needs the value.
pub struct Persisted<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Persisted<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Persisted<T>
where
    T: Clone + Serialize + DeserializeOwned + 'static,
{
    /// Create a container, seeding the value from the backend when a valid
    /// entry exists under `key`.
    ///
    /// A malformed stored entry is indistinguishable from no entry: the
    /// container starts from `initial` and the next `set` overwrites it.
    pub fn new(key: impl Into<String>, initial: T, backend: Rc<dyn StorageBackend>) -> Self {
        let key = key.into();
        let value = match backend.read(&key) {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(stored) => {
                    log::info!("Loaded stored value for {}", key);
                    stored
                }
                Err(err) => {
                    log::warn!("Discarding malformed stored value for {}: {}", key, err);
                    initial
                }
            },
            None => initial,
        };

        Self {
            inner: Rc::new(RefCell::new(Inner {
                key,
                backend,
                value,
                subscribers: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Register a callback and immediately invoke it with the current
    /// value.
    ///
    /// Callbacks run synchronously, in registration order, on every
    /// [`set`](Self::set). The same callback may be registered more than
    /// once; each registration is notified separately.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription<T> {
        let callback: Callback<T> = Rc::new(callback);
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.subscribers.push(Subscriber {
                id,
                callback: Rc::clone(&callback),
            });
            id
        };

        // Borrow released before the callback runs, so it may call get()
        // or set() on the same container.
        let current = self.get();
        callback(&current);

        Subscription {
            inner: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Replace the value, mirror it into the backend, and notify
    /// subscribers in registration order before returning.
    ///
    /// The value is replaced before encoding, so a failed encode leaves the
    /// new value visible to [`get`](Self::get) but persists nothing and
    /// notifies nobody.
    pub fn set(&self, value: T) -> Result<(), StoreError> {
        let callbacks: Vec<Callback<T>> = {
            let mut inner = self.inner.borrow_mut();
            inner.value = value;
            let payload = match serde_json::to_string(&inner.value) {
                Ok(payload) => payload,
                Err(source) => {
                    return Err(StoreError::Encode {
                        key: inner.key.clone(),
                        source,
                    });
                }
            };
            inner.backend.write(&inner.key, &payload);
            inner
                .subscribers
                .iter()
                .map(|s| Rc::clone(&s.callback))
                .collect()
        };

        // Both the value and the subscriber list are snapshotted: callbacks
        // may touch the container without hitting a live borrow.
        let current = self.get();
        for callback in callbacks {
            callback(&current);
        }
        Ok(())
    }
}

/// Handle returned by [`Persisted::subscribe`].
///
/// [`unsubscribe`](Self::unsubscribe) removes exactly the registration that
/// produced the handle, even when the same callback was registered several
/// times. Dropping the handle without calling it leaves the callback
/// registered for the life of the container.
pub struct Subscription<T> {
    inner: Weak<RefCell<Inner<T>>>,
    id: u64,
}

impl<T> Subscription<T> {
    /// Remove this registration. A no-op when the container is already
    /// gone.
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.borrow_mut().subscribers.retain(|s| s.id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::cell::Cell;

    fn new_store(backend: &MemoryStorage, key: &str, initial: &str) -> Persisted<String> {
        Persisted::new(key, initial.to_string(), Rc::new(backend.clone()))
    }

    #[test]
    fn test_set_then_get() {
        let backend = MemoryStorage::new();
        let store = new_store(&backend, "k", "default");
        assert_eq!(store.get(), "default");

        store.set("beach.jpg".to_string()).unwrap();
        assert_eq!(store.get(), "beach.jpg");
        // The durable entry holds the serialized form.
        assert_eq!(backend.read("k"), Some("\"beach.jpg\"".to_string()));
    }

    #[test]
    fn test_reload_sees_stored_value() {
        let backend = MemoryStorage::new();
        new_store(&backend, "k", "default")
            .set("beach.jpg".to_string())
            .unwrap();

        let reloaded = new_store(&backend, "k", "default");
        assert_eq!(reloaded.get(), "beach.jpg");
    }

    #[test]
    fn test_fresh_backend_starts_from_initial() {
        let first = MemoryStorage::new();
        new_store(&first, "k", "default")
            .set("beach.jpg".to_string())
            .unwrap();

        // A separate backend simulates running without durable storage.
        let second = MemoryStorage::new();
        assert_eq!(new_store(&second, "k", "default").get(), "default");
    }

    #[test]
    fn test_subscribe_fires_immediately_with_current_value() {
        let backend = MemoryStorage::new();
        let store = new_store(&backend, "k", "default");

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |v: &String| sink.borrow_mut().push(v.clone()));

        assert_eq!(*seen.borrow(), vec!["default".to_string()]);
    }

    #[test]
    fn test_set_notifies_before_returning() {
        let backend = MemoryStorage::new();
        let store = new_store(&backend, "k", "default");

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        store.subscribe(move |v: &String| sink.borrow_mut().push(v.clone()));

        store.set("beach.jpg".to_string()).unwrap();
        assert_eq!(
            *seen.borrow(),
            vec!["default".to_string(), "beach.jpg".to_string()]
        );
    }

    #[test]
    fn test_notification_follows_registration_order() {
        let backend = MemoryStorage::new();
        let store = new_store(&backend, "k", "");

        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let sink = Rc::clone(&order);
            store.subscribe(move |_: &String| sink.borrow_mut().push(tag));
        }

        order.borrow_mut().clear();
        store.set("x".to_string()).unwrap();
        assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_unsubscribe_stops_notifications() {
        let backend = MemoryStorage::new();
        let store = new_store(&backend, "k", "");

        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        let sub = store.subscribe(move |_: &String| sink.set(sink.get() + 1));
        assert_eq!(count.get(), 1);

        sub.unsubscribe();
        store.set("x".to_string()).unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_disposer_removes_only_its_own_registration() {
        let backend = MemoryStorage::new();
        let store = new_store(&backend, "k", "");

        let count = Rc::new(Cell::new(0));
        let callback = {
            let sink = Rc::clone(&count);
            move |_: &String| sink.set(sink.get() + 1)
        };
        let first = store.subscribe(callback.clone());
        let _second = store.subscribe(callback);
        assert_eq!(count.get(), 2);

        first.unsubscribe();
        store.set("x".to_string()).unwrap();
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn test_malformed_entry_falls_back_to_initial() {
        let backend = MemoryStorage::new();
        backend.write("k", "{not json");

        assert_eq!(new_store(&backend, "k", "default").get(), "default");
    }

    #[derive(Clone)]
    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            use serde::ser::Error as _;
            Err(S::Error::custom("unencodable"))
        }
    }

    impl<'de> serde::Deserialize<'de> for Unencodable {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            <() as serde::Deserialize>::deserialize(deserializer)?;
            Ok(Unencodable)
        }
    }

    #[test]
    fn test_encode_failure_propagates_without_notifying() {
        let backend = MemoryStorage::new();
        let store: Persisted<Unencodable> =
            Persisted::new("k", Unencodable, Rc::new(backend.clone()));

        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        store.subscribe(move |_: &Unencodable| sink.set(sink.get() + 1));
        assert_eq!(count.get(), 1);

        assert!(store.set(Unencodable).is_err());
        assert_eq!(count.get(), 1);
        assert_eq!(backend.read("k"), None);
    }

    proptest! {
        #[test]
        fn prop_set_survives_reload(value in ".*") {
            let backend = MemoryStorage::new();
            new_store(&backend, "wallpaper", "").set(value.clone()).unwrap();

            prop_assert_eq!(new_store(&backend, "wallpaper", "").get(), value);
        }
    }
}

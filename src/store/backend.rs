//! Storage capability behind persisted containers
//!
//! The browser build talks to LocalStorage. Everywhere else (or when the
//! browser denies storage access) entries live in a process-local map, so
//! reads and writes keep working but nothing survives a reload.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// A string-keyed store of serialized values.
pub trait StorageBackend {
    /// Stored payload for `key`, if any.
    fn read(&self, key: &str) -> Option<String>;

    /// Store `payload` under `key`, overwriting any prior entry.
    fn write(&self, key: &str, payload: &str);
}

/// In-memory backend.
///
/// Clones share the same entries, so a second container built over a clone
/// observes earlier writes the way a fresh page load observes LocalStorage.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn write(&self, key: &str, payload: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), payload.to_string());
    }
}

/// LocalStorage-backed entries (WASM only).
#[cfg(target_arch = "wasm32")]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

#[cfg(target_arch = "wasm32")]
impl LocalStorage {
    /// Grab the window's LocalStorage, `None` when the browser withholds it
    /// (private browsing, sandboxed frame, non-window context).
    pub fn obtain() -> Option<Self> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
            .map(|storage| Self { storage })
    }
}

#[cfg(target_arch = "wasm32")]
impl StorageBackend for LocalStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.storage.get_item(key).ok().flatten()
    }

    fn write(&self, key: &str, payload: &str) {
        if self.storage.set_item(key, payload).is_err() {
            log::warn!("LocalStorage write failed for {}", key);
        }
    }
}

/// Pick the storage backend for this environment.
#[cfg(target_arch = "wasm32")]
pub fn detect() -> Rc<dyn StorageBackend> {
    match LocalStorage::obtain() {
        Some(storage) => {
            log::info!("Using LocalStorage backend");
            Rc::new(storage)
        }
        None => {
            log::warn!("LocalStorage unavailable, selections will not persist");
            Rc::new(MemoryStorage::new())
        }
    }
}

/// Pick the storage backend for this environment.
#[cfg(not(target_arch = "wasm32"))]
pub fn detect() -> Rc<dyn StorageBackend> {
    Rc::new(MemoryStorage::new())
}

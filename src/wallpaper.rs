//! Wallpaper selection state
//!
//! A single persisted value tracking which wallpaper the user picked. The
//! empty string means nothing is picked and the page keeps its default
//! background.

use std::rc::Rc;

use crate::store::{Persisted, StorageBackend};

/// LocalStorage key
pub const STORAGE_KEY: &str = "selected-wallpaper";

/// Build the persisted selection over the given backend.
pub fn selection(backend: Rc<dyn StorageBackend>) -> Persisted<String> {
    Persisted::new(STORAGE_KEY, String::new(), backend)
}

/// CSS `background-image` value for a selection, `None` when nothing is
/// picked.
pub fn css_background(selection: &str) -> Option<String> {
    if selection.is_empty() {
        None
    } else {
        Some(format!("url(\"{}\")", selection))
    }
}

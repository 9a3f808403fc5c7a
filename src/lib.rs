//! Wallpick - a wallpaper picker front-end scaffold
//!
//! Core modules:
//! - `store`: Persisted reactive value containers over a storage capability
//! - `wallpaper`: The wallpaper selection and its storage key
//!
//! The binary mounts the page and wires the selection store to the DOM on
//! wasm; native builds run a small store demo instead.

pub mod store;
pub mod wallpaper;

pub use store::{MemoryStorage, Persisted, StorageBackend, StoreError, Subscription};

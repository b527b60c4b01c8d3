// src/watch/mod.rs

//! Filesystem watching.
//!
//! - [`filter`] decides which changed paths are relevant (source extension,
//!   exclude globs).
//! - [`session`] wraps a `notify` watcher registered on one watch set and
//!   hands out relevant events one at a time.
//!
//! This module does not know about builds or processes; it only turns
//! filesystem changes into "something relevant changed at this path".

pub mod filter;
pub mod session;

pub use filter::EventFilter;
pub use session::WatchSession;

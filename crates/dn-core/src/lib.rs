//! Core types for the dirnotify directory watcher.
//!
//! This crate provides the pieces of the watcher that do not touch the
//! filesystem:
//!
//! - [`WatchConfig`] - the directories-plus-latency configuration contract
//! - [`SignalRegistry`] - synchronous, inspectable signal handler dispatch
//! - [`ConfigError`] / [`SignalError`] - errors raised at the call site
//!
//! The monitor in `dn-watcher` snapshots a [`WatchConfig`] every time it
//! (re)starts and consults a [`SignalRegistry`] from inside its event loop,
//! so both types are designed to be edited from one context while another
//! context is blocked watching for changes.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod signal;

// Re-export configuration types
pub use config::{DirectorySpec, WatchConfig};

// Re-export error types
pub use error::{ConfigError, SignalError};

// Re-export signal types
pub use signal::{SignalFlow, SignalId, SignalRegistry};

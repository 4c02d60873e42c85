//! Directory monitor with latency-window coalescing and batched callbacks.
//!
//! This crate provides change detection for a set of directories via the
//! `notify` crate, coalesced over a configurable latency window and
//! delivered as one ordered, de-duplicated callback per burst of activity.
//!
//! # Overview
//!
//! The dn-watcher crate is designed to:
//!
//! - Watch one or more directories recursively for file system changes
//! - Coalesce raw per-path notifications over a latency window (0.5s by
//!   default) into a single batch naming the *directories* that changed
//! - Expose an explicit lifecycle (`start` / `stop` / `restart`) whose
//!   configuration is snapshotted only at (re)start
//! - Route process signals through a synchronous registry consulted by the
//!   event loop instead of an async signal context
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Blocking Thread (spawn_blocking)               │
//! │  ┌────────────┐    ┌──────────────────┐    ┌────────────────┐  │
//! │  │ EventSource │ -> │ PendingChangeSet │ -> │ Callback       │  │
//! │  │ (notify)    │    │ (latency window) │    │ Dispatcher     │  │
//! │  └────────────┘    └──────────────────┘    └───────┬────────┘  │
//! │        ▲                                           │            │
//! └────────│───────────────────────────────────────────│────────────┘
//!          │ subscribe / release            on_change  ▼
//! ┌────────│────────────────────────────────────────────────────────┐
//! │  ┌─────┴──────┐    ┌────────────────┐    ┌─────────────────┐    │
//! │  │ Monitor    │ -> │ WatchConfig    │    │ SignalRegistry  │    │
//! │  │ (lifecycle)│    │ (dirs+latency) │    │ (trap/handle)   │    │
//! │  └────────────┘    └────────────────┘    └─────────────────┘    │
//! │                       Caller's context                          │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use dn_watcher::Monitor;
//! use camino::Utf8PathBuf;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut monitor = Monitor::new(|dirs: &[Utf8PathBuf]| {
//!         println!("Detected change in: {dirs:?}");
//!     });
//!
//!     monitor.set_latency(0.2)?;
//!     monitor.watch(vec!["/tmp".to_owned(), "/var/log".to_owned()]);
//!     monitor.start().await?;
//!
//!     // The monitor runs on its own thread; keep the caller alive however
//!     // suits the application, then shut down cleanly.
//!     tokio::signal::ctrl_c().await?;
//!     monitor.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Signal handling
//!
//! A blocking loop cannot safely let asynchronous signal delivery run user
//! code while it mutates its own state. Register handlers on the
//! [`SignalRegistry`] instead; the loop consults it at a safe point and a
//! handler decides whether monitoring continues:
//!
//! ```
//! use dn_core::{SignalFlow, SignalRegistry};
//!
//! let registry = SignalRegistry::global();
//! registry.trap("INT", || {
//!     tracing::info!("interrupted; shutting down");
//!     SignalFlow::Shutdown
//! })?;
//! # Ok::<(), dn_core::SignalError>(())
//! ```
//!
//! # Error Handling
//!
//! The crate uses [`WatchError`] for all failure cases. Configuration type
//! errors surface from the setters in `dn-core` before `start` is ever
//! involved; subscription failures surface from `start` without touching
//! the lifecycle state; a handler error stops the monitor rather than
//! continuing with state the handler may have left inconsistent.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod dispatch;
pub mod error;
pub mod events;
pub mod handler;
pub mod monitor;
pub mod source;

// Re-export the configuration and signal types alongside the monitor.
pub use dn_core::{
    ConfigError, DirectorySpec, SignalError, SignalFlow, SignalId, SignalRegistry, WatchConfig,
};

// Re-export error types
pub use error::{HandlerError, WatchError};

// Re-export event types
pub use events::PendingChangeSet;

// Re-export handler types
pub use handler::ChangeHandler;

// Re-export dispatch types
pub use dispatch::CallbackDispatcher;

// Re-export watcher types
pub use monitor::Monitor;
pub use source::{EventSource, NotifySource, Subscription};

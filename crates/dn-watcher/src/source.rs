//! The native event source seam.
//!
//! The monitor does not talk to the operating system directly; it subscribes
//! through the [`EventSource`] trait and receives raw changed paths over a
//! channel. [`NotifySource`] is the production implementation backed by the
//! `notify` crate's recommended platform watcher. Tests substitute a
//! scripted source to drive the monitor deterministically.
//!
//! Raw events carry the path the OS reported (usually a file); folding a
//! path down to its changed *directory* is the monitor's job, not the
//! source's.

use std::time::Duration;

use camino::Utf8PathBuf;
use crossbeam_channel::Sender;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{info, trace, warn};

use crate::error::WatchError;

/// An active native subscription.
///
/// The handle is exclusively owned by the monitor that created it; dropping
/// it deregisters the subscription and releases the native resources.
pub trait Subscription: Send {}

/// A native source of raw per-path change notifications.
///
/// Implementations must be [`Send`] and [`Sync`] because the monitor keeps
/// the source across restarts while the loop runs on another thread.
pub trait EventSource: Send + Sync + 'static {
    /// Subscribes to change notifications for the given directories.
    ///
    /// Raw changed paths are delivered on `events` until the returned handle
    /// is dropped. `latency` is a hint for sources that coalesce natively;
    /// the monitor applies its own coalescing window regardless.
    ///
    /// # Errors
    ///
    /// Fails when a directory does not exist or the native watcher cannot be
    /// registered. No subscription is created on error.
    fn subscribe(
        &self,
        directories: &[Utf8PathBuf],
        latency: Duration,
        events: Sender<Utf8PathBuf>,
    ) -> Result<Box<dyn Subscription>, WatchError>;
}

/// Production event source backed by the `notify` crate.
///
/// Watches each directory recursively with the platform's recommended
/// watcher (FSEvents on macOS, inotify on Linux). Non-UTF-8 event paths are
/// logged and skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifySource;

/// Subscription handle holding the live `notify` watcher.
struct NotifySubscription {
    /// Dropping the watcher deregisters every watched path.
    _watcher: RecommendedWatcher,
}

impl Subscription for NotifySubscription {}

impl EventSource for NotifySource {
    fn subscribe(
        &self,
        directories: &[Utf8PathBuf],
        _latency: Duration,
        events: Sender<Utf8PathBuf>,
    ) -> Result<Box<dyn Subscription>, WatchError> {
        // Validate and canonicalize up front so a bad directory fails the
        // whole subscription before anything is registered.
        let mut canonical = Vec::with_capacity(directories.len());
        for directory in directories {
            if !directory.exists() {
                return Err(WatchError::path_not_found(directory.as_path()));
            }
            canonical.push(directory.canonicalize_utf8().map_err(WatchError::Io)?);
        }

        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                match result {
                    Ok(event) => {
                        for path in event.paths {
                            let utf8_path = match Utf8PathBuf::try_from(path) {
                                Ok(p) => p,
                                Err(e) => {
                                    warn!(
                                        path = %e.as_path().display(),
                                        "skipping non-UTF-8 path in change event"
                                    );
                                    continue;
                                }
                            };

                            trace!(path = %utf8_path, "raw change notification");
                            if events.send(utf8_path).is_err() {
                                // The monitor loop is gone; nothing to do
                                // but let the remaining events drop.
                                return;
                            }
                        }
                    }
                    Err(error) => warn!(%error, "native watcher error"),
                }
            })?;

        for directory in &canonical {
            watcher.watch(directory.as_std_path(), RecursiveMode::Recursive)?;
        }

        info!(directories = canonical.len(), "native subscription registered");
        Ok(Box::new(NotifySubscription { _watcher: watcher }))
    }
}

/// Folds a raw event path down to the directory that changed.
///
/// The path itself when it is a directory, otherwise its parent; a bare
/// relative file name with no parent is passed through unchanged.
#[must_use]
pub(crate) fn changed_directory(path: Utf8PathBuf) -> Utf8PathBuf {
    if path.is_dir() {
        path
    } else {
        match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent.to_path_buf(),
            _ => path,
        }
    }
}

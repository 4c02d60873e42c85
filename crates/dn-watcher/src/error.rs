//! Error types for the dn-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while subscribing to the native event source or running the monitor loop.

use camino::Utf8PathBuf;

/// Errors raised by a change handler.
///
/// Handlers return whatever error type suits them; the monitor only needs to
/// carry it back out of the loop.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during directory monitoring.
///
/// Subscription errors ([`WatchError::Notify`], [`WatchError::PathNotFound`],
/// [`WatchError::Io`]) surface synchronously from `start`; the monitor does
/// not transition state when `start` fails. [`WatchError::Handler`] is
/// recorded by the loop when a dispatch fails, after which the monitor is
/// stopped.
///
/// # Examples
///
/// ```
/// use dn_watcher::WatchError;
/// use camino::Utf8PathBuf;
///
/// let err = WatchError::path_not_found("/missing");
/// assert_eq!(err.path().map(|p| p.as_str()), Some("/missing"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to create or register the native watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// A watched directory does not exist.
    #[error("directory does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// `start` was called before any directories were configured.
    ///
    /// An empty directory list is allowed (nothing to watch yet); an unset
    /// one is not.
    #[error("no directories to watch")]
    NoDirectories,

    /// The change handler returned an error during dispatch.
    ///
    /// The loop exits and the monitor transitions to stopped rather than
    /// continuing with state the handler may have left inconsistent.
    #[error("change handler failed: {0}")]
    Handler(#[source] HandlerError),

    /// The event channel was closed while the monitor was still running.
    #[error("event channel closed unexpectedly")]
    ChannelClosed,

    /// An I/O error occurred while validating a watched directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Wraps a handler error.
    #[inline]
    pub fn handler(err: impl Into<HandlerError>) -> Self {
        Self::Handler(err.into())
    }

    /// Returns the directory path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) => Some(path),
            Self::Notify(_)
            | Self::NoDirectories
            | Self::Handler(_)
            | Self::ChannelClosed
            | Self::Io(_) => None,
        }
    }
}

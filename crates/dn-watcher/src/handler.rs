//! The caller-supplied change handler.
//!
//! This module provides the [`ChangeHandler`] trait that watchers implement
//! to receive coalesced change batches. `on_change` is a required method, so
//! "forgot to supply a callback" is a compile error rather than a failure at
//! first dispatch.
//!
//! # Invocation contract
//!
//! The monitor invokes `on_change` once per coalescing window, always from
//! the loop's thread, and never concurrently with itself: there is exactly
//! one in-flight call per monitor instance. The lifecycle hooks
//! [`on_start`](ChangeHandler::on_start) and
//! [`on_stop`](ChangeHandler::on_stop) default to no-ops; overriding them is
//! for logging and side effects only - the state machine itself stays with
//! the monitor.
//!
//! # Examples
//!
//! ```
//! use dn_watcher::{ChangeHandler, HandlerError};
//! use camino::Utf8PathBuf;
//!
//! struct PrintChanges;
//!
//! impl ChangeHandler for PrintChanges {
//!     fn on_change(&mut self, directories: &[Utf8PathBuf]) -> Result<(), HandlerError> {
//!         tracing::info!(?directories, "detected change");
//!         Ok(())
//!     }
//! }
//! ```

use camino::Utf8PathBuf;

use crate::error::HandlerError;

/// Receiver for coalesced directory-change batches.
///
/// Implementations must be [`Send`] and `'static` because they are invoked
/// from the monitor's blocking loop thread.
///
/// An error returned from [`on_change`](Self::on_change) is not retried or
/// suppressed: the loop records it, exits, and the monitor transitions to
/// stopped.
pub trait ChangeHandler: Send + 'static {
    /// Called with the ordered, de-duplicated set of directories that
    /// changed during one coalescing window.
    fn on_change(&mut self, directories: &[Utf8PathBuf]) -> Result<(), HandlerError>;

    /// Called after the monitor subscribed and transitioned to running.
    fn on_start(&mut self, directories: &[Utf8PathBuf]) {
        let _ = directories;
    }

    /// Called as the monitor loop winds down, whatever the reason.
    fn on_stop(&mut self) {}
}

/// Closures can serve as infallible handlers.
///
/// ```
/// use dn_watcher::ChangeHandler;
/// use camino::Utf8PathBuf;
///
/// let mut count = 0usize;
/// let mut handler = move |dirs: &[Utf8PathBuf]| count += dirs.len();
/// handler.on_change(&[Utf8PathBuf::from("/tmp")]).expect("infallible");
/// ```
impl<F> ChangeHandler for F
where
    F: FnMut(&[Utf8PathBuf]) + Send + 'static,
{
    fn on_change(&mut self, directories: &[Utf8PathBuf]) -> Result<(), HandlerError> {
        self(directories);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_closure_handler() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let mut handler = move |dirs: &[Utf8PathBuf]| {
            counter.fetch_add(dirs.len(), Ordering::SeqCst);
        };

        handler
            .on_change(&[Utf8PathBuf::from("/a"), Utf8PathBuf::from("/b")])
            .expect("closure handlers are infallible");
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_default_hooks_are_noops() {
        struct Quiet;
        impl ChangeHandler for Quiet {
            fn on_change(&mut self, _: &[Utf8PathBuf]) -> Result<(), HandlerError> {
                Ok(())
            }
        }

        let mut handler = Quiet;
        handler.on_start(&[Utf8PathBuf::from("/tmp")]);
        handler.on_stop();
    }
}

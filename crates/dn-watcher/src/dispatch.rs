//! Callback dispatch for coalesced change batches.
//!
//! [`CallbackDispatcher`] is the single place `on_change` is invoked from.
//! It drains the [`PendingChangeSet`] *before* calling the handler, so a
//! failing handler can never leave stale directories behind to leak into the
//! next coalescing window.

use tracing::{debug, trace};

use crate::error::WatchError;
use crate::events::PendingChangeSet;
use crate::handler::ChangeHandler;

/// Invokes the change handler with each coalesced batch.
///
/// Batches are dispatched strictly sequentially, in the order their windows
/// close; the dispatcher carries a running count for observability.
#[derive(Debug, Default)]
pub struct CallbackDispatcher {
    /// Number of batches dispatched so far.
    dispatched: u64,
}

impl CallbackDispatcher {
    /// Creates a dispatcher that has dispatched nothing.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of batches dispatched so far.
    #[inline]
    #[must_use]
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Drains `pending` and invokes the handler with the batch.
    ///
    /// An empty set is skipped without touching the handler. The pending set
    /// is cleared before the handler runs, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Propagates the handler's error wrapped in [`WatchError::Handler`];
    /// dispatch errors are never retried or suppressed here.
    pub fn dispatch<H: ChangeHandler>(
        &mut self,
        pending: &mut PendingChangeSet,
        handler: &mut H,
    ) -> Result<(), WatchError> {
        if pending.is_empty() {
            trace!("coalescing window closed with no changes");
            return Ok(());
        }

        let batch = pending.take();
        self.dispatched += 1;
        debug!(
            directories = batch.len(),
            batch = self.dispatched,
            "dispatching coalesced changes"
        );

        handler.on_change(&batch).map_err(WatchError::Handler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use crate::error::HandlerError;

    struct Recording {
        batches: Vec<Vec<Utf8PathBuf>>,
        fail: bool,
    }

    impl ChangeHandler for Recording {
        fn on_change(&mut self, directories: &[Utf8PathBuf]) -> Result<(), HandlerError> {
            self.batches.push(directories.to_vec());
            if self.fail {
                return Err("handler failure".into());
            }
            Ok(())
        }
    }

    #[test]
    fn test_dispatch_passes_ordered_batch() {
        let mut dispatcher = CallbackDispatcher::new();
        let mut handler = Recording {
            batches: Vec::new(),
            fail: false,
        };
        let mut pending = PendingChangeSet::new();
        pending.record(Utf8PathBuf::from("/b"));
        pending.record(Utf8PathBuf::from("/a"));
        pending.record(Utf8PathBuf::from("/b"));

        dispatcher
            .dispatch(&mut pending, &mut handler)
            .expect("handler succeeds");

        assert_eq!(dispatcher.dispatched(), 1);
        assert_eq!(
            handler.batches,
            [[Utf8PathBuf::from("/b"), Utf8PathBuf::from("/a")]]
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn test_empty_window_skips_the_handler() {
        let mut dispatcher = CallbackDispatcher::new();
        let mut handler = Recording {
            batches: Vec::new(),
            fail: false,
        };
        let mut pending = PendingChangeSet::new();

        dispatcher
            .dispatch(&mut pending, &mut handler)
            .expect("nothing to do");
        assert_eq!(dispatcher.dispatched(), 0);
        assert!(handler.batches.is_empty());
    }

    #[test]
    fn test_handler_error_does_not_corrupt_next_window() {
        let mut dispatcher = CallbackDispatcher::new();
        let mut handler = Recording {
            batches: Vec::new(),
            fail: true,
        };
        let mut pending = PendingChangeSet::new();
        pending.record(Utf8PathBuf::from("/tmp"));

        let err = dispatcher.dispatch(&mut pending, &mut handler).unwrap_err();
        assert!(matches!(err, WatchError::Handler(_)));

        // The failed batch was drained; the next window starts clean.
        assert!(pending.is_empty());
        assert!(pending.record(Utf8PathBuf::from("/tmp")));
    }
}

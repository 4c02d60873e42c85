//! Coalescing-window state for the monitor loop.
//!
//! Raw change notifications arrive one path at a time; callers want one
//! callback per burst of activity. [`PendingChangeSet`] is the transient
//! structure that accumulates the directories touched since the current
//! coalescing window opened. The window opens on the first recorded
//! directory and is dispatched (and the set cleared) once the configured
//! latency has elapsed.
//!
//! # Window policy
//!
//! The window deadline is fixed at `latency` seconds after the *first* event
//! of the window. Later events join the window but do not extend it, so a
//! steady stream of changes still produces a callback every `latency`
//! seconds instead of starving the caller.

use camino::Utf8PathBuf;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use std::time::Instant;

/// Directories changed since the current coalescing window opened.
///
/// Records directories in first-observed order and drops duplicates, so the
/// batch handed to the callback is an ordered, de-duplicated sequence.
/// Cleared on every [`take`]; never persisted across windows.
///
/// # Examples
///
/// ```
/// use dn_watcher::PendingChangeSet;
/// use camino::Utf8PathBuf;
///
/// let mut pending = PendingChangeSet::new();
/// pending.record(Utf8PathBuf::from("/tmp"));
/// pending.record(Utf8PathBuf::from("/var/log"));
/// pending.record(Utf8PathBuf::from("/tmp")); // duplicate, dropped
///
/// let batch = pending.take();
/// assert_eq!(batch.len(), 2);
/// assert_eq!(batch[0].as_str(), "/tmp");
/// assert!(pending.is_empty());
/// ```
///
/// [`take`]: PendingChangeSet::take
#[derive(Debug, Default)]
pub struct PendingChangeSet {
    /// Directories in first-observed order.
    order: SmallVec<[Utf8PathBuf; 8]>,

    /// Membership set backing de-duplication.
    seen: FxHashSet<Utf8PathBuf>,

    /// When the first event of the current window arrived.
    opened_at: Option<Instant>,
}

impl PendingChangeSet {
    /// Creates an empty set with no open window.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a changed directory, opening the window on the first one.
    ///
    /// Returns `true` if the directory was new to this window.
    pub fn record(&mut self, directory: Utf8PathBuf) -> bool {
        self.opened_at.get_or_insert_with(Instant::now);
        if self.seen.insert(directory.clone()) {
            self.order.push(directory);
            true
        } else {
            false
        }
    }

    /// Returns when the current window opened, or `None` if no event has
    /// been recorded since the last [`take`](Self::take).
    #[inline]
    #[must_use]
    pub fn opened_at(&self) -> Option<Instant> {
        self.opened_at
    }

    /// Returns the number of distinct directories in the window.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no directory has been recorded.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Drains the set, closing the window.
    ///
    /// Returns the ordered, de-duplicated batch and resets the set so the
    /// next recorded directory opens a fresh window.
    #[must_use]
    pub fn take(&mut self) -> Vec<Utf8PathBuf> {
        self.seen.clear();
        self.opened_at = None;
        std::mem::take(&mut self.order).into_vec()
    }
}

//! Synchronous signal handler registry.
//!
//! A blocking event loop that occupies a thread cannot safely let the
//! platform's asynchronous signal delivery run arbitrary user code while the
//! loop is mutating its own state. [`SignalRegistry`] replaces direct signal
//! trapping with an explicit, inspectable mapping: handlers are registered
//! with [`trap`], and the event loop invokes them itself via [`handle`] at
//! well-defined safe points.
//!
//! A handler returns a [`SignalFlow`] telling the loop whether to keep
//! running; a signal with no registered handler shuts the loop down.
//!
//! # Process-wide registry
//!
//! [`SignalRegistry::global`] returns the lazily-initialized process-wide
//! instance that monitors use by default. Registries can also be created
//! standalone so tests (or embedders running several independent monitors)
//! can substitute an isolated instance.
//!
//! ```
//! use dn_core::{SignalFlow, SignalRegistry};
//!
//! let registry = SignalRegistry::new();
//! registry.trap("INT", || SignalFlow::Shutdown)?;
//!
//! assert!(registry.handles(2)?);
//! assert_eq!(registry.handle(2)?, Some(SignalFlow::Shutdown));
//! # Ok::<(), dn_core::SignalError>(())
//! ```
//!
//! [`trap`]: SignalRegistry::trap
//! [`handle`]: SignalRegistry::handle

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

use crate::error::SignalError;

/// The fixed table of known signals: canonical name to number.
///
/// Numbers follow the common Linux assignment. `EXIT` (0) is included so a
/// process-exit hook can be registered through the same mechanism.
const SIGNALS: &[(&str, i32)] = &[
    ("EXIT", 0),
    ("HUP", 1),
    ("INT", 2),
    ("QUIT", 3),
    ("ILL", 4),
    ("TRAP", 5),
    ("ABRT", 6),
    ("BUS", 7),
    ("FPE", 8),
    ("KILL", 9),
    ("USR1", 10),
    ("SEGV", 11),
    ("USR2", 12),
    ("PIPE", 13),
    ("ALRM", 14),
    ("TERM", 15),
    ("CHLD", 17),
    ("CONT", 18),
    ("STOP", 19),
    ("TSTP", 20),
    ("TTIN", 21),
    ("TTOU", 22),
    ("URG", 23),
    ("XCPU", 24),
    ("XFSZ", 25),
    ("VTALRM", 26),
    ("PROF", 27),
    ("WINCH", 28),
    ("IO", 29),
];

/// What the event loop should do after a signal handler ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalFlow {
    /// Keep the loop running.
    Continue,
    /// Exit the loop and transition the monitor to stopped.
    Shutdown,
}

/// A signal identifier: either a number or a (case-insensitive) name.
///
/// Names are looked up without the `SIG` prefix; a leading `SIG` is accepted
/// and stripped. Both forms canonicalize to the signal number.
///
/// # Examples
///
/// ```
/// use dn_core::{SignalId, SignalRegistry};
///
/// assert_eq!(SignalRegistry::canonicalize("int")?, 2);
/// assert_eq!(SignalRegistry::canonicalize("SIGINT")?, 2);
/// assert_eq!(SignalRegistry::canonicalize(2)?, 2);
/// # Ok::<(), dn_core::SignalError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalId {
    /// A signal number.
    Number(i64),
    /// A signal name such as `"INT"` or `"sigterm"`.
    Name(String),
}

impl SignalId {
    /// Parses a loosely-typed signal identifier.
    ///
    /// # Errors
    ///
    /// Fails with [`SignalError::InvalidType`] for any value that is not an
    /// integer or a string.
    pub fn from_value(value: &Value) -> Result<Self, SignalError> {
        match value {
            Value::Number(n) => n.as_i64().map(Self::Number).ok_or(SignalError::InvalidType),
            Value::String(s) => Ok(Self::Name(s.clone())),
            _ => Err(SignalError::InvalidType),
        }
    }
}

impl From<i32> for SignalId {
    fn from(number: i32) -> Self {
        Self::Number(i64::from(number))
    }
}

impl From<i64> for SignalId {
    fn from(number: i64) -> Self {
        Self::Number(number)
    }
}

impl From<&str> for SignalId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for SignalId {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

/// A registered signal handler.
type Handler = Box<dyn FnMut() -> SignalFlow + Send>;

/// Process-wide mapping from signal number to handler.
///
/// At most one handler is stored per signal; registering again replaces the
/// previous handler (last registration wins). Registration and lookup are
/// atomic with respect to each other.
///
/// # Examples
///
/// ```
/// use dn_core::{SignalFlow, SignalRegistry};
///
/// let registry = SignalRegistry::new();
///
/// // `trap` returns the canonical signal number.
/// let key = registry.trap("TERM", || SignalFlow::Shutdown)?;
/// assert_eq!(key, 15);
///
/// // Unregistered signals are a safe no-op.
/// assert_eq!(registry.handle("HUP")?, None);
/// # Ok::<(), dn_core::SignalError>(())
/// ```
#[derive(Default)]
pub struct SignalRegistry {
    handlers: Mutex<FxHashMap<i32, Handler>>,
}

impl std::fmt::Debug for SignalRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut registered: Vec<i32> = self.handlers.lock().keys().copied().collect();
        registered.sort_unstable();
        f.debug_struct("SignalRegistry")
            .field("registered", &registered)
            .finish()
    }
}

impl SignalRegistry {
    /// Creates an empty, standalone registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry, initializing it on first use.
    #[must_use]
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<SignalRegistry>> = OnceLock::new();
        Arc::clone(GLOBAL.get_or_init(|| Arc::new(Self::new())))
    }

    /// Returns the fixed table of known signals as (name, number) pairs.
    #[inline]
    #[must_use]
    pub fn list() -> &'static [(&'static str, i32)] {
        SIGNALS
    }

    /// Canonicalizes a signal identifier into its number.
    ///
    /// # Errors
    ///
    /// Fails with [`SignalError::UnknownNumber`] or
    /// [`SignalError::UnknownName`] when the identifier is not in the known
    /// signal table.
    pub fn canonicalize(signal: impl Into<SignalId>) -> Result<i32, SignalError> {
        match signal.into() {
            SignalId::Number(number) => SIGNALS
                .iter()
                .find(|(_, value)| i64::from(*value) == number)
                .map(|(_, value)| *value)
                .ok_or(SignalError::UnknownNumber(number)),
            SignalId::Name(name) => {
                let upper = name.trim().to_ascii_uppercase();
                let stripped = upper.strip_prefix("SIG").unwrap_or(&upper);
                SIGNALS
                    .iter()
                    .find(|(known, _)| *known == stripped)
                    .map(|(_, value)| *value)
                    .ok_or(SignalError::UnknownName(name))
            }
        }
    }

    /// Registers a handler for the given signal, replacing any prior one.
    ///
    /// Returns the canonical signal number the handler was stored under.
    ///
    /// # Errors
    ///
    /// Fails with the canonicalization errors for unknown signals; the
    /// registry is left untouched on error.
    pub fn trap(
        &self,
        signal: impl Into<SignalId>,
        handler: impl FnMut() -> SignalFlow + Send + 'static,
    ) -> Result<i32, SignalError> {
        let key = Self::canonicalize(signal)?;
        self.handlers.lock().insert(key, Box::new(handler));
        Ok(key)
    }

    /// Registers a handler for a loosely-typed signal identifier.
    ///
    /// # Errors
    ///
    /// Fails with [`SignalError::InvalidType`] for values that are neither
    /// integers nor strings, and with the canonicalization errors otherwise.
    pub fn trap_value(
        &self,
        value: &Value,
        handler: impl FnMut() -> SignalFlow + Send + 'static,
    ) -> Result<i32, SignalError> {
        self.trap(SignalId::from_value(value)?, handler)
    }

    /// Returns `true` if a handler is registered for the signal.
    ///
    /// # Errors
    ///
    /// Fails when the identifier itself is not a known signal.
    pub fn handles(&self, signal: impl Into<SignalId>) -> Result<bool, SignalError> {
        let key = Self::canonicalize(signal)?;
        Ok(self.handlers.lock().contains_key(&key))
    }

    /// Invokes the handler registered for the signal, if any.
    ///
    /// Returns the handler's [`SignalFlow`], or `None` (a safe no-op) when no
    /// handler is registered. The handler runs outside the registry lock so
    /// it may call back into the registry; a handler that re-registers its
    /// own signal wins over the handler being put back.
    ///
    /// # Errors
    ///
    /// Fails only when the identifier itself is not a known signal.
    pub fn handle(&self, signal: impl Into<SignalId>) -> Result<Option<SignalFlow>, SignalError> {
        let key = Self::canonicalize(signal)?;
        let handler = self.handlers.lock().remove(&key);
        let Some(mut handler) = handler else {
            return Ok(None);
        };

        let flow = handler();
        self.handlers.lock().entry(key).or_insert(handler);
        Ok(Some(flow))
    }
}

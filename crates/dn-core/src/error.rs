//! Error types for the dn-core crate.
//!
//! This module provides [`ConfigError`] for invalid watch configuration input
//! and [`SignalError`] for invalid signal identifiers passed to the registry.
//! Both are raised synchronously from the setter or registration call, never
//! deferred to `start`.

/// Errors that can occur while setting watch configuration values.
///
/// The message text for the two type errors is part of the public contract:
/// callers feeding loosely-typed input (for example values read from a JSON
/// config file) match on it in their own diagnostics.
///
/// # Examples
///
/// ```
/// use dn_core::ConfigError;
///
/// let err = ConfigError::InvalidDirectories;
/// assert_eq!(
///     err.to_string(),
///     "directories must be given as a String or an Array of strings"
/// );
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The directories value is neither a string, an array of strings,
    /// nor the explicit "unset" sentinel.
    #[error("directories must be given as a String or an Array of strings")]
    InvalidDirectories,

    /// The latency value is not a number.
    #[error("latency must be a Numeric value")]
    NonNumericLatency,

    /// The latency value is numeric but negative (or NaN).
    ///
    /// Latency is a coalescing window length, so it must be a non-negative
    /// number of seconds.
    #[error("latency must be non-negative, got {0}")]
    NegativeLatency(f64),
}

impl ConfigError {
    /// Returns `true` if this error came from a directories value.
    #[inline]
    #[must_use]
    pub const fn is_directories(&self) -> bool {
        matches!(self, Self::InvalidDirectories)
    }

    /// Returns `true` if this error came from a latency value.
    #[inline]
    #[must_use]
    pub const fn is_latency(&self) -> bool {
        matches!(self, Self::NonNumericLatency | Self::NegativeLatency(_))
    }
}

/// Errors that can occur while registering or looking up a signal handler.
///
/// A signal is identified either by its number or by its (case-insensitive)
/// name; anything outside the registry's fixed signal table is rejected.
///
/// # Examples
///
/// ```
/// use dn_core::{SignalError, SignalRegistry};
///
/// let registry = SignalRegistry::new();
/// let err = registry.handles("bogus-name").unwrap_err();
/// assert!(matches!(err, SignalError::UnknownName(_)));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// The numeric value does not match any known signal.
    #[error("invalid signal number {0}; see SignalRegistry::list for valid signals")]
    UnknownNumber(i64),

    /// The name does not match any known signal.
    #[error("invalid signal name {0:?}; see SignalRegistry::list for valid signals")]
    UnknownName(String),

    /// The value is neither an integer nor a string name.
    #[error("signal must be given as an integer or a string name")]
    InvalidType,
}

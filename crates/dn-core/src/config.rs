//! Watch configuration for the dirnotify monitor.
//!
//! This module provides [`WatchConfig`], the single source of truth for which
//! directories are watched and how long the coalescing window is, plus
//! [`DirectorySpec`], the tagged input type for the directories setter.
//!
//! The monitor snapshots a [`WatchConfig`] at `start`/`restart` time; edits
//! made while monitoring is active only take effect at the next (re)start.
//!
//! # Typed and dynamic input
//!
//! The typed setters ([`WatchConfig::set_directories`],
//! [`WatchConfig::set_latency`]) make shape errors impossible at compile
//! time. For callers holding loosely-typed input - a JSON config file, a
//! scripting bridge - the `*_value` variants accept a [`serde_json::Value`]
//! and reproduce the classic runtime type errors:
//!
//! ```
//! use dn_core::WatchConfig;
//! use serde_json::json;
//!
//! let mut config = WatchConfig::default();
//! let err = config.set_directories_value(&json!({"a": 1})).unwrap_err();
//! assert_eq!(
//!     err.to_string(),
//!     "directories must be given as a String or an Array of strings"
//! );
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::error::ConfigError;

/// Default coalescing latency in seconds.
pub const DEFAULT_LATENCY: f64 = 0.5;

/// Directories input for [`WatchConfig::set_directories`].
///
/// Models the three accepted shapes as a tagged union: a single path
/// (normalized to a one-element list), a list of paths, or the explicit
/// "unset" sentinel that clears the configuration.
///
/// # Examples
///
/// ```
/// use dn_core::{DirectorySpec, WatchConfig};
///
/// let mut config = WatchConfig::default();
///
/// // A single path becomes a one-element list.
/// config.set_directories("/tmp");
/// assert_eq!(config.directories().map(<[_]>::len), Some(1));
///
/// // The unset sentinel clears it.
/// config.set_directories(DirectorySpec::Unset);
/// assert!(config.directories().is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectorySpec {
    /// No directories configured (distinct from an empty list).
    Unset,
    /// A single directory.
    One(Utf8PathBuf),
    /// A list of directories. Duplicates are allowed; order is preserved.
    Many(Vec<Utf8PathBuf>),
}

impl DirectorySpec {
    /// Normalizes the spec into the stored representation.
    #[must_use]
    fn into_directories(self) -> Option<Vec<Utf8PathBuf>> {
        match self {
            Self::Unset => None,
            Self::One(path) => Some(vec![path]),
            Self::Many(paths) => Some(paths),
        }
    }

    /// Parses a loosely-typed directories value.
    ///
    /// Accepts a string, an array of strings, or null (unset). Any other
    /// shape - and any array containing a non-string - fails with
    /// [`ConfigError::InvalidDirectories`].
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        match value {
            Value::Null => Ok(Self::Unset),
            Value::String(s) => Ok(Self::One(Utf8PathBuf::from(s))),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(Utf8PathBuf::from(s)),
                    _ => Err(ConfigError::InvalidDirectories),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Self::Many),
            _ => Err(ConfigError::InvalidDirectories),
        }
    }
}

impl From<&str> for DirectorySpec {
    fn from(path: &str) -> Self {
        Self::One(Utf8PathBuf::from(path))
    }
}

impl From<String> for DirectorySpec {
    fn from(path: String) -> Self {
        Self::One(Utf8PathBuf::from(path))
    }
}

impl From<&Utf8Path> for DirectorySpec {
    fn from(path: &Utf8Path) -> Self {
        Self::One(path.to_path_buf())
    }
}

impl From<Utf8PathBuf> for DirectorySpec {
    fn from(path: Utf8PathBuf) -> Self {
        Self::One(path)
    }
}

impl From<Vec<Utf8PathBuf>> for DirectorySpec {
    fn from(paths: Vec<Utf8PathBuf>) -> Self {
        Self::Many(paths)
    }
}

impl From<Vec<String>> for DirectorySpec {
    fn from(paths: Vec<String>) -> Self {
        Self::Many(paths.into_iter().map(Utf8PathBuf::from).collect())
    }
}

impl From<&[&str]> for DirectorySpec {
    fn from(paths: &[&str]) -> Self {
        Self::Many(paths.iter().map(Utf8PathBuf::from).collect())
    }
}

impl From<Option<Vec<Utf8PathBuf>>> for DirectorySpec {
    fn from(paths: Option<Vec<Utf8PathBuf>>) -> Self {
        paths.map_or(Self::Unset, Self::Many)
    }
}

/// Configuration for the directory monitor.
///
/// Holds the set of directories to watch and the coalescing latency. The
/// latency is the length of the window over which raw change notifications
/// are merged into a single callback.
///
/// # Invariants
///
/// - `directories` is either unset or a list of paths; the list may be empty
///   ("nothing to watch yet").
/// - `latency` is always a finite, non-negative number of seconds.
///
/// # Examples
///
/// ```
/// use dn_core::WatchConfig;
///
/// let mut config = WatchConfig::default();
/// assert!(config.directories().is_none());
/// assert_eq!(config.latency(), 0.5);
///
/// config.set_directories(vec!["/tmp".to_owned(), "/var/log".to_owned()]);
/// config.set_latency(0.1)?;
/// assert_eq!(config.directories().map(<[_]>::len), Some(2));
/// # Ok::<(), dn_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Watched directories, or `None` when not yet configured.
    directories: Option<Vec<Utf8PathBuf>>,

    /// Coalescing window in seconds.
    latency: f64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            directories: None,
            latency: DEFAULT_LATENCY,
        }
    }
}

impl WatchConfig {
    /// Creates a configuration with no directories and the default latency.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a configuration from loosely-typed positional arguments.
    ///
    /// Arguments may appear in either order and are disambiguated by type:
    /// a number sets the latency, a string/array/null sets the directories.
    /// This mirrors constructors of the form `new(directories, latency)`
    /// where either argument may be omitted.
    ///
    /// # Errors
    ///
    /// Returns the same typed errors as the `*_value` setters. An argument
    /// that is neither numeric nor directories-shaped is reported as a
    /// directories error for the first such argument and as a latency error
    /// once directories have been consumed, matching the fixed validation
    /// order of the setters.
    ///
    /// # Examples
    ///
    /// ```
    /// use dn_core::WatchConfig;
    /// use serde_json::json;
    ///
    /// let a = WatchConfig::from_values(&[json!(["/tmp"]), json!(0.2)])?;
    /// let b = WatchConfig::from_values(&[json!(0.2), json!(["/tmp"])])?;
    /// assert_eq!(a, b);
    /// # Ok::<(), dn_core::ConfigError>(())
    /// ```
    pub fn from_values(values: &[Value]) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let mut saw_directories = false;

        for value in values {
            if value.is_number() {
                config.set_latency_value(value)?;
            } else if matches!(value, Value::Null | Value::String(_) | Value::Array(_)) {
                config.set_directories_value(value)?;
                saw_directories = true;
            } else if saw_directories {
                return Err(ConfigError::NonNumericLatency);
            } else {
                return Err(ConfigError::InvalidDirectories);
            }
        }

        Ok(config)
    }

    /// Sets the directories to watch.
    ///
    /// A single path is normalized to a one-element list;
    /// [`DirectorySpec::Unset`] clears the configuration. Returns the
    /// normalized list (or `None` when cleared) for caller visibility.
    ///
    /// Takes effect at the next monitor `start`/`restart`.
    pub fn set_directories(&mut self, spec: impl Into<DirectorySpec>) -> Option<&[Utf8PathBuf]> {
        self.directories = spec.into().into_directories();
        self.directories()
    }

    /// Sets the directories from a loosely-typed value.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::InvalidDirectories`] ("directories must be
    /// given as a String or an Array of strings") for any value that is not
    /// a string, an array of strings, or null.
    pub fn set_directories_value(
        &mut self,
        value: &Value,
    ) -> Result<Option<&[Utf8PathBuf]>, ConfigError> {
        let spec = DirectorySpec::from_value(value)?;
        Ok(self.set_directories(spec))
    }

    /// Returns the configured directories, or `None` when unset.
    #[inline]
    #[must_use]
    pub fn directories(&self) -> Option<&[Utf8PathBuf]> {
        self.directories.as_deref()
    }

    /// Sets the coalescing latency in seconds.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::NegativeLatency`] when the value is negative
    /// or NaN; the latency invariant requires a non-negative number.
    pub fn set_latency(&mut self, latency: f64) -> Result<(), ConfigError> {
        if !latency.is_finite() || latency < 0.0 {
            return Err(ConfigError::NegativeLatency(latency));
        }
        self.latency = latency;
        Ok(())
    }

    /// Sets the latency from a loosely-typed value.
    ///
    /// # Errors
    ///
    /// Fails with [`ConfigError::NonNumericLatency`] ("latency must be a
    /// Numeric value") for any non-numeric value, and with
    /// [`ConfigError::NegativeLatency`] for negative numbers.
    pub fn set_latency_value(&mut self, value: &Value) -> Result<(), ConfigError> {
        let latency = value.as_f64().ok_or(ConfigError::NonNumericLatency)?;
        self.set_latency(latency)
    }

    /// Returns the coalescing latency in seconds.
    #[inline]
    #[must_use]
    pub fn latency(&self) -> f64 {
        self.latency
    }

    /// Returns the latency as a [`Duration`].
    ///
    /// The setter invariant guarantees a non-negative finite value, so the
    /// conversion cannot fail in practice; out-of-range values collapse to
    /// zero.
    #[inline]
    #[must_use]
    pub fn latency_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.latency).unwrap_or(Duration::ZERO)
    }
}

//! # Configuration Error Types
//!
//! Pool misuse never shows up here: it is fatal. These are the only
//! recoverable failures the crate has, all raised while loading or
//! installing the allocation config at startup.

use thiserror::Error;

use crate::config::Strategy;

/// Errors that can occur while loading or installing an [`AllocConfig`].
///
/// [`AllocConfig`]: crate::config::AllocConfig
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {reason}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying I/O error message.
        reason: String,
    },

    /// The config file is not valid TOML or has unexpected keys.
    #[error("invalid configuration: {0}")]
    Parse(String),

    /// A strategy name that is neither `arena` nor `system`.
    #[error("unknown allocation strategy: {0:?}")]
    UnknownStrategy(String),

    /// The arena strategy was requested in a build without arena storage.
    #[error("arena strategy is not available in sanitizer builds")]
    ArenaUnavailable,

    /// A config was already installed, or the build default was latched by
    /// an earlier allocation.
    #[error("allocation config already active with strategy {active}")]
    AlreadyInstalled {
        /// Strategy currently in effect.
        active: Strategy,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

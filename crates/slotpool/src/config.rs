//! # Allocation Configuration
//!
//! Selects how every declared pool is backed. There is exactly one switch
//! and it is process-wide:
//!
//! - `arena`: each pooled type gets its own fixed [`SlotPool`] (default)
//! - `system`: pools forward to the process allocator through
//!   [`SystemPool`] so sanitizers see real heap addresses
//!
//! The build default follows the `sanitizer` cargo feature. A server may
//! override it once at startup, before the first pooled allocation:
//!
//! ```rust,ignore
//! let config = AllocConfig::load("config/alloc.toml")?;
//! slotpool::config::install(config)?;
//! ```
//!
//! [`SlotPool`]: crate::memory::SlotPool
//! [`SystemPool`]: crate::memory::SystemPool

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

/// Backing strategy for declared pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Fixed slot arena with in-use tracking and fatal misuse checks.
    Arena,
    /// Forward to the process allocator; ids are ignored.
    System,
}

impl Strategy {
    /// Strategy used when nothing is installed.
    pub const BUILD_DEFAULT: Self = if cfg!(feature = "sanitizer") {
        Self::System
    } else {
        Self::Arena
    };

    /// Config-file name of this strategy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Arena => "arena",
            Self::System => "system",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "arena" => Ok(Self::Arena),
            "system" => Ok(Self::System),
            other => Err(ConfigError::UnknownStrategy(other.to_owned())),
        }
    }
}

/// Process-wide allocation settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocConfig {
    /// How declared pools are backed.
    pub strategy: Strategy,
}

impl AllocConfig {
    /// Creates a config with the given strategy.
    #[must_use]
    pub const fn new(strategy: Strategy) -> Self {
        Self { strategy }
    }

    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML, unknown keys or an
    /// unknown strategy name.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads and parses a TOML config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise
    /// anything [`AllocConfig::from_toml_str`] returns.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml_str(&text)
    }
}

impl Default for AllocConfig {
    fn default() -> Self {
        Self::new(Strategy::BUILD_DEFAULT)
    }
}

static ACTIVE: OnceLock<AllocConfig> = OnceLock::new();

/// Installs the process-wide config.
///
/// Must run before the first pooled allocation: the first allocation
/// latches whatever is active, and a pool never changes backing after that.
///
/// # Errors
///
/// Returns [`ConfigError::ArenaUnavailable`] for [`Strategy::Arena`] in a
/// `sanitizer` build, and [`ConfigError::AlreadyInstalled`] if a config is
/// already active.
pub fn install(config: AllocConfig) -> ConfigResult<()> {
    let strategy = config.strategy;
    if cfg!(feature = "sanitizer") && strategy == Strategy::Arena {
        return Err(ConfigError::ArenaUnavailable);
    }
    ACTIVE.set(config).map_err(|_| ConfigError::AlreadyInstalled {
        active: active().strategy,
    })?;
    tracing::debug!(%strategy, "allocation config installed");
    Ok(())
}

/// Returns the active config, latching the build default if none was
/// installed.
pub fn active() -> &'static AllocConfig {
    ACTIVE.get_or_init(|| {
        tracing::debug!(strategy = %Strategy::BUILD_DEFAULT, "allocation config defaulted");
        AllocConfig::default()
    })
}

/// Returns the active strategy.
#[inline]
#[must_use]
pub fn strategy() -> Strategy {
    active().strategy
}

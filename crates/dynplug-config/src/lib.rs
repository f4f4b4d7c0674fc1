#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Installer settings for the dynamic plugins installer.
//!
//! This crate provides a single [`InstallerConfig`] type holding everything
//! the installer pipeline needs besides the manifest itself: the per-entry
//! extraction ceiling, the integrity-check switch, and logging preferences.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dynplug_config::InstallerConfig;
//!
//! let config = InstallerConfig::from_env_with(|config| {
//!     config.skip_integrity_check = true;
//! })
//! .unwrap();
//! println!("max entry size: {}", config.max_entry_size);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Command-line flags** (applied through the `from_*_with` closure)
//! 2. **Environment variables** (`MAX_ENTRY_SIZE`, `SKIP_INTEGRITY_CHECK`,
//!    `DYNAMIC_PLUGINS_LOG_LEVEL`, `DYNAMIC_PLUGINS_LOG_FORMAT`)
//! 3. **Built-in defaults**
//!
//! # Design
//!
//! This crate has **no dependencies on other internal dynplug crates**.
//! Conversion into domain types (`InstallOptions`, `LogConfig`) happens at the
//! CLI boundary.

/// Environment variable fallback resolution.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

// Re-export primary types at the crate root.
pub use error::{ConfigError, ConfigResult};
pub use types::*;

impl InstallerConfig {
    /// Load configuration from the process environment, then let `overrides`
    /// adjust it before validation.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if an environment variable holds a value of
    /// the wrong shape or the final configuration fails validation.
    pub fn from_env_with(overrides: impl FnOnce(&mut Self)) -> ConfigResult<Self> {
        Self::from_vars_with(&env::collect_env_vars(), overrides)
    }

    /// Load configuration from an explicit set of variables, then let
    /// `overrides` adjust it before validation.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if a variable holds a value of the wrong
    /// shape or the final configuration fails validation.
    pub fn from_vars_with(
        vars: &std::collections::HashMap<String, String>,
        overrides: impl FnOnce(&mut Self),
    ) -> ConfigResult<Self> {
        let mut config = Self::default();
        env::apply_env_fallbacks(&mut config, vars)?;
        overrides(&mut config);
        validate::validate(&config)?;
        Ok(config)
    }
}

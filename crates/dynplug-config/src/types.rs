//! Configuration types for the installer.
//!
//! Every struct implements [`Default`] with the production defaults, so an
//! empty environment yields a working configuration.

use serde::{Deserialize, Serialize};

/// Default per-entry extraction ceiling (20 MB).
pub const DEFAULT_MAX_ENTRY_SIZE: u64 = 20_000_000;

// ---------------------------------------------------------------------------
// Top-level InstallerConfig
// ---------------------------------------------------------------------------

/// Root configuration for one installer run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Largest size in bytes any single archive entry may declare.
    pub max_entry_size: u64,
    /// Skip integrity verification for every package.
    pub skip_integrity_check: bool,
    /// Logging level and format.
    pub logging: LoggingSection,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            max_entry_size: DEFAULT_MAX_ENTRY_SIZE,
            skip_integrity_check: false,
            logging: LoggingSection::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
        }
    }
}

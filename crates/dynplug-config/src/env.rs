//! Environment variable fallbacks.
//!
//! The installer historically reads its knobs straight from the container
//! environment, so the variable names are fixed and unprefixed.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::types::InstallerConfig;

/// Per-entry size ceiling in bytes.
pub const MAX_ENTRY_SIZE_VAR: &str = "MAX_ENTRY_SIZE";
/// `true` (any case) disables integrity verification.
pub const SKIP_INTEGRITY_CHECK_VAR: &str = "SKIP_INTEGRITY_CHECK";
/// Log level override.
pub const LOG_LEVEL_VAR: &str = "DYNAMIC_PLUGINS_LOG_LEVEL";
/// Log format override.
pub const LOG_FORMAT_VAR: &str = "DYNAMIC_PLUGINS_LOG_FORMAT";

/// Snapshot the variables this crate understands from the process
/// environment.
#[must_use]
pub fn collect_env_vars() -> HashMap<String, String> {
    [
        MAX_ENTRY_SIZE_VAR,
        SKIP_INTEGRITY_CHECK_VAR,
        LOG_LEVEL_VAR,
        LOG_FORMAT_VAR,
    ]
    .into_iter()
    .filter_map(|name| std::env::var(name).ok().map(|v| (name.to_owned(), v)))
    .collect()
}

/// Overlay environment values onto `config`.
///
/// Returns the number of variables applied.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if `MAX_ENTRY_SIZE` is not an
/// unsigned integer.
pub fn apply_env_fallbacks(
    config: &mut InstallerConfig,
    vars: &HashMap<String, String>,
) -> ConfigResult<usize> {
    let mut applied = 0usize;

    if let Some(raw) = non_empty(vars, MAX_ENTRY_SIZE_VAR) {
        config.max_entry_size = raw.parse().map_err(|e| ConfigError::InvalidValue {
            var: MAX_ENTRY_SIZE_VAR.to_owned(),
            value: raw.to_owned(),
            message: format!("expected a size in bytes: {e}"),
        })?;
        applied = applied.saturating_add(1);
    }

    if let Some(raw) = non_empty(vars, SKIP_INTEGRITY_CHECK_VAR) {
        config.skip_integrity_check = raw.eq_ignore_ascii_case("true");
        applied = applied.saturating_add(1);
    }

    if let Some(raw) = non_empty(vars, LOG_LEVEL_VAR) {
        raw.to_ascii_lowercase().clone_into(&mut config.logging.level);
        applied = applied.saturating_add(1);
    }

    if let Some(raw) = non_empty(vars, LOG_FORMAT_VAR) {
        raw.to_ascii_lowercase().clone_into(&mut config.logging.format);
        applied = applied.saturating_add(1);
    }

    if applied > 0 {
        debug!(count = applied, "applied environment overrides");
    }
    Ok(applied)
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

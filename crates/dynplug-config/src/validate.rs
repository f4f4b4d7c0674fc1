//! Post-load configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::InstallerConfig;

/// Validate a fully loaded configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &InstallerConfig) -> ConfigResult<()> {
    validate_limits(config)?;
    validate_logging(config)?;
    Ok(())
}

fn validate_limits(config: &InstallerConfig) -> ConfigResult<()> {
    if config.max_entry_size == 0 {
        return Err(ConfigError::ValidationError {
            field: "max_entry_size".to_owned(),
            message: "max_entry_size must be greater than zero".to_owned(),
        });
    }
    Ok(())
}

fn validate_logging(config: &InstallerConfig) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        });
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        });
    }

    Ok(())
}

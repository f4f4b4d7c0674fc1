use thiserror::Error;

/// Errors raised while loading or validating installer settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable could not be interpreted.
    #[error("invalid value for {var}: '{value}' ({message})")]
    InvalidValue {
        /// Name of the environment variable.
        var: String,
        /// The raw value that was rejected.
        value: String,
        /// Why the value was rejected.
        message: String,
    },

    /// A loaded field is outside its accepted range.
    #[error("invalid config field {field}: {message}")]
    ValidationError {
        /// Dotted field path (e.g. `logging.level`).
        field: String,
        /// Why the field is invalid.
        message: String,
    },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

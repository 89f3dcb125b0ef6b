//! Error types for the settings resolver.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving settings.
#[derive(Error, Debug)]
pub enum Error {
    /// Catch-all wrapper applied when construction fails at process startup
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A resolved value failed a domain rule (unknown region, bad domain name)
    #[error("Value error: {0}")]
    Value(String),

    /// Schema-level validation failure
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Version artifact could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

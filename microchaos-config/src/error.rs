//! Configuration error types

use thiserror::Error;

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
///
/// All of these are fatal: they are reported once and abort the run
/// before any request is fired.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Base URL or custom endpoint failed to parse
    #[error("Invalid URL: {0}")]
    UrlError(#[from] url::ParseError),

    /// Endpoint slug is not one of the known names and not `custom:<path>`
    #[error("Invalid endpoint '{0}'. Use 'home', 'shop', 'cart', 'checkout', or 'custom:/your/path'")]
    InvalidEndpoint(String),

    /// Body referenced a file that could not be read
    #[error("Body file not found: {path}: {source}")]
    BodyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Unknown HTTP method string
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// Domain-specific validation error
    #[error("Configuration error in {domain}: {message}")]
    DomainError { domain: String, message: String },
}

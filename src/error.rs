//! Error types for ddns-watch.

use thiserror::Error;

/// Result type alias for ddns-watch.
pub type Result<T> = std::result::Result<T, DdnsError>;

/// DDNS error types.
#[derive(Error, Debug)]
pub enum DdnsError {
    /// Configuration error. Fatal at startup.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network/HTTP transport error.
    #[error("Network error: {0}")]
    Network(String),

    /// The address-reporting service answered with something that is not an address.
    #[error("Failed to parse public address: {0}")]
    Parse(String),

    /// Name lookup failed or was ambiguous.
    #[error("Lookup failed for {name}: {message}")]
    Lookup { name: String, message: String },

    /// A resolved address carried a port that could not be split off.
    #[error("Failed to split host from address {0}")]
    Split(String),

    /// The update URL could not be built from the template.
    #[error("Failed to build {provider} request: {message}")]
    RequestBuild { provider: String, message: String },

    /// The provider answered with a non-200 status.
    #[error("Unexpected status from {provider}: {status}")]
    UnexpectedStatus { provider: String, status: u16 },

    /// The provider answered 200 without the confirmation token.
    #[error("Unexpected response from {provider}: {body}")]
    ResponseBody { provider: String, body: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl DdnsError {
    /// Whether the error is a response validation failure (bad status or body).
    pub fn is_response_validation(&self) -> bool {
        matches!(
            self,
            DdnsError::UnexpectedStatus { .. } | DdnsError::ResponseBody { .. }
        )
    }
}

impl From<reqwest::Error> for DdnsError {
    fn from(e: reqwest::Error) -> Self {
        DdnsError::Network(e.to_string())
    }
}

impl From<toml::de::Error> for DdnsError {
    fn from(e: toml::de::Error) -> Self {
        DdnsError::Config(e.to_string())
    }
}

impl From<toml::ser::Error> for DdnsError {
    fn from(e: toml::ser::Error) -> Self {
        DdnsError::Serialization(e.to_string())
    }
}

impl From<serde_json::Error> for DdnsError {
    fn from(e: serde_json::Error) -> Self {
        DdnsError::Serialization(e.to_string())
    }
}

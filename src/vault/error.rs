//! Error types for Vault client setup and logical API calls.

use thiserror::Error;

/// Result type for Vault backend operations.
pub type Result<T> = std::result::Result<T, VaultApiError>;

/// Errors raised by a backend handle or while constructing one.
#[derive(Error, Debug)]
pub enum VaultApiError {
    /// Vault answered with a non-success status.
    #[error("Vault returned status {status}: {}", format_errors(.errors))]
    Status { status: u16, errors: Vec<String> },

    /// The request never produced a response (DNS, TLS, connection reset, timeout).
    #[error("HTTP request to Vault failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not a valid Vault response envelope.
    #[error("Failed to decode Vault response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The caller cancelled the operation before Vault answered.
    #[error("Vault request cancelled")]
    Cancelled,

    /// The configured server address cannot be used to build request URLs.
    #[error("Invalid Vault address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The resource path cannot be placed under the `/v1/` API prefix.
    #[error("Invalid Vault path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// A custom request header from the provider configuration is not valid HTTP.
    #[error("Invalid request header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The provider block failed validation.
    #[error("Invalid provider configuration: {0}")]
    InvalidProvider(#[from] validator::ValidationErrors),

    /// No usable credential could be resolved from the provider configuration.
    #[error("Vault credentials unavailable: {message}")]
    Credentials { message: String },

    /// An auth method login was rejected or failed.
    #[error("Vault {method} login failed: {message}")]
    Login { method: &'static str, message: String },

    /// Reading a CA bundle or credential file failed.
    #[error("Failed to read {what} from {path}: {source}")]
    Io {
        what: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },
}

fn format_errors(errors: &[String]) -> String {
    if errors.is_empty() {
        "no error details".to_string()
    } else {
        errors.join("; ")
    }
}

impl VaultApiError {
    /// Create an invalid address error.
    pub fn invalid_address(address: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAddress { address: address.into(), reason: reason.into() }
    }

    /// Create an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath { path: path.into(), reason: reason.into() }
    }

    /// Create a credentials error.
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials { message: message.into() }
    }

    /// Create a login error for the named auth method.
    pub fn login(method: &'static str, message: impl Into<String>) -> Self {
        Self::Login { method, message: message.into() }
    }

    /// Status code returned by Vault, if the failure came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

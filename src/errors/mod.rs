//! # Error Handling
//!
//! Crate-level error type. Generation failures keep their own taxonomy in
//! [`GeneratorError`] and are wrapped here only at the application boundary.

use crate::generator::GeneratorError;

/// Custom result type for dynsecret operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dynsecret
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Secret generation errors
    #[error(transparent)]
    Generator(#[from] GeneratorError),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string()))
                    .collect();
                format!("{}: {}", field, messages.join(", "))
            })
            .collect::<Vec<_>>();
        fields.sort();
        Self::Validation(fields.join("; "))
    }
}

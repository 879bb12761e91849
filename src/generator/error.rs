//! Error taxonomy for secret generation.
//!
//! Every variant is terminal for the invocation: nothing is retried here and
//! no partial output accompanies an error. The host decides on retry policy.

use thiserror::Error;

use super::spec::{Operation, ResultShape};
use crate::vault::VaultApiError;

/// Result type for generator operations.
pub type Result<T> = std::result::Result<T, GeneratorError>;

/// Errors produced while turning a payload into generated secret data.
#[derive(Error, Debug)]
pub enum GeneratorError {
    /// The host supplied no payload.
    #[error("no config spec provided")]
    MissingSpec,

    /// The payload is not a well-formed request.
    #[error("unable to parse spec: {0}")]
    SpecParse(#[source] serde_yaml::Error),

    /// The request has no `provider` block.
    #[error("no Vault provider config in spec")]
    MissingProviderConfig,

    /// No usable backend handle could be built for the provider.
    #[error("unable to setup Vault client: {0}")]
    ClientSetup(#[source] VaultApiError),

    /// `parameters` on a write is not a key/value document.
    #[error("unable to decode parameters for write to '{path}': {source}")]
    ParameterDecode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The backend call itself failed.
    #[error("unable to get dynamic secret: {operation} '{path}' failed: {source}")]
    BackendCall {
        path: String,
        operation: Operation,
        #[source]
        source: VaultApiError,
    },

    /// The call succeeded with no response and empty results are not allowed.
    #[error("unable to get dynamic secret: empty response from Vault for '{path}'")]
    EmptyBackendResponse { path: String },

    /// Re-encoding the selected part of the response failed.
    #[error("unable to encode {shape} response: {source}")]
    ResponseEncode {
        shape: ResultShape,
        #[source]
        source: serde_json::Error,
    },

    /// A source value has a type the value encoding cannot turn into bytes.
    #[error("unable to convert value of key '{key}': unsupported {kind} value")]
    ValueConversion { key: String, kind: &'static str },
}

impl GeneratorError {
    /// Create a backend call error.
    pub fn backend_call(path: impl Into<String>, operation: Operation, source: VaultApiError) -> Self {
        Self::BackendCall { path: path.into(), operation, source }
    }

    /// Create an empty backend response error.
    pub fn empty_response(path: impl Into<String>) -> Self {
        Self::EmptyBackendResponse { path: path.into() }
    }

    /// Create a value conversion error.
    pub fn value_conversion(key: impl Into<String>, kind: &'static str) -> Self {
        Self::ValueConversion { key: key.into(), kind }
    }

    /// Stable taxonomy name, used as the `error_kind` log field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingSpec => "MissingSpec",
            Self::SpecParse(_) => "SpecParseError",
            Self::MissingProviderConfig => "MissingProviderConfig",
            Self::ClientSetup(_) => "ClientSetupError",
            Self::ParameterDecode { .. } => "ParameterDecodeError",
            Self::BackendCall { .. } => "BackendCallError",
            Self::EmptyBackendResponse { .. } => "EmptyBackendResponse",
            Self::ResponseEncode { .. } => "ResponseEncodeError",
            Self::ValueConversion { .. } => "ValueConversionError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display() {
        assert_eq!(GeneratorError::MissingSpec.to_string(), "no config spec provided");

        let err = GeneratorError::value_conversion("nested", "object");
        assert_eq!(err.to_string(), "unable to convert value of key 'nested': unsupported object value");
        assert_eq!(err.code(), "ValueConversionError");

        let err = GeneratorError::empty_response("database/creds/ro");
        assert!(err.to_string().contains("empty response from Vault"));
        assert_eq!(err.code(), "EmptyBackendResponse");
    }

    #[test]
    fn test_backend_call_keeps_source() {
        let err = GeneratorError::backend_call(
            "secret/data/app",
            Operation::Delete,
            VaultApiError::Status { status: 403, errors: vec!["permission denied".to_string()] },
        );
        assert_eq!(
            err.to_string(),
            "unable to get dynamic secret: DELETE 'secret/data/app' failed: Vault returned status 403: permission denied"
        );
        let source = err.source().unwrap();
        assert!(source.downcast_ref::<VaultApiError>().is_some());
    }

    #[test]
    fn test_codes_are_distinct() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let codes = [
            GeneratorError::MissingSpec.code(),
            GeneratorError::MissingProviderConfig.code(),
            GeneratorError::ClientSetup(VaultApiError::Cancelled).code(),
            GeneratorError::ParameterDecode { path: "p".to_string(), source: json_err }.code(),
            GeneratorError::empty_response("p").code(),
            GeneratorError::value_conversion("k", "array").code(),
        ];
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }
}

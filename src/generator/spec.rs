//! Declarative request payload.
//!
//! A payload is a `VaultDynamicSecret` resource:
//!
//! ```yaml
//! apiVersion: generators.dynsecret.io/v1alpha1
//! kind: VaultDynamicSecret
//! spec:
//!   provider:
//!     server: https://vault.example.com:8200
//!     auth:
//!       kubernetes:
//!         role: payments
//!   path: database/creds/readonly
//!   method: GET            # "", GET, LIST, DELETE; anything else writes
//!   parameters: {}         # write body, only used for writes
//!   resultType: Data       # Data (default), Auth or Raw
//!   allowEmptyResponse: false
//! ```
//!
//! YAML is decoded, so JSON payloads are accepted as well.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use super::error::{GeneratorError, Result};
use crate::vault::VaultProvider;

/// Kind name under which the Vault generator registers itself.
pub const VAULT_DYNAMIC_SECRET_KIND: &str = "VaultDynamicSecret";

/// Backend operation requested by a descriptor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Operation {
    #[default]
    Read,
    List,
    Delete,
    Write,
}

/// Exact, case-sensitive method names. Anything not listed is a write.
const METHOD_TABLE: &[(&str, Operation)] = &[
    ("", Operation::Read),
    ("GET", Operation::Read),
    ("LIST", Operation::List),
    ("DELETE", Operation::Delete),
];

impl Operation {
    /// Resolve a `method` string from a payload.
    pub fn from_method(method: &str) -> Self {
        METHOD_TABLE
            .iter()
            .find(|(name, _)| *name == method)
            .map_or(Operation::Write, |(_, operation)| *operation)
    }

    /// Canonical method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "GET",
            Self::List => "LIST",
            Self::Delete => "DELETE",
            Self::Write => "WRITE",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for Operation {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operation {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let method = Option::<String>::deserialize(deserializer)?;
        Ok(Self::from_method(method.as_deref().unwrap_or_default()))
    }
}

/// Which part of a backend response becomes generator output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultShape {
    /// The response's `data` block, used as-is.
    #[default]
    #[serde(alias = "")]
    Data,
    /// The response's `auth` block, re-encoded.
    Auth,
    /// The whole response envelope, re-encoded.
    Raw,
}

impl fmt::Display for ResultShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Data => "Data",
            Self::Auth => "Auth",
            Self::Raw => "Raw",
        };
        write!(f, "{}", name)
    }
}

/// Parsed form of the payload's `spec` block. Immutable once decoded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDescriptor {
    /// Connection settings; only the client factory reads these.
    #[serde(default)]
    pub provider: Option<VaultProvider>,

    /// Backend resource path, e.g. `database/creds/readonly`.
    #[serde(default)]
    pub path: String,

    #[serde(default, rename = "method")]
    pub operation: Operation,

    /// Write body. Ignored for reads, lists and deletes.
    #[serde(default)]
    pub parameters: Option<Value>,

    #[serde(default, rename = "resultType", deserialize_with = "null_as_default")]
    pub result_shape: ResultShape,

    #[serde(default, rename = "allowEmptyResponse", deserialize_with = "null_as_default")]
    pub allow_empty_result: bool,
}

/// Explicit `null` decodes like an omitted field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The full payload resource.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultDynamicSecret {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    #[serde(default)]
    pub spec: RequestDescriptor,
}

impl VaultDynamicSecret {
    /// Decode a payload.
    ///
    /// `None` means the host supplied no payload at all. A blank payload decodes
    /// to an empty resource, which the translator then rejects for lacking a
    /// provider.
    pub fn parse(payload: Option<&[u8]>) -> Result<Self> {
        let payload = payload.ok_or(GeneratorError::MissingSpec)?;
        if payload.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_yaml::from_slice(payload).map_err(GeneratorError::SpecParse)
    }
}

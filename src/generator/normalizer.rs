//! Response normalization: backend response to a flat key/bytes map.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::{GeneratorError, Result};
use super::spec::{RequestDescriptor, ResultShape};
use crate::vault::SecretResponse;

/// Generator output: key to opaque bytes.
pub type FlatSecretMap = BTreeMap<String, Vec<u8>>;

/// Rule for turning a JSON value into bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueEncoding {
    /// Strings, numbers, booleans and null only; objects and arrays are rejected.
    #[default]
    Scalar,
    /// Like `Scalar`, but objects and arrays become compact JSON text.
    Json,
}

impl ValueEncoding {
    /// Encode one value. On failure returns the JSON type name that was refused.
    pub fn encode(&self, value: &Value) -> std::result::Result<Vec<u8>, &'static str> {
        match value {
            Value::String(s) => Ok(s.as_bytes().to_vec()),
            Value::Number(n) => Ok(n.to_string().into_bytes()),
            Value::Bool(b) => Ok(b.to_string().into_bytes()),
            Value::Null => Ok(Vec::new()),
            Value::Object(_) | Value::Array(_) if *self == Self::Json => {
                serde_json::to_vec(value).map_err(|_| json_kind(value))
            }
            Value::Object(_) | Value::Array(_) => Err(json_kind(value)),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl FromStr for ValueEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "scalar" => Ok(Self::Scalar),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown value encoding: {} (expected 'scalar' or 'json')", s)),
        }
    }
}

impl fmt::Display for ValueEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Pick the part of `response` that `shape` designates as source data.
///
/// `Data` borrows the response's data block. `Auth` and `Raw` re-encode a
/// typed structure into a generic document; a missing data or auth block
/// yields an empty document.
pub fn select_source<'a>(
    shape: ResultShape,
    response: &'a SecretResponse,
) -> Result<Cow<'a, Map<String, Value>>> {
    let reencode = |encoded: std::result::Result<Option<Map<String, Value>>, serde_json::Error>| {
        encoded
            .map(|document| Cow::Owned(document.unwrap_or_default()))
            .map_err(|source| GeneratorError::ResponseEncode { shape, source })
    };

    match shape {
        ResultShape::Data => Ok(response.data.as_ref().map_or_else(|| Cow::Owned(Map::new()), Cow::Borrowed)),
        ResultShape::Auth => reencode(round_trip(&response.auth)),
        ResultShape::Raw => reencode(round_trip(response)),
    }
}

fn round_trip<T: Serialize>(value: &T) -> std::result::Result<Option<Map<String, Value>>, serde_json::Error> {
    serde_json::from_value(serde_json::to_value(value)?)
}

/// Flattens backend responses using a fixed [`ValueEncoding`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer {
    encoding: ValueEncoding,
}

impl Normalizer {
    pub fn new(encoding: ValueEncoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> ValueEncoding {
        self.encoding
    }

    /// Produce the flat map for a completed call.
    ///
    /// A `None` response is an empty map when the descriptor allows empty
    /// results and [`GeneratorError::EmptyBackendResponse`] otherwise. A
    /// present response is always flattened, even if it carries no entries.
    pub fn normalize(
        &self,
        descriptor: &RequestDescriptor,
        response: Option<&SecretResponse>,
    ) -> Result<FlatSecretMap> {
        let Some(response) = response else {
            return if descriptor.allow_empty_result {
                Ok(FlatSecretMap::new())
            } else {
                Err(GeneratorError::empty_response(&descriptor.path))
            };
        };

        let source = select_source(descriptor.result_shape, response)?;
        self.flatten(&source)
    }

    /// Convert every entry of `source` to bytes.
    pub fn flatten(&self, source: &Map<String, Value>) -> Result<FlatSecretMap> {
        source
            .iter()
            .map(|(key, value)| {
                self.encoding
                    .encode(value)
                    .map(|bytes| (key.clone(), bytes))
                    .map_err(|kind| GeneratorError::value_conversion(key, kind))
            })
            .collect()
    }
}

/// Normalize with the default [`ValueEncoding::Scalar`] rule.
pub fn normalize(
    descriptor: &RequestDescriptor,
    response: Option<&SecretResponse>,
) -> Result<FlatSecretMap> {
    Normalizer::default().normalize(descriptor, response)
}

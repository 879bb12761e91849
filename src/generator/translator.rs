//! Request translation: payload to exactly one backend call.

use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::{GeneratorError, Result};
use super::spec::{Operation, RequestDescriptor, VaultDynamicSecret};
use crate::vault::{self, BackendFactory, LogicalBackend, SecretResponse};

/// A fully prepared backend call. Building one never touches the network.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Read,
    List,
    Delete,
    Write(Map<String, Value>),
}

impl BackendCall {
    /// Prepare the call for `descriptor`, decoding write parameters up front.
    pub fn plan(descriptor: &RequestDescriptor) -> Result<Self> {
        Ok(match descriptor.operation {
            Operation::Read => Self::Read,
            Operation::List => Self::List,
            Operation::Delete => Self::Delete,
            Operation::Write => Self::Write(decode_parameters(descriptor)?),
        })
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Read => Operation::Read,
            Self::List => Operation::List,
            Self::Delete => Operation::Delete,
            Self::Write(_) => Operation::Write,
        }
    }

    /// Issue the call. The backend's answer and error come back untouched.
    pub async fn issue(
        &self,
        cancel: &CancellationToken,
        path: &str,
        backend: &dyn LogicalBackend,
    ) -> vault::error::Result<Option<SecretResponse>> {
        match self {
            Self::Read => backend.read(cancel, path).await,
            Self::List => backend.list(cancel, path).await,
            Self::Delete => backend.delete(cancel, path).await,
            Self::Write(data) => backend.write(cancel, path, data).await,
        }
    }
}

fn decode_parameters(descriptor: &RequestDescriptor) -> Result<Map<String, Value>> {
    match &descriptor.parameters {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(value) => serde_json::from_value(value.clone()).map_err(|source| {
            GeneratorError::ParameterDecode { path: descriptor.path.clone(), source }
        }),
    }
}

/// Outcome of a successful translation.
#[derive(Debug, Clone)]
pub struct Translation {
    pub descriptor: RequestDescriptor,
    /// `None` when the backend answered successfully with nothing.
    pub response: Option<SecretResponse>,
}

/// Parses payloads, obtains a backend handle and issues the single call.
#[derive(Debug, Clone)]
pub struct Translator {
    factory: Arc<dyn BackendFactory>,
}

impl Translator {
    pub fn new(factory: Arc<dyn BackendFactory>) -> Self {
        Self { factory }
    }

    /// Parse `payload`, connect, and issue exactly one backend call.
    pub async fn translate(
        &self,
        cancel: &CancellationToken,
        payload: Option<&[u8]>,
    ) -> Result<Translation> {
        let descriptor = VaultDynamicSecret::parse(payload)?.spec;
        let provider = descriptor.provider.as_ref().ok_or(GeneratorError::MissingProviderConfig)?;

        let backend =
            self.factory.connect(cancel, provider).await.map_err(GeneratorError::ClientSetup)?;

        let call = BackendCall::plan(&descriptor)?;
        debug!(
            operation = %call.operation(),
            path = %descriptor.path,
            "Dispatching backend call"
        );

        let response = call
            .issue(cancel, &descriptor.path, backend.as_ref())
            .await
            .map_err(|e| GeneratorError::backend_call(&descriptor.path, call.operation(), e))?;

        Ok(Translation { descriptor, response })
    }
}

//! # Secret Generators
//!
//! A generator turns a declarative payload into a flat map of secret values.
//! The Vault generator resolves one request against a Vault backend:
//!
//! 1. [`translator`] parses the payload and issues exactly one backend call
//! 2. [`normalizer`] selects the requested part of the response and flattens it
//! 3. [`vault_dynamic`] wires both behind the [`Generator`] trait
//!
//! Generators are looked up by kind through a [`GeneratorRegistry`].

pub mod error;
pub mod normalizer;
pub mod registry;
pub mod spec;
pub mod translator;
pub mod vault_dynamic;

pub use error::{GeneratorError, Result};
pub use normalizer::{FlatSecretMap, Normalizer, ValueEncoding};
pub use registry::{register_builtin, GeneratorRegistry};
pub use spec::{
    Operation, RequestDescriptor, ResultShape, VaultDynamicSecret, VAULT_DYNAMIC_SECRET_KIND,
};
pub use translator::{BackendCall, Translation, Translator};
pub use vault_dynamic::VaultDynamicSecretGenerator;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Opaque per-secret state a generator may hand back for later cleanup.
pub type GeneratorState = serde_json::Value;

/// Output of one generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedSecret {
    pub data: FlatSecretMap,
    /// Always `None` for stateless generators.
    pub state: Option<GeneratorState>,
}

/// A pluggable secret generator.
#[async_trait]
pub trait Generator: Send + Sync + std::fmt::Debug {
    /// Kind name used for registry lookup.
    fn kind(&self) -> &'static str;

    /// Produce secret data for `payload`. `None` means the host sent no payload.
    async fn generate(
        &self,
        cancel: &CancellationToken,
        payload: Option<&[u8]>,
    ) -> Result<GeneratedSecret>;

    /// Release whatever `generate` created.
    async fn cleanup(
        &self,
        cancel: &CancellationToken,
        payload: Option<&[u8]>,
        state: Option<&GeneratorState>,
    ) -> Result<()>;
}

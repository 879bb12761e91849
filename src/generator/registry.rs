//! Generator registry
//!
//! Maps a kind name to the generator that handles it. The registry is built
//! explicitly at the composition root; nothing registers itself on load.

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::normalizer::ValueEncoding;
use super::vault_dynamic::VaultDynamicSecretGenerator;
use super::{GeneratedSecret, Generator};
use crate::errors::{Error, Result};
use crate::vault::BackendFactory;

/// Registry of generators keyed by kind.
#[derive(Default, Clone)]
pub struct GeneratorRegistry {
    generators: BTreeMap<&'static str, Arc<dyn Generator>>,
}

impl std::fmt::Debug for GeneratorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorRegistry").field("kinds", &self.kinds()).finish()
    }
}

impl GeneratorRegistry {
    /// Create a new registry with no generators
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a generator under its own kind. A later registration for the
    /// same kind replaces the earlier one.
    pub fn register(&mut self, generator: Arc<dyn Generator>) {
        let kind = generator.kind();
        if self.generators.insert(kind, generator).is_some() {
            warn!(kind = kind, "Replacing registered generator");
        } else {
            info!(kind = kind, "Registering generator");
        }
    }

    /// Look up the generator for `kind`.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn Generator>> {
        self.generators.get(kind).cloned()
    }

    /// Check if a generator is registered for `kind`
    pub fn contains(&self, kind: &str) -> bool {
        self.generators.contains_key(kind)
    }

    /// Registered kinds, sorted
    pub fn kinds(&self) -> Vec<&'static str> {
        self.generators.keys().copied().collect()
    }

    /// Run the generator registered for `kind` once.
    pub async fn generate(
        &self,
        kind: &str,
        cancel: &CancellationToken,
        payload: Option<&[u8]>,
    ) -> Result<GeneratedSecret> {
        let generator = self.get(kind).ok_or_else(|| {
            Error::validation(format!(
                "Unknown generator kind '{}'. Registered kinds: {}",
                kind,
                self.kinds().join(", ")
            ))
        })?;
        Ok(generator.generate(cancel, payload).await?)
    }
}

/// Register the built-in generators.
pub fn register_builtin(
    registry: &mut GeneratorRegistry,
    factory: Arc<dyn BackendFactory>,
    encoding: ValueEncoding,
) {
    registry.register(Arc::new(VaultDynamicSecretGenerator::with_encoding(factory, encoding)));
}

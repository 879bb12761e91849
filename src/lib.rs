//! # dynsecret
//!
//! On-demand dynamic secret generation against the HashiCorp Vault HTTP API.
//!
//! A host hands a generator a declarative `VaultDynamicSecret` payload; the
//! generator issues exactly one logical call against Vault and returns the
//! selected part of the response as a flat map of key to bytes.
//!
//! ```text
//! payload → Translator → LogicalBackend (Vault /v1/) → Normalizer → FlatSecretMap
//!              ↑
//!        BackendFactory (token / AppRole / Kubernetes)
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dynsecret::generator::{Generator, VaultDynamicSecretGenerator};
//! use dynsecret::vault::VaultClientFactory;
//! use dynsecret::{AppConfig, Result};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::from_env()?;
//!     let generator =
//!         VaultDynamicSecretGenerator::new(Arc::new(VaultClientFactory::new(config.vault)));
//!
//!     let payload = std::fs::read("payload.yaml")?;
//!     let secret = generator.generate(&CancellationToken::new(), Some(payload.as_slice())).await?;
//!     println!("{} keys", secret.data.len());
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod errors;
pub mod generator;
pub mod observability;
pub mod secrets;
pub mod vault;

// Re-export commonly used types and traits
pub use config::AppConfig;
pub use errors::{Error, Result};
pub use generator::{
    FlatSecretMap, GeneratedSecret, Generator, GeneratorError, GeneratorRegistry, ValueEncoding,
};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

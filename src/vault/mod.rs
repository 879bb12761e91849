//! HashiCorp Vault backend handle.
//!
//! - [`LogicalBackend`]: the capability the generator calls (read, list, delete, write)
//! - [`VaultLogicalClient`]: reqwest implementation against the `/v1/` HTTP API
//! - [`BackendFactory`] / [`VaultClientFactory`]: turn a [`VaultProvider`] block
//!   into an authenticated handle (static token, AppRole or Kubernetes login)
//! - [`SecretResponse`]: the response envelope shared by all logical calls

pub mod client;
pub mod error;
pub mod logical;
pub mod provider;
pub mod response;

pub use client::VaultLogicalClient;
pub use error::VaultApiError;
pub use logical::LogicalBackend;
pub use provider::{
    AppRoleAuth, BackendFactory, KubernetesAuth, SecretSource, VaultAuth, VaultClientFactory,
    VaultProvider,
};
pub use response::{SecretAuth, SecretResponse, WrapInfo};

//! Backend handle capability.
//!
//! The generator never constructs transport credentials itself; it is handed an
//! already-authenticated [`LogicalBackend`] by a [`BackendFactory`](super::BackendFactory)
//! and issues exactly one call on it.

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use super::error::Result;
use super::response::SecretResponse;

/// Logical operations exposed by a secret-management backend, keyed by path.
///
/// A successful call may legitimately return `None` (for example a delete
/// answered with `204 No Content`). Implementations must stop waiting and
/// return [`VaultApiError::Cancelled`](super::VaultApiError::Cancelled) once
/// `cancel` fires.
#[async_trait]
pub trait LogicalBackend: Send + Sync + std::fmt::Debug {
    /// Read the resource at `path`.
    async fn read(&self, cancel: &CancellationToken, path: &str)
        -> Result<Option<SecretResponse>>;

    /// List resources under `path`.
    async fn list(&self, cancel: &CancellationToken, path: &str)
        -> Result<Option<SecretResponse>>;

    /// Delete the resource at `path`.
    async fn delete(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<Option<SecretResponse>>;

    /// Write `data` to `path`.
    async fn write(
        &self,
        cancel: &CancellationToken,
        path: &str,
        data: &Map<String, Value>,
    ) -> Result<Option<SecretResponse>>;
}

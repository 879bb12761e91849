//! HTTP implementation of [`LogicalBackend`] for the Vault `/v1/` API.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::error::{Result, VaultApiError};
use super::logical::LogicalBackend;
use super::response::SecretResponse;
use crate::secrets::SecretString;

/// Authenticated client for Vault's logical API.
///
/// Holds a pre-configured `reqwest::Client` (TLS roots, timeout and any custom
/// headers are applied by the factory) plus the token used for every call.
pub struct VaultLogicalClient {
    http: reqwest::Client,
    base_url: Url,
    token: SecretString,
    namespace: Option<String>,
}

impl std::fmt::Debug for VaultLogicalClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultLogicalClient")
            .field("base_url", &self.base_url.as_str())
            .field("namespace", &self.namespace)
            .field("token", &self.token)
            .finish()
    }
}

impl VaultLogicalClient {
    /// Create a client for the Vault server at `address`.
    pub fn new(
        http: reqwest::Client,
        address: &str,
        token: SecretString,
        namespace: Option<String>,
    ) -> Result<Self> {
        let base_url = api_base_url(address)?;
        Ok(Self { http, base_url, token, namespace })
    }

    /// Root of the logical API, always ending in `/v1/`.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        let relative = path.trim_start_matches('/');
        if relative.is_empty() {
            return Err(VaultApiError::invalid_path(path, "path cannot be empty"));
        }

        let url = self
            .base_url
            .join(relative)
            .map_err(|e| VaultApiError::invalid_path(path, e.to_string()))?;

        // `join` accepts absolute URLs and `..` segments; neither may escape the API root.
        if !url.as_str().starts_with(self.base_url.as_str()) {
            return Err(VaultApiError::invalid_path(path, "path escapes the /v1/ API prefix"));
        }

        Ok(url)
    }

    async fn call(
        &self,
        cancel: &CancellationToken,
        method: Method,
        path: &str,
        list: bool,
        body: Option<&Map<String, Value>>,
    ) -> Result<Option<SecretResponse>> {
        let mut url = self.endpoint(path)?;
        if list {
            url.query_pairs_mut().append_pair("list", "true");
        }

        let mut request = self
            .http
            .request(method.clone(), url)
            .header("X-Vault-Token", self.token.expose_secret())
            .header("X-Vault-Request", "true");
        if let Some(namespace) = &self.namespace {
            request = request.header("X-Vault-Namespace", namespace);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(method = %method, path = %path, list, "Issuing Vault request");

        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, VaultApiError>((status, body))
        };

        let (status, body) = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(VaultApiError::Cancelled),
            result = exchange => result?,
        };

        debug!(method = %method, path = %path, status = status.as_u16(), "Vault responded");
        interpret_response(status, &body)
    }
}

#[async_trait]
impl LogicalBackend for VaultLogicalClient {
    async fn read(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<Option<SecretResponse>> {
        self.call(cancel, Method::GET, path, false, None).await
    }

    async fn list(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<Option<SecretResponse>> {
        self.call(cancel, Method::GET, path, true, None).await
    }

    async fn delete(
        &self,
        cancel: &CancellationToken,
        path: &str,
    ) -> Result<Option<SecretResponse>> {
        self.call(cancel, Method::DELETE, path, false, None).await
    }

    async fn write(
        &self,
        cancel: &CancellationToken,
        path: &str,
        data: &Map<String, Value>,
    ) -> Result<Option<SecretResponse>> {
        self.call(cancel, Method::PUT, path, false, Some(data)).await
    }
}

/// Build the `/v1/` root for a server address such as `https://vault:8200`.
pub(crate) fn api_base_url(address: &str) -> Result<Url> {
    let mut url = Url::parse(address.trim())
        .map_err(|e| VaultApiError::invalid_address(address, e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(VaultApiError::invalid_address(address, "scheme must be http or https"));
    }
    if url.cannot_be_a_base() {
        return Err(VaultApiError::invalid_address(address, "address cannot be a base URL"));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);

    url.join("v1/").map_err(|e| VaultApiError::invalid_address(address, e.to_string()))
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Option<Vec<String>>,
}

/// Map a raw HTTP exchange onto the logical API contract.
///
/// - `404` with no data and no warnings means "nothing there", not a failure.
/// - `204` or an empty body on success means the call returned nothing.
/// - Any other non-success status is an error carrying Vault's `errors` list.
fn interpret_response(status: StatusCode, body: &[u8]) -> Result<Option<SecretResponse>> {
    let blank = body.iter().all(u8::is_ascii_whitespace);

    if status == StatusCode::NOT_FOUND {
        if blank {
            return Ok(None);
        }
        let response: SecretResponse = serde_json::from_slice(body)?;
        return Ok(if response.is_vacant() { None } else { Some(response) });
    }

    if !status.is_success() {
        let errors = match serde_json::from_slice::<ErrorBody>(body) {
            Ok(parsed) => parsed.errors.unwrap_or_default(),
            Err(_) if blank => Vec::new(),
            Err(_) => vec![String::from_utf8_lossy(body).trim().to_string()],
        };
        return Err(VaultApiError::Status { status: status.as_u16(), errors });
    }

    if status == StatusCode::NO_CONTENT || blank {
        return Ok(None);
    }

    Ok(Some(serde_json::from_slice(body)?))
}

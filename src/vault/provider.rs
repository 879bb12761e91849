//! Provider connection configuration and backend-handle construction.
//!
//! The `provider` block of a request carries everything needed to reach and
//! authenticate against Vault. [`BackendFactory`] turns it into a ready
//! [`LogicalBackend`]; the generator receives the factory by injection and
//! never builds transport credentials itself.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use validator::Validate;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};

use super::client::VaultLogicalClient;
use super::error::{Result, VaultApiError};
use super::logical::LogicalBackend;
use crate::config::VaultSettings;
use crate::secrets::SecretString;

/// Connection settings for one Vault server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VaultProvider {
    /// Server address, e.g. `https://vault.example.com:8200`.
    /// Empty means "use the configured default address".
    #[serde(default)]
    pub server: String,

    /// Vault Enterprise namespace.
    #[serde(default)]
    pub namespace: Option<String>,

    /// PEM file with additional trusted CA certificates.
    #[serde(default)]
    pub ca_cert_path: Option<PathBuf>,

    /// Extra headers sent with every request, logins included.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Per-request timeout; falls back to the configured default.
    #[serde(default)]
    #[validate(range(min = 1, max = 300, message = "provider.timeoutSeconds must be between 1 and 300 seconds"))]
    pub timeout_seconds: Option<u64>,

    #[serde(default)]
    pub auth: Option<VaultAuth>,
}

/// How to obtain a Vault token. The first configured method wins, in field order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultAuth {
    /// Use a static token.
    #[serde(default)]
    pub token: Option<SecretSource>,

    /// Log in with AppRole.
    #[serde(default)]
    pub app_role: Option<AppRoleAuth>,

    /// Log in with a Kubernetes service-account JWT.
    #[serde(default)]
    pub kubernetes: Option<KubernetesAuth>,
}

impl VaultAuth {
    /// Name of the configured method, `none` when nothing is set.
    pub fn method(&self) -> &'static str {
        if self.token.is_some() {
            "token"
        } else if self.app_role.is_some() {
            "approle"
        } else if self.kubernetes.is_some() {
            "kubernetes"
        } else {
            "none"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRoleAuth {
    /// Mount path of the AppRole auth method.
    #[serde(default = "default_approle_path")]
    pub path: String,

    pub role_id: String,

    pub secret_id: SecretSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesAuth {
    /// Mount path of the Kubernetes auth method.
    #[serde(default = "default_kubernetes_mount")]
    pub mount_path: String,

    pub role: String,

    /// Projected service-account token to present to Vault.
    #[serde(default = "default_service_account_token_path")]
    pub service_account_token_path: PathBuf,
}

fn default_approle_path() -> String {
    "approle".to_string()
}

fn default_kubernetes_mount() -> String {
    "kubernetes".to_string()
}

fn default_service_account_token_path() -> PathBuf {
    PathBuf::from("/var/run/secrets/kubernetes.io/serviceaccount/token")
}

/// A credential given inline, through an environment variable, or in a file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretSource {
    #[serde(default)]
    pub value: Option<SecretString>,

    #[serde(default)]
    pub env: Option<String>,

    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl SecretSource {
    /// Resolve the credential. `what` names it in error messages.
    pub async fn resolve(&self, what: &'static str) -> Result<SecretString> {
        let secret = if let Some(value) = &self.value {
            value.clone()
        } else if let Some(name) = &self.env {
            std::env::var(name).map(SecretString::from).map_err(|_| {
                VaultApiError::credentials(format!(
                    "{} environment variable '{}' is not set",
                    what, name
                ))
            })?
        } else if let Some(path) = &self.file {
            read_secret_file(path, what).await?
        } else {
            return Err(VaultApiError::credentials(format!(
                "{} must set one of 'value', 'env' or 'file'",
                what
            )));
        };

        let secret = secret.trimmed();
        if secret.is_empty() {
            return Err(VaultApiError::credentials(format!("{} is empty", what)));
        }
        Ok(secret)
    }
}

async fn read_secret_file(path: &Path, what: &'static str) -> Result<SecretString> {
    tokio::fs::read_to_string(path).await.map(SecretString::from).map_err(|source| {
        VaultApiError::Io { what, path: path.display().to_string(), source }
    })
}

/// Builds authenticated backend handles from provider configuration.
#[async_trait]
pub trait BackendFactory: Send + Sync + std::fmt::Debug {
    /// Produce a handle for `provider`. Login round-trips honour `cancel`.
    async fn connect(
        &self,
        cancel: &CancellationToken,
        provider: &VaultProvider,
    ) -> Result<Arc<dyn LogicalBackend>>;
}

/// Production factory for [`VaultLogicalClient`] handles.
#[derive(Debug, Clone, Default)]
pub struct VaultClientFactory {
    settings: VaultSettings,
}

impl VaultClientFactory {
    pub fn new(settings: VaultSettings) -> Self {
        Self { settings }
    }

    fn address<'a>(&'a self, provider: &'a VaultProvider) -> Result<&'a str> {
        let server = provider.server.trim();
        if !server.is_empty() {
            return Ok(server);
        }
        self.settings.address.as_deref().ok_or_else(|| {
            VaultApiError::invalid_address("", "provider.server is empty and no default address is configured")
        })
    }

    fn timeout(&self, provider: &VaultProvider) -> Duration {
        Duration::from_secs(provider.timeout_seconds.unwrap_or(self.settings.timeout_seconds))
    }

    fn http_client(&self, provider: &VaultProvider, ca_pem: Option<&[u8]>) -> Result<reqwest::Client> {
        let mut headers = HeaderMap::new();
        for (name, value) in &provider.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                VaultApiError::InvalidHeader { name: name.clone(), reason: e.to_string() }
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                VaultApiError::InvalidHeader { name: name.clone(), reason: e.to_string() }
            })?;
            headers.insert(header_name, header_value);
        }

        let mut builder =
            reqwest::Client::builder().timeout(self.timeout(provider)).default_headers(headers);
        if let Some(pem) = ca_pem {
            builder = builder.add_root_certificate(reqwest::Certificate::from_pem(pem)?);
        }

        Ok(builder.build()?)
    }

    /// Login client sharing `http`, so logins carry the same headers, CA
    /// bundle and timeout as logical calls.
    fn login_client(&self, address: &str, provider: &VaultProvider, http: &reqwest::Client) -> Result<VaultClient> {
        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(address);
        settings_builder.timeout(Some(self.timeout(provider)));

        if let Some(ref namespace) = provider.namespace {
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder.build().map_err(|e| {
            VaultApiError::invalid_address(address, format!("invalid login client settings: {}", e))
        })?;

        let mut client = VaultClient::new(settings)
            .map_err(|e| VaultApiError::login("client", format!("failed to create client: {}", e)))?;
        client.http.http = http.clone();
        Ok(client)
    }

    async fn resolve_token(
        &self,
        address: &str,
        provider: &VaultProvider,
        http: &reqwest::Client,
    ) -> Result<SecretString> {
        let auth = provider.auth.clone().unwrap_or_default();

        if let Some(token) = &auth.token {
            return token.resolve("token").await;
        }

        if let Some(app_role) = &auth.app_role {
            if app_role.role_id.trim().is_empty() {
                return Err(VaultApiError::credentials("appRole.roleId is empty"));
            }
            let secret_id = app_role.secret_id.resolve("appRole secretId").await?;
            let client = self.login_client(address, provider, http)?;
            debug!(mount = %app_role.path, "Logging in to Vault with AppRole");
            let info = vaultrs::auth::approle::login(
                &client,
                &app_role.path,
                &app_role.role_id,
                secret_id.expose_secret(),
            )
            .await
            .map_err(|e| VaultApiError::login("approle", e.to_string()))?;
            return Ok(SecretString::new(info.client_token));
        }

        if let Some(kubernetes) = &auth.kubernetes {
            if kubernetes.role.trim().is_empty() {
                return Err(VaultApiError::credentials("kubernetes.role is empty"));
            }
            let jwt = read_secret_file(&kubernetes.service_account_token_path, "service account token")
                .await?
                .trimmed();
            let client = self.login_client(address, provider, http)?;
            debug!(mount = %kubernetes.mount_path, role = %kubernetes.role, "Logging in to Vault with Kubernetes auth");
            let info = vaultrs::auth::kubernetes::login(
                &client,
                &kubernetes.mount_path,
                &kubernetes.role,
                jwt.expose_secret(),
            )
            .await
            .map_err(|e| VaultApiError::login("kubernetes", e.to_string()))?;
            return Ok(SecretString::new(info.client_token));
        }

        self.settings.token.clone().filter(|t| !t.is_empty()).ok_or_else(|| {
            VaultApiError::credentials("no auth configured in provider and no default token available")
        })
    }
}

#[async_trait]
impl BackendFactory for VaultClientFactory {
    async fn connect(
        &self,
        cancel: &CancellationToken,
        provider: &VaultProvider,
    ) -> Result<Arc<dyn LogicalBackend>> {
        provider.validate()?;
        let address = self.address(provider)?;

        let ca_pem = match &provider.ca_cert_path {
            Some(path) => Some(
                tokio::fs::read(path).await.map_err(|source| VaultApiError::Io {
                    what: "CA bundle",
                    path: path.display().to_string(),
                    source,
                })?,
            ),
            None => None,
        };
        let http = self.http_client(provider, ca_pem.as_deref())?;

        let token = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(VaultApiError::Cancelled),
            token = self.resolve_token(address, provider, &http) => token?,
        };

        let client = VaultLogicalClient::new(http, address, token, provider.namespace.clone())?;

        info!(
            address = %client.base_url(),
            namespace = ?provider.namespace,
            auth_method = provider.auth.as_ref().map_or("default", VaultAuth::method),
            "Vault client ready"
        );

        Ok(Arc::new(client))
    }
}

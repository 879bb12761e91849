//! Common test utilities for all integration tests.
//!
//! Provides a wiremock stand-in for the Vault HTTP API and payload builders.

#![allow(dead_code)]
#![allow(clippy::duplicate_mod)]

use std::sync::Arc;

use dynsecret::config::VaultSettings;
use dynsecret::generator::{ValueEncoding, VaultDynamicSecretGenerator};
use dynsecret::vault::VaultClientFactory;
use serde_json::{json, Value};
use wiremock::MockServer;

/// Token the default factory presents.
pub const TEST_TOKEN: &str = "hvs.integration-test";

/// A mock Vault server plus generators pointed at it.
pub struct MockVault {
    pub server: MockServer,
}

impl MockVault {
    pub async fn start() -> Self {
        Self { server: MockServer::start().await }
    }

    pub fn address(&self) -> String {
        self.server.uri()
    }

    /// Defaults matching `VAULT_ADDR` / `VAULT_TOKEN` pointed at the mock.
    pub fn settings(&self) -> VaultSettings {
        VaultSettings {
            address: Some(self.address()),
            token: Some(TEST_TOKEN.into()),
            timeout_seconds: 5,
        }
    }

    pub fn factory(&self) -> Arc<VaultClientFactory> {
        Arc::new(VaultClientFactory::new(self.settings()))
    }

    pub fn generator(&self) -> VaultDynamicSecretGenerator {
        VaultDynamicSecretGenerator::new(self.factory())
    }

    pub fn generator_with(&self, encoding: ValueEncoding) -> VaultDynamicSecretGenerator {
        VaultDynamicSecretGenerator::with_encoding(self.factory(), encoding)
    }

    /// Provider block pointing at the mock with no explicit auth.
    pub fn provider(&self) -> Value {
        json!({"server": self.address()})
    }
}

/// Wrap a `spec` block in a full `VaultDynamicSecret` resource.
pub fn payload(spec: Value) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "apiVersion": "generators.dynsecret.io/v1alpha1",
        "kind": "VaultDynamicSecret",
        "spec": spec,
    }))
    .expect("payload serializes")
}

/// A Vault login response body as returned by `auth/*/login`.
pub fn login_response(client_token: &str) -> Value {
    json!({
        "request_id": "login-request",
        "lease_id": "",
        "renewable": false,
        "lease_duration": 0,
        "data": null,
        "wrap_info": null,
        "warnings": null,
        "auth": {
            "client_token": client_token,
            "accessor": "accessor-1",
            "policies": ["default"],
            "token_policies": ["default"],
            "metadata": {"role_name": "test"},
            "lease_duration": 3600,
            "renewable": true,
            "entity_id": "entity-1",
            "token_type": "service",
            "orphan": true
        }
    })
}

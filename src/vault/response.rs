//! Vault response envelope.
//!
//! Every logical API call (read, list, delete, write) answers with the same
//! envelope. Which part of it becomes generator output is decided by the
//! normalizer; this module only models the wire shape.
//!
//! Fields are kept exactly as Vault sent them: a field that was present, even
//! as `""`, `0` or `false`, is written back on re-serialization, and a field
//! that was absent stays absent. Vault sends `null` for an unset `data`,
//! `warnings`, `auth` or `wrap_info`, which decodes the same as absence.
//! Top-level and `auth` fields this model does not name are carried in `extra`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A structured response from the Vault logical API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewable: Option<bool>,

    /// Primary payload of the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,

    /// Token information, present on login and token-creating endpoints.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<SecretAuth>,

    /// Response-wrapping information, present when the request asked for wrapping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrap_info: Option<WrapInfo>,

    /// Envelope fields not modelled above, e.g. `mount_type`.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SecretResponse {
    /// Response with only a `data` block.
    pub fn with_data(data: Map<String, Value>) -> Self {
        Self { data: Some(data), ..Default::default() }
    }

    /// True when a 404 body carries nothing worth returning.
    pub(crate) fn is_vacant(&self) -> bool {
        self.data.as_ref().map_or(true, Map::is_empty)
            && self.warnings.as_ref().map_or(true, Vec::is_empty)
    }
}

/// The `auth` block of a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policies: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_policies: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_policies: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orphan: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lease_duration: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewable: Option<bool>,

    /// Fields added by newer Vault versions or specific auth methods.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `wrap_info` block of a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WrapInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accessor: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapped_accessor: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_database_credentials() {
        let body = json!({
            "request_id": "6f1e2c7a",
            "lease_id": "database/creds/readonly/2f6a614c",
            "renewable": true,
            "lease_duration": 3600,
            "data": {"username": "v-token-readonly-9x", "password": "A1a-7c3n"},
            "wrap_info": null,
            "warnings": null,
            "auth": null
        });

        let response: SecretResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.lease_duration, Some(3600));
        assert_eq!(response.renewable, Some(true));
        assert_eq!(response.data.unwrap()["username"], "v-token-readonly-9x");
        assert!(response.warnings.is_none());
        assert!(response.auth.is_none());
        assert!(response.wrap_info.is_none());
    }

    #[test]
    fn test_decode_login_keeps_unknown_auth_fields() {
        let body = json!({
            "data": null,
            "auth": {
                "client_token": "hvs.abc",
                "accessor": "acc",
                "policies": ["default", "web"],
                "metadata": null,
                "lease_duration": 2764800,
                "renewable": true,
                "token_type": "service",
                "num_uses": 0
            }
        });

        let response: SecretResponse = serde_json::from_value(body).unwrap();
        let auth = response.auth.unwrap();
        assert_eq!(auth.client_token.as_deref(), Some("hvs.abc"));
        assert_eq!(auth.policies.unwrap(), vec!["default", "web"]);
        assert!(auth.metadata.is_none());
        assert_eq!(auth.extra["token_type"], "service");
        assert_eq!(auth.extra["num_uses"], 0);
    }

    #[test]
    fn test_reencoding_omits_absent_fields() {
        let auth = SecretAuth { client_token: Some("abc".to_string()), ..Default::default() };
        assert_eq!(serde_json::to_value(&auth).unwrap(), json!({"client_token": "abc"}));

        let empty = SecretResponse::default();
        assert_eq!(serde_json::to_value(&empty).unwrap(), json!({}));
    }

    #[test]
    fn test_reencoding_keeps_zero_values_vault_sent() {
        let body = json!({
            "request_id": "r1",
            "lease_id": "",
            "lease_duration": 0,
            "renewable": false,
            "data": {"k": "v"},
            "mount_type": "database",
            "auth": {"client_token": "abc", "orphan": false, "renewable": false, "lease_duration": 0}
        });

        let response: SecretResponse = serde_json::from_str(&body.to_string()).unwrap();
        assert_eq!(response.extra["mount_type"], "database");
        assert_eq!(serde_json::to_value(&response).unwrap(), body);
    }

    #[test]
    fn test_null_collections_decode_as_absent() {
        let body = json!({"request_id": "r1", "data": null, "warnings": null, "auth": null, "wrap_info": null});
        let response: SecretResponse = serde_json::from_value(body).unwrap();
        assert!(response.data.is_none());
        assert_eq!(serde_json::to_value(&response).unwrap(), json!({"request_id": "r1"}));
    }

    #[test]
    fn test_vacant_response() {
        let mut response = SecretResponse::default();
        assert!(response.is_vacant());

        response.data = Some(Map::new());
        assert!(response.is_vacant());

        response.warnings = Some(vec!["path is deprecated".to_string()]);
        assert!(!response.is_vacant());
    }
}

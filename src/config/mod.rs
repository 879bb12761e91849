//! # Configuration
//!
//! Environment-driven configuration for the `dynsecret` binary.
//!
//! | Variable | Default | Meaning |
//! |---|---|---|
//! | `DYNSECRET_LOG_LEVEL` | `info` | `EnvFilter` directive, overridden by `RUST_LOG` |
//! | `DYNSECRET_JSON_LOGS` | `false` | JSON log lines on stderr |
//! | `DYNSECRET_VAULT_ADDR` / `VAULT_ADDR` | unset | Address used when `provider.server` is empty |
//! | `DYNSECRET_VAULT_TOKEN` / `VAULT_TOKEN` | unset | Token used when `provider.auth` is absent |
//! | `DYNSECRET_VAULT_TIMEOUT_SECS` | `30` | Per-request timeout, 1 to 300 |
//! | `DYNSECRET_VALUE_ENCODING` | `scalar` | `scalar` or `json` |

use serde::Serialize;
use validator::Validate;

use crate::errors::{Error, Result};
use crate::generator::ValueEncoding;
use crate::secrets::SecretString;

/// Default per-request timeout for Vault calls.
pub const DEFAULT_VAULT_TIMEOUT_SECS: u64 = 30;

/// Logging configuration
#[derive(Debug, Clone, Serialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level or filter directive (e.g. `info`, `dynsecret=debug`)
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

/// Defaults applied to every provider block.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct VaultSettings {
    /// Fallback server address
    #[validate(url(message = "Vault address must be a valid URL"))]
    pub address: Option<String>,

    /// Fallback token
    pub token: Option<SecretString>,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Vault timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self { address: None, token: None, timeout_seconds: DEFAULT_VAULT_TIMEOUT_SECS }
    }
}

/// Top-level application configuration
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub observability: ObservabilityConfig,

    #[validate(nested)]
    pub vault: VaultSettings,

    /// Conversion rule for response values
    pub value_encoding: ValueEncoding,
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |names: &[&str]| first_set(&lookup, names);

        let observability = ObservabilityConfig {
            log_level: first(&["DYNSECRET_LOG_LEVEL"][..]).unwrap_or_else(|| "info".to_string()),
            json_logging: first(&["DYNSECRET_JSON_LOGS"][..])
                .map(|value| parse_bool("DYNSECRET_JSON_LOGS", &value))
                .transpose()?
                .unwrap_or(false),
        };

        let vault = VaultSettings {
            address: first(&["DYNSECRET_VAULT_ADDR", "VAULT_ADDR"][..]),
            token: first(&["DYNSECRET_VAULT_TOKEN", "VAULT_TOKEN"][..]).map(SecretString::from),
            timeout_seconds: first(&["DYNSECRET_VAULT_TIMEOUT_SECS"][..])
                .map(|value| {
                    value.trim().parse::<u64>().map_err(|e| {
                        Error::config(format!("Invalid DYNSECRET_VAULT_TIMEOUT_SECS '{}': {}", value, e))
                    })
                })
                .transpose()?
                .unwrap_or(DEFAULT_VAULT_TIMEOUT_SECS),
        };

        let value_encoding = first(&["DYNSECRET_VALUE_ENCODING"][..])
            .map(|value| value.trim().parse::<ValueEncoding>().map_err(Error::config))
            .transpose()?
            .unwrap_or_default();

        let config = Self { observability, vault, value_encoding };
        config.validate()?;
        Ok(config)
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)
    }
}

/// First of `names` that is set to a non-blank value.
fn first_set<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names.iter().find_map(|name| lookup(name).filter(|value| !value.trim().is_empty()))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::config(format!("Invalid {} '{}': expected true or false", name, other))),
    }
}

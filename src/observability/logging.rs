//! # Structured Logging
//!
//! Subscriber setup and span macros built on the tracing ecosystem.
//!
//! Logs go to stderr; stdout is reserved for command output. Field values are
//! structural only (kind, operation, path, key counts). Secret values never
//! appear in events.

use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, ObservabilityConfig};
use crate::errors::{Error, Result};

/// Create a tracing span for one generator invocation.
///
/// ```rust,ignore
/// let span = generator_span!("VaultDynamicSecret");
/// let span = generator_span!("VaultDynamicSecret", path = %descriptor.path);
/// ```
#[macro_export]
macro_rules! generator_span {
    ($kind:expr) => {
        tracing::info_span!(
            "generate_secret",
            kind = %$kind,
            invocation_id = %uuid::Uuid::new_v4()
        )
    };
    ($kind:expr, $($field:tt)*) => {
        tracing::info_span!(
            "generate_secret",
            kind = %$kind,
            invocation_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Build the filter: `RUST_LOG` wins, otherwise the configured level.
pub fn build_env_filter(config: &ObservabilityConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            Error::config(format!("Invalid log level '{}': {}", config.log_level, e))
        }),
    }
}

/// Install the global subscriber.
///
/// A subscriber that is already installed (integration tests, embedding hosts)
/// is left in place.
pub fn init_logging(config: &ObservabilityConfig) -> Result<()> {
    let filter = build_env_filter(config)?;
    let builder =
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);

    let installed =
        if config.json_logging { builder.json().try_init() } else { builder.try_init() };
    if installed.is_err() {
        // Subscriber already set elsewhere; ignore.
    }
    Ok(())
}

/// Log configuration at startup
pub fn log_config_info(config: &AppConfig) {
    tracing::debug!(
        vault_address = config.vault.address.as_deref().unwrap_or("<unset>"),
        default_token = config.vault.token.is_some(),
        timeout_seconds = config.vault.timeout_seconds,
        value_encoding = %config.value_encoding,
        json_logging = config.observability.json_logging,
        "dynsecret configuration"
    );
}

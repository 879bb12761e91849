//! # Command Line Interface
//!
//! Runs generators from the shell: generate secret data from a payload file,
//! check a payload without touching Vault, and list registered kinds.

pub mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use validator::Validate;

use crate::config::AppConfig;
use crate::generator::{
    register_builtin, GeneratorError, GeneratorRegistry, VaultDynamicSecret,
    VAULT_DYNAMIC_SECRET_KIND,
};
use crate::observability::{init_logging, log_config_info};
use crate::vault::VaultClientFactory;
use output::{OutputFormat, ValueFormat};

#[derive(Parser)]
#[command(name = "dynsecret")]
#[command(about = "Dynamic secret generation against HashiCorp Vault")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run one generation and print the resulting secret data
    Generate {
        /// Payload file, or '-' for stdin
        #[arg(short, long)]
        spec: String,

        /// Generator kind
        #[arg(short, long, default_value = VAULT_DYNAMIC_SECRET_KIND)]
        kind: String,

        /// Output format (json or yaml)
        #[arg(short, long, default_value = "json")]
        output: String,

        /// Rendering of secret values
        #[arg(short, long, value_enum, default_value_t = ValueFormat::Base64)]
        encoding: ValueFormat,
    },

    /// Parse a payload and print the resolved request without calling Vault
    Validate {
        /// Payload file, or '-' for stdin
        #[arg(short, long)]
        spec: String,

        /// Output format (json or yaml)
        #[arg(short, long, default_value = "json")]
        output: String,
    },

    /// List registered generator kinds
    Kinds,
}

/// Run CLI commands
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("Failed to load configuration")?;
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    init_logging(&config.observability)?;
    log_config_info(&config);

    match cli.command {
        Commands::Generate { spec, kind, output, encoding } => {
            handle_generate(&config, &spec, &kind, &output, encoding).await
        }
        Commands::Validate { spec, output } => handle_validate(&spec, &output).await,
        Commands::Kinds => {
            for kind in build_registry(&config).kinds() {
                println!("{}", kind);
            }
            Ok(())
        }
    }
}

/// Registry with the built-in generators wired to the configured Vault defaults.
pub fn build_registry(config: &AppConfig) -> GeneratorRegistry {
    let factory = Arc::new(VaultClientFactory::new(config.vault.clone()));
    let mut registry = GeneratorRegistry::new();
    register_builtin(&mut registry, factory, config.value_encoding);
    registry
}

/// Read a payload from a file, or from stdin when `source` is `-`.
pub async fn read_spec(source: &str) -> Result<Vec<u8>> {
    if source == "-" {
        let mut payload = Vec::new();
        tokio::io::stdin()
            .read_to_end(&mut payload)
            .await
            .context("Failed to read payload from stdin")?;
        return Ok(payload);
    }

    let path = Path::new(source);
    tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read payload file: {}", path.display()))
}

async fn handle_generate(
    config: &AppConfig,
    spec: &str,
    kind: &str,
    output: &str,
    encoding: ValueFormat,
) -> Result<()> {
    let format = OutputFormat::parse(output)?;
    let payload = read_spec(spec).await?;
    let registry = build_registry(config);

    let cancel = CancellationToken::new();
    let interrupt = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling in-flight request");
                cancel.cancel();
            }
        }
    });

    let result = registry.generate(kind, &cancel, Some(payload.as_slice())).await;
    interrupt.abort();

    let secret = result.with_context(|| format!("{} generation failed", kind))?;
    let rendered = output::render_secret_data(&secret.data, encoding)?;
    output::print_output(&rendered, format)
}

/// What `validate` reports about a payload.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecSummary {
    pub kind: String,
    pub path: String,
    pub operation: String,
    pub result_type: String,
    pub allow_empty_response: bool,
    pub server: String,
    pub namespace: Option<String>,
    pub auth_method: String,
}

/// Summarize a payload, failing the way generation would before any network call.
pub fn summarize_spec(payload: &[u8]) -> std::result::Result<SpecSummary, GeneratorError> {
    let resource = VaultDynamicSecret::parse(Some(payload))?;
    let descriptor = resource.spec;
    let provider = descriptor.provider.as_ref().ok_or(GeneratorError::MissingProviderConfig)?;
    provider.validate().map_err(|e| GeneratorError::ClientSetup(e.into()))?;
    crate::generator::BackendCall::plan(&descriptor)?;

    Ok(SpecSummary {
        kind: resource.kind,
        path: descriptor.path.clone(),
        operation: descriptor.operation.to_string(),
        result_type: descriptor.result_shape.to_string(),
        allow_empty_response: descriptor.allow_empty_result,
        server: provider.server.clone(),
        namespace: provider.namespace.clone(),
        auth_method: provider.auth.as_ref().map_or("default", |auth| auth.method()).to_string(),
    })
}

async fn handle_validate(spec: &str, output: &str) -> Result<()> {
    let format = OutputFormat::parse(output)?;
    let payload = read_spec(spec).await?;
    let summary = summarize_spec(&payload).context("Invalid payload")?;
    output::print_output(&summary, format)
}

//! Output formatting for CLI commands
//!
//! Generated data is printed as a JSON or YAML document on stdout. Secret
//! bytes are rendered base64 by default; `text` requires valid UTF-8.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::generator::FlatSecretMap;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    /// Parse output format from string
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            _ => anyhow::bail!("Unsupported output format: '{}'. Use 'json' or 'yaml'.", s),
        }
    }
}

/// How secret bytes are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ValueFormat {
    /// Standard base64
    #[default]
    Base64,
    /// UTF-8 text
    Text,
}

/// Render every value of `data` as a string.
pub fn render_secret_data(data: &FlatSecretMap, format: ValueFormat) -> Result<BTreeMap<String, String>> {
    data.iter()
        .map(|(key, bytes)| {
            let rendered = match format {
                ValueFormat::Base64 => STANDARD.encode(bytes),
                ValueFormat::Text => String::from_utf8(bytes.clone())
                    .with_context(|| format!("Value of key '{}' is not valid UTF-8; use --encoding base64", key))?,
            };
            Ok((key.clone(), rendered))
        })
        .collect()
}

/// Print data in the specified OutputFormat
pub fn print_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<()> {
    println!("{}", format_output(data, format)?);
    Ok(())
}

/// Serialize data in the specified OutputFormat
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(data).context("Failed to serialize to JSON"),
        OutputFormat::Yaml => serde_yaml::to_string(data).context("Failed to serialize to YAML"),
    }
}

//! # Observability
//!
//! Structured logging for the generator and CLI.

pub mod logging;

pub use logging::{build_env_filter, init_logging, log_config_info};

//! # Secret Handling
//!
//! Types for credentials that must never reach logs or command output.

pub mod types;

pub use types::SecretString;

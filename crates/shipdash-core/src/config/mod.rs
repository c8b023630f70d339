//! Profile configuration for the shipdash CLI
//!
// Allow nested config module - this is intentional for the config subsystem

#![allow(clippy::module_inception)]
//!
//! Profiles name a dashboard backend, an optional API token and polling
//! defaults. They live in a TOML file in the platform config directory.

pub mod config;
pub mod credential;
pub mod error;

pub use config::{Config, Profile};
pub use credential::{CredentialStore, TOKEN_ENV_VAR};
pub use error::{ConfigError, Result};

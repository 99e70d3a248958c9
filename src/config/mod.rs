//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions and TOML loading
//! - [`env`]: Environment variable overrides (the container contract)
//! - [`defaults`]: Default value functions used by serde
//! - [`validation`]: Startup validation of the merged configuration

mod defaults;
mod env;
mod types;
pub mod validation;

pub use types::{
    Config, CorsConfig, DatabaseBackend, DatabaseConfig, LogFormat, LoggingConfig, MarketConfig,
    MarketProviderKind, SecurityConfig,
};

// src/config/mod.rs

//! Configuration loading and validation for rundag.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate invariants and build the unit graph (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str, parse_and_validate};
pub use model::{
    ConfigFile, ExcludeConfig, IgnoreSection, RawConfigFile, RetryErrorSection, RetrySection,
    RunSection, UnitConfig,
};

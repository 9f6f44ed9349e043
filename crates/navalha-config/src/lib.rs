// SPDX-FileCopyrightText: 2026 Navalha Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Navalha concierge.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, and environment
//! variable overrides.
//!
//! # Usage
//!
//! ```no_run
//! use navalha_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("service: {}", config.service.name);
//! ```

pub mod loader;
pub mod model;
pub mod validation;

pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::NavalhaConfig;
pub use validation::{ConfigError, render_errors, validate_config};

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid [`NavalhaConfig`] or the list of collected errors.
pub fn load_and_validate() -> Result<NavalhaConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError {
            message: err.to_string(),
        }]),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and explicit configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<NavalhaConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(vec![ConfigError {
            message: err.to_string(),
        }]),
    }
}

// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Meterline pipeline.
//!
//! Provides TOML configuration parsing with strict validation (`deny_unknown_fields`),
//! XDG file hierarchy lookup, `METERLINE_*` environment variable overrides, and
//! miette diagnostics with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use meterline_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("ledger: {}", config.ledger.rpc_url);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::MeterlineConfig;

/// Load configuration from the XDG hierarchy and validate it.
///
/// Returns either a valid `MeterlineConfig` or every diagnostic found.
pub fn load_and_validate() -> Result<MeterlineConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(
            err,
            &collect_toml_sources(),
        )),
    }
}

/// Load configuration from a TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<MeterlineConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Collect TOML source file contents for error span resolution.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut candidates = vec![
        std::env::current_dir()
            .map(|d| d.join("meterline.toml"))
            .unwrap_or_else(|_| "meterline.toml".into()),
        std::path::PathBuf::from("/etc/meterline/meterline.toml"),
    ];
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join("meterline/meterline.toml"));
    }

    candidates
        .into_iter()
        .filter_map(|path| {
            std::fs::read_to_string(&path)
                .ok()
                .map(|content| (path.display().to_string(), content))
        })
        .collect()
}

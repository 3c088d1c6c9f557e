// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./meterline.toml` > `~/.config/meterline/meterline.toml` > `/etc/meterline/meterline.toml`
//! with environment variable overrides via `METERLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::MeterlineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/meterline/meterline.toml` (system-wide)
/// 3. `~/.config/meterline/meterline.toml` (user XDG config)
/// 4. `./meterline.toml` (local directory)
/// 5. `METERLINE_*` environment variables
pub fn load_config() -> Result<MeterlineConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<MeterlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MeterlineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<MeterlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(MeterlineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(MeterlineConfig::default()))
        .merge(Toml::file("/etc/meterline/meterline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("meterline/meterline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("meterline.toml"))
        .merge(env_provider())
}

/// Map `METERLINE_<SECTION>_<KEY>` onto `section.key`.
///
/// Uses `Env::map()` rather than `Env::split("_")` so that underscore-containing
/// keys survive: `METERLINE_LEDGER_PAYER_SECRET_KEY` must become
/// `ledger.payer_secret_key`, not `ledger.payer.secret.key`.
fn env_provider() -> Env {
    Env::prefixed("METERLINE_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    const SECTIONS: &[&str] = &["ledger", "signer", "batch", "pricing", "telemetry"];
    for section in SECTIONS {
        if let Some(rest) = key.strip_prefix(section).and_then(|r| r.strip_prefix('_')) {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}

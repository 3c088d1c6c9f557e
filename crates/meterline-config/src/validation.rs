// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as URL schemes, commitment levels, and positive conversion rates.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::{FailurePolicyKind, MeterlineConfig};

const COMMITMENT_LEVELS: &[&str] = &["processed", "confirmed", "finalized"];

/// Upper bound on resubmissions of one digest.
const MAX_RETRIES: u32 = 10;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &MeterlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let rpc_url = config.ledger.rpc_url.trim();
    if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
        fail(format!("ledger.rpc_url must be an http(s) URL, got `{rpc_url}`"));
    }

    if !COMMITMENT_LEVELS.contains(&config.ledger.commitment.as_str()) {
        fail(format!(
            "ledger.commitment must be one of {}, got `{}`",
            COMMITMENT_LEVELS.join(", "),
            config.ledger.commitment
        ));
    }

    if config.ledger.confirm_timeout_secs == 0 {
        fail("ledger.confirm_timeout_secs must be at least 1".to_string());
    }

    if config.ledger.request_timeout_secs == 0 {
        fail("ledger.request_timeout_secs must be at least 1".to_string());
    }

    if let Some(key) = &config.ledger.payer_secret_key
        && key.trim().is_empty()
    {
        fail("ledger.payer_secret_key must be omitted rather than empty".to_string());
    }

    if let Some(key) = &config.signer.secret_key
        && key.trim().is_empty()
    {
        fail("signer.secret_key must be omitted rather than empty".to_string());
    }

    if config.batch.size == 0 {
        fail("batch.size must be at least 1".to_string());
    }

    if config.batch.timeout_secs == 0 {
        fail("batch.timeout_secs must be at least 1".to_string());
    }

    if config.batch.failure_policy == FailurePolicyKind::Retry
        && config.batch.max_retries > MAX_RETRIES
    {
        fail(format!(
            "batch.max_retries must be at most {MAX_RETRIES}, got {}",
            config.batch.max_retries
        ));
    }

    let pricing = &config.pricing;
    if !(pricing.exchange_rate_usd.is_finite() && pricing.exchange_rate_usd > 0.0) {
        fail(format!(
            "pricing.exchange_rate_usd must be positive, got {}",
            pricing.exchange_rate_usd
        ));
    }

    if pricing.units_per_whole == 0 {
        fail("pricing.units_per_whole must be at least 1".to_string());
    }

    if pricing.default_input_per_k < 0.0 || pricing.default_output_per_k < 0.0 {
        fail("pricing default rates must be non-negative".to_string());
    }

    if !(0.0..=1.0).contains(&pricing.tolerance) {
        fail(format!(
            "pricing.tolerance must be between 0 and 1, got {}",
            pricing.tolerance
        ));
    }

    let mut seen_models = HashSet::new();
    for (i, entry) in pricing.models.iter().enumerate() {
        if entry.model.trim().is_empty() {
            fail(format!("pricing.models[{i}].model must not be empty"));
        }
        if !seen_models.insert(entry.model.as_str()) {
            fail(format!(
                "duplicate model `{}` in [[pricing.models]]",
                entry.model
            ));
        }
        if entry.input_per_k < 0.0 || entry.output_per_k < 0.0 {
            fail(format!("pricing.models[{i}] rates must be non-negative"));
        }
    }

    if !LOG_LEVELS.contains(&config.telemetry.log_level.as_str()) {
        fail(format!(
            "telemetry.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.telemetry.log_level
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

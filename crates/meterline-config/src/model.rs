// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Meterline pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Debug placeholder for a configured secret.
const REDACTED: &str = "[redacted]";

fn redact(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| REDACTED)
}

/// Top-level Meterline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MeterlineConfig {
    /// Settlement ledger connection settings.
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Attestation signing key settings.
    #[serde(default)]
    pub signer: SignerConfig,

    /// Batch accumulation settings.
    #[serde(default)]
    pub batch: BatchConfig,

    /// Pricing table and unit conversion settings.
    #[serde(default)]
    pub pricing: PricingConfig,

    /// Logging settings.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Ledger (Solana JSON-RPC) configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint URL.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Commitment level awaited on submission (processed, confirmed, finalized).
    #[serde(default = "default_commitment")]
    pub commitment: String,

    /// Base58 64-byte fee-payer keypair. `None` disables on-chain recording.
    #[serde(default)]
    pub payer_secret_key: Option<String>,

    /// Master switch for on-chain recording.
    #[serde(default = "default_ledger_enabled")]
    pub enabled: bool,

    /// How long to wait for a submitted transaction to reach `commitment`.
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    /// Per-request HTTP timeout.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("rpc_url", &self.rpc_url)
            .field("commitment", &self.commitment)
            .field("payer_secret_key", &redact(&self.payer_secret_key))
            .field("enabled", &self.enabled)
            .field("confirm_timeout_secs", &self.confirm_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            commitment: default_commitment(),
            payer_secret_key: None,
            enabled: default_ledger_enabled(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_rpc_url() -> String {
    "https://api.devnet.solana.com".to_string()
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

fn default_ledger_enabled() -> bool {
    true
}

fn default_confirm_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    10
}

/// Attestation signer configuration.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SignerConfig {
    /// Base58 secret: a 64-byte keypair or a 32-byte seed.
    /// `None` generates an ephemeral keypair at startup.
    #[serde(default)]
    pub secret_key: Option<String>,
}

impl fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConfig")
            .field("secret_key", &redact(&self.secret_key))
            .finish()
    }
}

/// What happens to a batch whose ledger submission fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicyKind {
    /// Discard the batch and report the failure.
    #[default]
    Drop,
    /// Resubmit the same digest up to `max_retries` times, then discard.
    Retry,
}

/// Batch accumulation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Number of attestations that triggers a flush.
    #[serde(default = "default_batch_size")]
    pub size: usize,

    /// Seconds a non-empty batch may wait before it is flushed.
    #[serde(default = "default_batch_timeout_secs")]
    pub timeout_secs: u64,

    /// Behaviour when a flush fails.
    #[serde(default)]
    pub failure_policy: FailurePolicyKind,

    /// Extra submission attempts under the `retry` policy.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between retry attempts in milliseconds.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            size: default_batch_size(),
            timeout_secs: default_batch_timeout_secs(),
            failure_policy: FailurePolicyKind::default(),
            max_retries: default_max_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_batch_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff_ms() -> u64 {
    1_000
}

/// A configured per-model price override.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelPriceOverride {
    /// Exact model id or family prefix.
    pub model: String,
    /// USD per 1,000 input tokens.
    pub input_per_k: f64,
    /// USD per 1,000 output tokens.
    pub output_per_k: f64,
}

/// Pricing and unit conversion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    /// USD value of one whole ledger coin.
    #[serde(default = "default_exchange_rate_usd")]
    pub exchange_rate_usd: f64,

    /// Smallest ledger units per whole coin.
    #[serde(default = "default_units_per_whole")]
    pub units_per_whole: u64,

    /// Fallback input price for unknown models (USD per 1K tokens).
    #[serde(default = "default_input_per_k")]
    pub default_input_per_k: f64,

    /// Fallback output price for unknown models (USD per 1K tokens).
    #[serde(default = "default_output_per_k")]
    pub default_output_per_k: f64,

    /// Relative tolerance for reported-vs-calculated token discrepancies.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Overrides evaluated before the built-in table.
    #[serde(default)]
    pub models: Vec<ModelPriceOverride>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            exchange_rate_usd: default_exchange_rate_usd(),
            units_per_whole: default_units_per_whole(),
            default_input_per_k: default_input_per_k(),
            default_output_per_k: default_output_per_k(),
            tolerance: default_tolerance(),
            models: Vec::new(),
        }
    }
}

fn default_exchange_rate_usd() -> f64 {
    200.0
}

fn default_units_per_whole() -> u64 {
    1_000_000_000
}

fn default_input_per_k() -> f64 {
    0.01
}

fn default_output_per_k() -> f64 {
    0.03
}

fn default_tolerance() -> f64 {
    0.05
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = MeterlineConfig::default();
        config.ledger.payer_secret_key = Some("PayerSecretBase58".into());
        config.signer.secret_key = Some("SignerSecretBase58".into());

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("PayerSecretBase58"));
        assert!(!rendered.contains("SignerSecretBase58"));
        assert!(rendered.contains("[redacted]"));
        assert!(rendered.contains("api.devnet.solana.com"));

        let pretty = format!("{:#?}", config.signer);
        assert!(!pretty.contains("SignerSecretBase58"));
        assert!(format!("{:?}", SignerConfig::default()).contains("None"));
    }

    #[test]
    fn defaults_match_recorder_constants() {
        let config = MeterlineConfig::default();
        assert_eq!(config.batch.size, 10);
        assert_eq!(config.batch.timeout_secs, 30);
        assert_eq!(config.batch.failure_policy, FailurePolicyKind::Drop);
        assert_eq!(config.ledger.commitment, "confirmed");
        assert!(config.ledger.enabled);
        assert!(config.ledger.payer_secret_key.is_none());
        assert!(config.signer.secret_key.is_none());
        assert!((config.pricing.exchange_rate_usd - 200.0).abs() < f64::EPSILON);
        assert_eq!(config.pricing.units_per_whole, 1_000_000_000);
    }

    #[test]
    fn failure_policy_parses_snake_case() {
        let policy: FailurePolicyKind = serde_json::from_str("\"retry\"").unwrap();
        assert_eq!(policy, FailurePolicyKind::Retry);
    }
}

// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Meterline configuration system.

use meterline_config::diagnostic::ConfigError;
use meterline_config::model::{FailurePolicyKind, MeterlineConfig};
use meterline_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known sections deserializes successfully.
#[test]
fn valid_toml_deserializes_into_config() {
    let toml = r#"
[ledger]
rpc_url = "http://127.0.0.1:8899"
commitment = "finalized"
payer_secret_key = "4Z7cXSyeFR8wNGMVXUE1TwtKn5D5Vu7FzEv69dokLv7KrQk7h6pu4LF8ZRR9yQBhc7uSM6RTTZtU1fmaxiNrxXrs"
confirm_timeout_secs = 45

[signer]
secret_key = "5MaiiCavjCmn9Hs1o3eznqDEhRwxo7pXiAYez7keQUviUkauRiTMD8DrESdrNjN8zd9mTmVhRvBJeg5vhyvgrAhG"

[batch]
size = 25
timeout_secs = 5
failure_policy = "retry"
max_retries = 3

[pricing]
exchange_rate_usd = 150.0
tolerance = 0.1

[[pricing.models]]
model = "my-finetune"
input_per_k = 0.002
output_per_k = 0.004

[telemetry]
log_level = "debug"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.ledger.rpc_url, "http://127.0.0.1:8899");
    assert_eq!(config.ledger.commitment, "finalized");
    assert!(config.ledger.payer_secret_key.is_some());
    assert_eq!(config.ledger.confirm_timeout_secs, 45);
    assert!(config.signer.secret_key.is_some());
    assert_eq!(config.batch.size, 25);
    assert_eq!(config.batch.timeout_secs, 5);
    assert_eq!(config.batch.failure_policy, FailurePolicyKind::Retry);
    assert_eq!(config.batch.max_retries, 3);
    assert!((config.pricing.exchange_rate_usd - 150.0).abs() < f64::EPSILON);
    assert_eq!(config.pricing.models.len(), 1);
    assert_eq!(config.pricing.models[0].model, "my-finetune");
    assert_eq!(config.telemetry.log_level, "debug");
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");
    assert_eq!(config.ledger.rpc_url, "https://api.devnet.solana.com");
    assert!(config.ledger.payer_secret_key.is_none());
    assert_eq!(config.batch.size, 10);
    assert_eq!(config.batch.timeout_secs, 30);
    assert_eq!(config.pricing.units_per_whole, 1_000_000_000);
    assert_eq!(config.telemetry.log_level, "info");
}

/// Unknown field in [batch] is rejected by deny_unknown_fields.
#[test]
fn unknown_field_in_batch_produces_error() {
    let toml = r#"
[batch]
siez = 4
"#;
    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("siez"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unexpected top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[storage]
path = "x.db"
"#;
    assert!(load_config_from_str(toml).is_err());
}

/// Dot-notation overrides (as produced by the env provider) win over TOML.
#[test]
fn env_style_override_replaces_toml_value() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: MeterlineConfig = Figment::new()
        .merge(Serialized::defaults(MeterlineConfig::default()))
        .merge(Toml::string("[ledger]\nrpc_url = \"https://from-toml\"\n"))
        .merge(("ledger.payer_secret_key", "from-env"))
        .merge(("ledger.rpc_url", "https://from-env"))
        .extract()
        .expect("should merge env override");

    assert_eq!(config.ledger.rpc_url, "https://from-env");
    assert_eq!(config.ledger.payer_secret_key.as_deref(), Some("from-env"));
}

/// Unknown key diagnostics carry a suggestion and the valid key list.
#[test]
fn diagnostic_error_includes_suggestion_and_valid_keys() {
    let toml = r#"
[batch]
timout_secs = 4
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    let found = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "timout_secs"
                && suggestion.as_deref() == Some("timeout_secs")
                && valid_keys.contains("failure_policy")
        })
    });
    assert!(found, "expected UnknownKey for timout_secs, got: {errors:?}");
}

/// Invalid type (string where number expected) produces a clear message.
#[test]
fn diagnostic_invalid_type_message() {
    let toml = r#"
[batch]
size = "ten"
"#;
    let errors = load_and_validate_str(toml).expect_err("should reject invalid type");
    assert!(
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::InvalidType { key, .. } if key.contains("size"))),
        "got: {errors:?}"
    );
}

/// Semantic validation runs after a successful parse.
#[test]
fn validation_runs_after_parse() {
    let toml = r#"
[ledger]
commitment = "eventually"
"#;
    let errors = load_and_validate_str(toml).expect_err("should fail validation");
    assert!(errors.iter().any(|e| matches!(e, ConfigError::Validation { .. })));
}

/// ConfigError can be rendered using miette's graphical handler.
#[test]
fn config_error_renders_with_miette() {
    use miette::{Diagnostic, GraphicalReportHandler};

    let error = ConfigError::UnknownKey {
        key: "siez".to_string(),
        suggestion: Some("size".to_string()),
        valid_keys: "size, timeout_secs".to_string(),
        span: None,
        src: None,
    };
    assert!(error.code().is_some());
    let help = error.help().expect("should have help").to_string();
    assert!(help.contains("did you mean `size`"), "got: {help}");

    let mut buf = String::new();
    GraphicalReportHandler::new()
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("siez"));
}

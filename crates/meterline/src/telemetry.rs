// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing subscriber setup.

use meterline_core::MeterError;

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence; otherwise Meterline crates log at
/// `log_level` and everything else at `warn`. Fails if a global subscriber
/// is already set.
pub fn init_tracing(log_level: &str) -> Result<(), MeterError> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .try_init()
        .map_err(|e| MeterError::Internal(format!("failed to install tracing subscriber: {e}")))
}

fn default_directives(log_level: &str) -> String {
    [
        "meterline",
        "meterline_core",
        "meterline_config",
        "meterline_tokens",
        "meterline_cost",
        "meterline_signer",
        "meterline_ledger",
        "meterline_recorder",
    ]
    .iter()
    .map(|target| format!("{target}={log_level}"))
    .chain(std::iter::once("warn".to_string()))
    .collect::<Vec<_>>()
    .join(",")
}

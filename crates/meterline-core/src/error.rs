// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Meterline metering pipeline.

use thiserror::Error;

/// The primary error type used across the metering, signing, and ledger crates.
///
/// Anything raised before an attestation is signed is surfaced to the request
/// path. Errors raised while flushing a batch are recovered by the recorder and
/// reported as a failed `RecordResult` instead.
#[derive(Debug, Error)]
pub enum MeterError {
    /// Configuration errors (malformed secret keys, invalid TOML, bad constants).
    ///
    /// Fatal at construction time.
    #[error("configuration error: {0}")]
    Config(String),

    /// The ledger could not be reached during submit or confirm.
    #[error("network error: {message}")]
    Network {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The ledger rejected the transaction.
    #[error("submission error: {message}")]
    Submission { message: String },

    /// Attestation fields are malformed and cannot be canonically serialized.
    #[error("schema error: {0}")]
    Schema(String),

    /// A tokenizer encoding could not be loaded.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MeterError {
    /// Returns `true` for failures that happen while settling on the ledger.
    ///
    /// These never fail the originating request.
    pub fn is_ledger_failure(&self) -> bool {
        matches!(
            self,
            MeterError::Network { .. } | MeterError::Submission { .. } | MeterError::Timeout { .. }
        )
    }
}

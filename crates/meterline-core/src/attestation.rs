// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Usage attestation payloads and their canonical serialization.
//!
//! An attestation is built unsigned, validated, and then consumed by the
//! signer. The signed [`UsageAttestation`] exposes read-only accessors only.

use serde::{Deserialize, Serialize};

use crate::error::MeterError;
use crate::types::Provider;

/// Current attestation schema version.
pub const ATTESTATION_VERSION: u8 = 1;

/// Domain tag prefixed to every canonical attestation message.
const ATTESTATION_TAG: &str = "meterline:attest";

/// Attestation fields prior to signing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedAttestation {
    pub version: u8,
    pub task_id: Option<String>,
    pub agent_wallet: String,
    pub provider: Provider,
    pub model: String,
    /// Hex SHA-256 of the canonicalized request body.
    pub request_hash: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cost_units: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// 256-bit random nonce, hex encoded.
    pub nonce: String,
}

impl UnsignedAttestation {
    /// Reject fields that would make the canonical message ambiguous.
    ///
    /// The model is serialized last, so it is the only free-form field
    /// allowed to contain `:`.
    pub fn validate(&self) -> Result<(), MeterError> {
        if self.version != ATTESTATION_VERSION {
            return Err(MeterError::Schema(format!(
                "unsupported attestation version {}",
                self.version
            )));
        }
        if self.agent_wallet.trim().is_empty() {
            return Err(MeterError::Schema("agent_wallet must not be empty".into()));
        }
        if self.agent_wallet.contains(':') {
            return Err(MeterError::Schema(
                "agent_wallet must not contain ':'".into(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(MeterError::Schema("model must not be empty".into()));
        }
        if let Some(task_id) = &self.task_id {
            if task_id.is_empty() {
                return Err(MeterError::Schema(
                    "task_id must be omitted rather than empty".into(),
                ));
            }
            if task_id.contains(':') {
                return Err(MeterError::Schema("task_id must not contain ':'".into()));
            }
        }
        if self.nonce.len() != 64 || !self.nonce.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(MeterError::Schema(
                "nonce must be 64 hex characters".into(),
            ));
        }
        Ok(())
    }

    /// The exact bytes that are signed.
    pub fn canonical_message(&self) -> String {
        [
            ATTESTATION_TAG.to_string(),
            format!("v{}", self.version),
            self.provider.to_string(),
            self.agent_wallet.clone(),
            self.task_id.clone().unwrap_or_default(),
            self.request_hash.clone(),
            self.input_tokens.to_string(),
            self.output_tokens.to_string(),
            self.cost_units.to_string(),
            self.timestamp.to_string(),
            self.nonce.clone(),
            self.model.clone(),
        ]
        .join(":")
    }

    /// Attach a signature produced over [`canonical_message`](Self::canonical_message).
    pub fn into_signed(self, signature: String) -> UsageAttestation {
        UsageAttestation {
            version: self.version,
            task_id: self.task_id,
            agent_wallet: self.agent_wallet,
            provider: self.provider,
            model: self.model,
            request_hash: self.request_hash,
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            cost_units: self.cost_units,
            timestamp: self.timestamp,
            nonce: self.nonce,
            signature,
        }
    }
}

/// A signed, timestamped, nonced claim of token usage for one exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageAttestation {
    version: u8,
    task_id: Option<String>,
    agent_wallet: String,
    provider: Provider,
    model: String,
    request_hash: String,
    input_tokens: u64,
    output_tokens: u64,
    cost_units: u64,
    timestamp: u64,
    nonce: String,
    /// Base58 Ed25519 signature over the canonical message.
    signature: String,
}

impl UsageAttestation {
    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    pub fn agent_wallet(&self) -> &str {
        &self.agent_wallet
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn request_hash(&self) -> &str {
        &self.request_hash
    }

    pub fn input_tokens(&self) -> u64 {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> u64 {
        self.output_tokens
    }

    pub fn cost_units(&self) -> u64 {
        self.cost_units
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Rebuild the unsigned view, e.g. to recompute the canonical message.
    pub fn unsigned(&self) -> UnsignedAttestation {
        UnsignedAttestation {
            version: self.version,
            task_id: self.task_id.clone(),
            agent_wallet: self.agent_wallet.clone(),
            provider: self.provider,
            model: self.model.clone(),
            request_hash: self.request_hash.clone(),
            input_tokens: self.input_tokens,
            output_tokens: self.output_tokens,
            cost_units: self.cost_units,
            timestamp: self.timestamp,
            nonce: self.nonce.clone(),
        }
    }

    /// Canonical message this attestation's signature covers.
    pub fn canonical_message(&self) -> String {
        self.unsigned().canonical_message()
    }
}

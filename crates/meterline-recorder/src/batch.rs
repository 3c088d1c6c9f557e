// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Accumulated attestations and their compact ledger digest.

use serde::Serialize;
use tokio::time::Instant;

use meterline_core::UsageAttestation;
use meterline_signer::hash_data;

/// Memo digest prefix and format version.
const DIGEST_TAG: &str = "meterline|v1";

/// Hex characters of the signature hash kept in the digest.
const SIG_HASH_LEN: usize = 16;

/// Attestations awaiting one ledger submission.
///
/// Running totals are updated on every push and equal the sums over
/// `records`, saturating at `u64::MAX`.
#[derive(Debug, Default)]
pub struct Batch {
    records: Vec<UsageAttestation>,
    total_input_tokens: u64,
    total_output_tokens: u64,
    started_at: Option<Instant>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// A batch holding a single record.
    pub fn single(attestation: UsageAttestation) -> Self {
        let mut batch = Self::new();
        batch.push(attestation);
        batch
    }

    pub fn push(&mut self, attestation: UsageAttestation) {
        if self.records.is_empty() {
            self.started_at = Some(Instant::now());
        }
        self.total_input_tokens = self
            .total_input_tokens
            .saturating_add(attestation.input_tokens());
        self.total_output_tokens = self
            .total_output_tokens
            .saturating_add(attestation.output_tokens());
        self.records.push(attestation);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[UsageAttestation] {
        &self.records
    }

    pub fn total_input_tokens(&self) -> u64 {
        self.total_input_tokens
    }

    pub fn total_output_tokens(&self) -> u64 {
        self.total_output_tokens
    }

    /// Time since the first record was added.
    pub fn age(&self) -> Option<std::time::Duration> {
        self.started_at.map(|t| t.elapsed())
    }

    pub fn pending(&self) -> PendingBatch {
        PendingBatch {
            count: self.records.len(),
            total_tokens: self
                .total_input_tokens
                .saturating_add(self.total_output_tokens),
            total_input_tokens: self.total_input_tokens,
            total_output_tokens: self.total_output_tokens,
        }
    }

    /// Compact digest written to the ledger:
    /// `meterline|v1|{count}|{sigHash16}|{totalIn}|{totalOut}|{timestamp base36}`.
    pub fn memo_digest(&self, timestamp_ms: u64) -> String {
        let signatures: String = self.records.iter().map(|r| r.signature()).collect();
        let sig_hash = hash_data(signatures.as_bytes());
        format!(
            "{DIGEST_TAG}|{}|{}|{}|{}|{}",
            self.records.len(),
            &sig_hash[..SIG_HASH_LEN],
            self.total_input_tokens,
            self.total_output_tokens,
            to_base36(timestamp_ms)
        )
    }
}

/// Snapshot of the live batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PendingBatch {
    pub count: usize,
    pub total_tokens: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
}

/// Lowercase base-36 rendering of `n`.
pub fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

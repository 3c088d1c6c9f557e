// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch size, deadline, and failure handling settings.

use std::time::Duration;

use meterline_config::model::{BatchConfig, FailurePolicyKind};

/// Flush when this many attestations have accumulated.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Flush a non-empty batch this long after its first record.
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// What a flush does when ledger submission fails.
///
/// Neither policy requeues records into the live batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushFailurePolicy {
    /// Discard the batch, log it, and report the failure.
    #[default]
    Drop,
    /// Resubmit the same digest up to `max_retries` more times, then drop.
    Retry { max_retries: u32, backoff: Duration },
}

impl FlushFailurePolicy {
    /// Total submission attempts per flush.
    pub fn attempts(&self) -> u32 {
        match self {
            FlushFailurePolicy::Drop => 1,
            FlushFailurePolicy::Retry { max_retries, .. } => max_retries.saturating_add(1),
        }
    }

    pub fn backoff(&self) -> Duration {
        match self {
            FlushFailurePolicy::Drop => Duration::ZERO,
            FlushFailurePolicy::Retry { backoff, .. } => *backoff,
        }
    }
}

/// Recorder tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecorderSettings {
    pub batch_size: usize,
    pub batch_timeout: Duration,
    pub failure_policy: FlushFailurePolicy,
}

impl Default for RecorderSettings {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
            failure_policy: FlushFailurePolicy::Drop,
        }
    }
}

impl RecorderSettings {
    pub fn from_config(config: &BatchConfig) -> Self {
        let failure_policy = match config.failure_policy {
            FailurePolicyKind::Drop => FlushFailurePolicy::Drop,
            FailurePolicyKind::Retry => FlushFailurePolicy::Retry {
                max_retries: config.max_retries,
                backoff: Duration::from_millis(config.retry_backoff_ms),
            },
        };
        Self {
            // Validation rejects zero; clamp anyway for hand-built configs.
            batch_size: config.size.max(1),
            batch_timeout: Duration::from_secs(config.timeout_secs),
            failure_policy,
        }
    }
}

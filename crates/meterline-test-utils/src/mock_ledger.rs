// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock ledger adapter for deterministic testing.
//!
//! `MockLedger` implements `LedgerAdapter` in memory, capturing every
//! submitted memo and failing on demand.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use meterline_core::traits::{LedgerAdapter, PluginAdapter};
use meterline_core::MeterError;

/// An in-memory ledger that records memos instead of submitting them.
///
/// Queued failures are consumed one per submission attempt, before
/// `fail_always` is consulted.
pub struct MockLedger {
    memos: Mutex<Vec<String>>,
    queued_failures: Mutex<VecDeque<String>>,
    fail_always: AtomicBool,
    slot_unavailable: AtomicBool,
    slot: AtomicU64,
    attempts: AtomicUsize,
    submit_delay: Mutex<Option<Duration>>,
}

impl MockLedger {
    /// Create a ledger that accepts every memo.
    pub fn new() -> Self {
        Self {
            memos: Mutex::new(Vec::new()),
            queued_failures: Mutex::new(VecDeque::new()),
            fail_always: AtomicBool::new(false),
            slot_unavailable: AtomicBool::new(false),
            slot: AtomicU64::new(1_000),
            attempts: AtomicUsize::new(0),
            submit_delay: Mutex::new(None),
        }
    }

    /// Create a ledger whose first submissions fail with the given messages.
    pub fn with_failures(messages: Vec<String>) -> Self {
        let mut ledger = Self::new();
        ledger.queued_failures = Mutex::new(VecDeque::from(messages));
        ledger
    }

    /// Reject every submission until switched off.
    pub fn set_fail_always(&self, fail: bool) {
        self.fail_always.store(fail, Ordering::SeqCst);
    }

    /// Make `current_slot` fail with a network error.
    pub fn set_slot_unavailable(&self, unavailable: bool) {
        self.slot_unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn set_slot(&self, slot: u64) {
        self.slot.store(slot, Ordering::SeqCst);
    }

    /// Sleep this long inside every submission.
    pub async fn set_submit_delay(&self, delay: Duration) {
        *self.submit_delay.lock().await = Some(delay);
    }

    /// Memos accepted so far, in submission order.
    pub async fn memos(&self) -> Vec<String> {
        self.memos.lock().await.clone()
    }

    /// Number of submission attempts, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginAdapter for MockLedger {
    fn name(&self) -> &str {
        "mock-ledger"
    }
}

#[async_trait]
impl LedgerAdapter for MockLedger {
    async fn submit_memo(&self, memo: &str) -> Result<String, MeterError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let delay = *self.submit_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(message) = self.queued_failures.lock().await.pop_front() {
            return Err(MeterError::Submission { message });
        }
        if self.fail_always.load(Ordering::SeqCst) {
            return Err(MeterError::Network {
                message: "mock ledger unreachable".into(),
                source: None,
            });
        }

        let mut memos = self.memos.lock().await;
        memos.push(memo.to_string());
        Ok(format!("mock-tx-{}", memos.len()))
    }

    async fn current_slot(&self) -> Result<u64, MeterError> {
        if self.slot_unavailable.load(Ordering::SeqCst) {
            return Err(MeterError::Network {
                message: "mock ledger unreachable".into(),
                source: None,
            });
        }
        Ok(self.slot.load(Ordering::SeqCst))
    }
}

// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batching recorder that settles attestation digests on the ledger.
//!
//! `record` never awaits the network: it appends under a short lock and, when
//! the batch is full, swaps it out and flushes it on a tracked background
//! task. The first record of a batch arms a deadline task tied to that
//! batch's generation; any swap cancels it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use meterline_core::{LedgerAdapter, MeterError, PluginAdapter, UsageAttestation};
use meterline_signer::now_millis;

use crate::batch::{Batch, PendingBatch};
use crate::policy::RecorderSettings;

/// Outcome of a record, flush, or close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordResult {
    /// Recording is switched off. Success.
    Disabled,
    /// Appended to the live batch.
    Batched { pending: usize },
    /// The append filled the batch; it is being flushed in the background.
    FlushScheduled { records: usize },
    /// The digest was confirmed on the ledger.
    Submitted { tx_id: String, records: usize },
    /// There was nothing to flush.
    Empty,
    Failed { error: String },
}

impl RecordResult {
    pub fn is_success(&self) -> bool {
        !matches!(self, RecordResult::Failed { .. })
    }

    /// Ledger transaction id, for `Submitted`.
    pub fn tx_id(&self) -> Option<&str> {
        match self {
            RecordResult::Submitted { tx_id, .. } => Some(tx_id),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RecordResult::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// Ledger connectivity snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerStatus {
    pub enabled: bool,
    pub connected: bool,
    pub slot: Option<u64>,
    pub error: Option<String>,
}

/// Flush counters since the recorder was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FlushStats {
    pub batches_flushed: u64,
    pub records_submitted: u64,
    pub batches_failed: u64,
    pub records_dropped: u64,
}

#[derive(Default)]
struct StatCounters {
    batches_flushed: AtomicU64,
    records_submitted: AtomicU64,
    batches_failed: AtomicU64,
    records_dropped: AtomicU64,
}

struct LiveState {
    batch: Batch,
    /// Incremented on every swap; a deadline task only flushes its own generation.
    generation: u64,
    timer: Option<CancellationToken>,
    closed: bool,
}

impl LiveState {
    /// Replace the live batch with an empty one and disarm its deadline.
    fn swap(&mut self) -> Batch {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
        self.generation = self.generation.wrapping_add(1);
        std::mem::take(&mut self.batch)
    }
}

struct Inner {
    state: Mutex<LiveState>,
    ledger: Option<Arc<dyn LedgerAdapter>>,
    settings: RecorderSettings,
    runtime: Option<Handle>,
    tracker: TaskTracker,
    stats: StatCounters,
}

/// Accumulates attestations and submits one digest per batch.
///
/// Cloning yields another handle to the same recorder.
#[derive(Clone)]
pub struct BatchRecorder {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BatchRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchRecorder")
            .field("enabled", &self.is_enabled())
            .field("settings", &self.inner.settings)
            .finish_non_exhaustive()
    }
}

impl BatchRecorder {
    /// Create a recorder that settles on `ledger`.
    ///
    /// Must be called from within a Tokio runtime, which runs the deadline
    /// and background flush tasks.
    pub fn new(
        ledger: Arc<dyn LedgerAdapter>,
        settings: RecorderSettings,
    ) -> Result<Self, MeterError> {
        let runtime = Handle::try_current().map_err(|e| {
            MeterError::Internal(format!("batch recorder requires a Tokio runtime: {e}"))
        })?;
        debug!(
            ledger = ledger.name(),
            batch_size = settings.batch_size,
            timeout = ?settings.batch_timeout,
            "batch recorder started"
        );
        Ok(Self::build(Some(ledger), settings, Some(runtime)))
    }

    /// Create a recorder that records nothing and reports `Disabled`.
    pub fn disabled() -> Self {
        Self::build(None, RecorderSettings::default(), None)
    }

    fn build(
        ledger: Option<Arc<dyn LedgerAdapter>>,
        settings: RecorderSettings,
        runtime: Option<Handle>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(LiveState {
                    batch: Batch::new(),
                    generation: 0,
                    timer: None,
                    closed: false,
                }),
                ledger,
                settings,
                runtime,
                tracker: TaskTracker::new(),
                stats: StatCounters::default(),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.ledger.is_some()
    }

    pub fn settings(&self) -> &RecorderSettings {
        &self.inner.settings
    }

    /// Append an attestation to the live batch.
    pub fn record(&self, attestation: UsageAttestation) -> RecordResult {
        let (Some(_), Some(runtime)) = (&self.inner.ledger, &self.inner.runtime) else {
            return RecordResult::Disabled;
        };

        let mut state = self.inner.lock_state();
        if state.closed {
            return closed_result();
        }

        state.batch.push(attestation);

        if state.batch.len() >= self.inner.settings.batch_size {
            let full = state.swap();
            drop(state);
            let records = full.len();
            debug!(records, "batch full, scheduling flush");
            let inner = Arc::clone(&self.inner);
            self.inner.tracker.spawn_on(
                async move {
                    inner.submit(full).await;
                },
                runtime,
            );
            return RecordResult::FlushScheduled { records };
        }

        if state.timer.is_none() {
            let token = CancellationToken::new();
            state.timer = Some(token.clone());
            let generation = state.generation;
            let inner = Arc::clone(&self.inner);
            self.inner
                .tracker
                .spawn_on(inner.deadline(generation, token), runtime);
        }

        let pending = state.batch.len();
        debug!(pending, "attestation batched");
        RecordResult::Batched { pending }
    }

    /// Swap out the live batch and submit it now.
    pub async fn flush(&self) -> RecordResult {
        if !self.is_enabled() {
            return RecordResult::Disabled;
        }
        let batch = self.inner.lock_state().swap();
        self.inner.submit(batch).await
    }

    /// Submit a single attestation without batching.
    pub async fn record_immediate(&self, attestation: UsageAttestation) -> RecordResult {
        if !self.is_enabled() {
            return RecordResult::Disabled;
        }
        if self.inner.lock_state().closed {
            return closed_result();
        }
        self.inner.submit(Batch::single(attestation)).await
    }

    /// Ledger connectivity. Never fails.
    pub async fn status(&self) -> LedgerStatus {
        let Some(ledger) = &self.inner.ledger else {
            return LedgerStatus {
                enabled: false,
                connected: false,
                slot: None,
                error: None,
            };
        };
        match ledger.current_slot().await {
            Ok(slot) => LedgerStatus {
                enabled: true,
                connected: true,
                slot: Some(slot),
                error: None,
            },
            Err(e) => LedgerStatus {
                enabled: true,
                connected: false,
                slot: None,
                error: Some(e.to_string()),
            },
        }
    }

    /// Snapshot of the live batch.
    pub fn pending_batch(&self) -> PendingBatch {
        self.inner.lock_state().batch.pending()
    }

    pub fn stats(&self) -> FlushStats {
        let s = &self.inner.stats;
        FlushStats {
            batches_flushed: s.batches_flushed.load(Ordering::Relaxed),
            records_submitted: s.records_submitted.load(Ordering::Relaxed),
            batches_failed: s.batches_failed.load(Ordering::Relaxed),
            records_dropped: s.records_dropped.load(Ordering::Relaxed),
        }
    }

    /// Flush the live batch, wait for in-flight flushes, and stop accepting
    /// records. Returns the result of the final flush.
    pub async fn close(&self) -> RecordResult {
        let batch = {
            let mut state = self.inner.lock_state();
            state.closed = true;
            state.swap()
        };

        let result = if self.is_enabled() {
            self.inner.submit(batch).await
        } else {
            RecordResult::Disabled
        };

        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        info!(stats = ?self.stats(), "batch recorder closed");
        result
    }
}

fn closed_result() -> RecordResult {
    RecordResult::Failed {
        error: "recorder closed".into(),
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, LiveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Deadline task for the batch of `generation`.
    async fn deadline(self: Arc<Self>, generation: u64, token: CancellationToken) {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(self.settings.batch_timeout) => {
                let batch = {
                    let mut state = self.lock_state();
                    if state.generation != generation || state.batch.is_empty() {
                        return;
                    }
                    state.swap()
                };
                debug!(records = batch.len(), "batch deadline reached");
                self.submit(batch).await;
            }
        }
    }

    /// Submit one digest for `batch`, applying the failure policy.
    async fn submit(&self, batch: Batch) -> RecordResult {
        let Some(ledger) = &self.ledger else {
            return RecordResult::Disabled;
        };
        if batch.is_empty() {
            return RecordResult::Empty;
        }

        let records = batch.len();
        let memo = batch.memo_digest(now_millis());
        let policy = self.settings.failure_policy;
        let attempts = policy.attempts();
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            if attempt > 1 {
                warn!(attempt, records, "retrying batch submission");
                tokio::time::sleep(policy.backoff()).await;
            }

            match ledger.submit_memo(&memo).await {
                Ok(tx_id) => {
                    self.stats.batches_flushed.fetch_add(1, Ordering::Relaxed);
                    self.stats
                        .records_submitted
                        .fetch_add(records as u64, Ordering::Relaxed);
                    info!(
                        records,
                        tx_id = %tx_id,
                        total_input_tokens = batch.total_input_tokens(),
                        total_output_tokens = batch.total_output_tokens(),
                        age = ?batch.age(),
                        "batch recorded on ledger"
                    );
                    return RecordResult::Submitted { tx_id, records };
                }
                Err(e) => {
                    warn!(attempt, attempts, error = %e, "batch submission failed");
                    last_error = e.to_string();
                }
            }
        }

        self.stats.batches_failed.fetch_add(1, Ordering::Relaxed);
        self.stats
            .records_dropped
            .fetch_add(records as u64, Ordering::Relaxed);
        error!(records, error = %last_error, "dropping batch after failed submission");
        RecordResult::Failed { error: last_error }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use meterline_test_utils::{MockLedger, signed_attestation, test_signer};
    use tracing_test::traced_test;

    use super::*;
    use crate::policy::FlushFailurePolicy;

    fn settings(batch_size: usize) -> RecorderSettings {
        RecorderSettings {
            batch_size,
            ..RecorderSettings::default()
        }
    }

    fn recorder(ledger: &Arc<MockLedger>, settings: RecorderSettings) -> BatchRecorder {
        BatchRecorder::new(Arc::clone(ledger) as Arc<dyn LedgerAdapter>, settings).unwrap()
    }

    fn digest_count(memo: &str) -> usize {
        memo.split('|').nth(2).unwrap().parse().unwrap()
    }

    #[test]
    fn new_requires_runtime() {
        let ledger: Arc<dyn LedgerAdapter> = Arc::new(MockLedger::new());
        let err = BatchRecorder::new(ledger, RecorderSettings::default()).unwrap_err();
        assert!(matches!(err, MeterError::Internal(_)));
    }

    #[tokio::test]
    async fn disabled_recorder_reports_disabled() {
        let signer = test_signer();
        let recorder = BatchRecorder::disabled();
        assert!(!recorder.is_enabled());
        assert_eq!(
            recorder.record(signed_attestation(&signer, 5, 5)),
            RecordResult::Disabled
        );
        assert_eq!(recorder.pending_batch().count, 0);
        assert_eq!(recorder.flush().await, RecordResult::Disabled);
        assert!(RecordResult::Disabled.is_success());

        let status = recorder.status().await;
        assert!(!status.enabled);
        assert!(!status.connected);
        assert!(status.error.is_none());
        assert_eq!(recorder.close().await, RecordResult::Disabled);
    }

    #[tokio::test(start_paused = true)]
    async fn full_batch_flushes_in_background() {
        let signer = test_signer();
        let ledger = Arc::new(MockLedger::new());
        let recorder = recorder(&ledger, settings(3));

        assert_eq!(
            recorder.record(signed_attestation(&signer, 10, 1)),
            RecordResult::Batched { pending: 1 }
        );
        assert_eq!(
            recorder.record(signed_attestation(&signer, 10, 1)),
            RecordResult::Batched { pending: 2 }
        );
        assert_eq!(
            recorder.record(signed_attestation(&signer, 10, 1)),
            RecordResult::FlushScheduled { records: 3 }
        );
        assert_eq!(recorder.pending_batch().count, 0);

        assert_eq!(recorder.close().await, RecordResult::Empty);
        let memos = ledger.memos().await;
        assert_eq!(memos.len(), 1);
        assert_eq!(digest_count(&memos[0]), 3);
        assert_eq!(recorder.stats().records_submitted, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_flushes_partial_batch() {
        let signer = test_signer();
        let ledger = Arc::new(MockLedger::new());
        let recorder = recorder(&ledger, settings(10));

        recorder.record(signed_attestation(&signer, 40, 2));
        recorder.record(signed_attestation(&signer, 60, 3));

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert!(ledger.memos().await.is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        let memos = ledger.memos().await;
        assert_eq!(memos.len(), 1);
        assert_eq!(digest_count(&memos[0]), 2);
        assert!(memos[0].contains("|100|5|"));
        assert_eq!(recorder.pending_batch().count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn manual_flush_disarms_deadline_and_rearms_for_next_batch() {
        let signer = test_signer();
        let ledger = Arc::new(MockLedger::new());
        let recorder = recorder(&ledger, settings(10));

        recorder.record(signed_attestation(&signer, 1, 1));
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(matches!(
            recorder.flush().await,
            RecordResult::Submitted { records: 1, .. }
        ));

        recorder.record(signed_attestation(&signer, 2, 2));

        // The first batch's deadline (t=30s) is gone.
        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(ledger.memos().await.len(), 1);
        assert_eq!(recorder.pending_batch().count, 1);

        // The second batch's deadline lands at t=40s.
        tokio::time::sleep(Duration::from_secs(6)).await;
        let memos = ledger.memos().await;
        assert_eq!(memos.len(), 2);
        assert_eq!(digest_count(&memos[1]), 1);
        assert!(memos[1].contains("|2|2|"));
    }

    #[tokio::test(start_paused = true)]
    async fn flush_of_empty_batch_is_empty() {
        let ledger = Arc::new(MockLedger::new());
        let recorder = recorder(&ledger, settings(10));
        assert_eq!(recorder.flush().await, RecordResult::Empty);
        assert_eq!(ledger.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn drop_policy_discards_after_one_attempt() {
        let signer = test_signer();
        let ledger = Arc::new(MockLedger::new());
        ledger.set_fail_always(true);
        let recorder = recorder(&ledger, settings(10));

        recorder.record(signed_attestation(&signer, 1, 1));
        recorder.record(signed_attestation(&signer, 1, 1));
        let result = recorder.flush().await;

        assert!(!result.is_success());
        assert!(result.error().unwrap().contains("unreachable"));
        assert_eq!(ledger.attempts(), 1);
        assert_eq!(recorder.pending_batch().count, 0);
        assert_eq!(
            recorder.stats(),
            FlushStats {
                batches_flushed: 0,
                records_submitted: 0,
                batches_failed: 1,
                records_dropped: 2,
            }
        );
        assert!(logs_contain("dropping batch after failed submission"));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_policy_exhausts_attempts() {
        let signer = test_signer();
        let ledger = Arc::new(MockLedger::new());
        ledger.set_fail_always(true);
        let recorder = recorder(
            &ledger,
            RecorderSettings {
                failure_policy: FlushFailurePolicy::Retry {
                    max_retries: 2,
                    backoff: Duration::from_millis(100),
                },
                ..settings(10)
            },
        );

        recorder.record(signed_attestation(&signer, 1, 1));
        assert!(!recorder.flush().await.is_success());
        assert_eq!(ledger.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_policy_recovers_from_transient_failure() {
        let signer = test_signer();
        let ledger = Arc::new(MockLedger::with_failures(vec!["blockhash expired".into()]));
        let recorder = recorder(
            &ledger,
            RecorderSettings {
                failure_policy: FlushFailurePolicy::Retry {
                    max_retries: 2,
                    backoff: Duration::from_millis(100),
                },
                ..settings(10)
            },
        );

        recorder.record(signed_attestation(&signer, 1, 1));
        let result = recorder.flush().await;
        assert_eq!(result.tx_id(), Some("mock-tx-1"));
        assert_eq!(ledger.attempts(), 2);
        assert_eq!(recorder.stats().batches_failed, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_record_bypasses_live_batch() {
        let signer = test_signer();
        let ledger = Arc::new(MockLedger::new());
        let recorder = recorder(&ledger, settings(10));

        recorder.record(signed_attestation(&signer, 1, 1));
        let result = recorder
            .record_immediate(signed_attestation(&signer, 7, 3))
            .await;

        assert_eq!(
            result,
            RecordResult::Submitted {
                tx_id: "mock-tx-1".into(),
                records: 1,
            }
        );
        assert!(ledger.memos().await[0].contains("|1|"));
        assert_eq!(recorder.pending_batch().count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn close_flushes_and_rejects_further_records() {
        let signer = test_signer();
        let ledger = Arc::new(MockLedger::new());
        let recorder = recorder(&ledger, settings(10));

        recorder.record(signed_attestation(&signer, 3, 3));
        recorder.record(signed_attestation(&signer, 4, 4));
        assert!(matches!(
            recorder.close().await,
            RecordResult::Submitted { records: 2, .. }
        ));

        let rejected = recorder.record(signed_attestation(&signer, 1, 1));
        assert_eq!(rejected.error(), Some("recorder closed"));
        let rejected = recorder
            .record_immediate(signed_attestation(&signer, 1, 1))
            .await;
        assert!(!rejected.is_success());
        assert_eq!(ledger.memos().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn close_waits_for_background_flush() {
        let signer = test_signer();
        let ledger = Arc::new(MockLedger::new());
        ledger.set_submit_delay(Duration::from_secs(5)).await;
        let recorder = recorder(&ledger, settings(2));

        recorder.record(signed_attestation(&signer, 1, 1));
        recorder.record(signed_attestation(&signer, 1, 1));
        recorder.record(signed_attestation(&signer, 1, 1));

        assert!(matches!(
            recorder.close().await,
            RecordResult::Submitted { records: 1, .. }
        ));
        assert_eq!(ledger.memos().await.len(), 2);
        assert_eq!(recorder.stats().records_submitted, 3);
    }

    #[tokio::test]
    async fn status_reflects_ledger_reachability() {
        let ledger = Arc::new(MockLedger::new());
        ledger.set_slot(42);
        let recorder = recorder(&ledger, settings(10));

        let status = recorder.status().await;
        assert!(status.enabled && status.connected);
        assert_eq!(status.slot, Some(42));

        ledger.set_slot_unavailable(true);
        let status = recorder.status().await;
        assert!(status.enabled);
        assert!(!status.connected);
        assert!(status.slot.is_none());
        assert!(status.error.unwrap().contains("unreachable"));
    }

    #[tokio::test(start_paused = true)]
    async fn pending_batch_totals() {
        let signer = test_signer();
        let ledger = Arc::new(MockLedger::new());
        let recorder = recorder(&ledger, settings(10));

        recorder.record(signed_attestation(&signer, 120, 30));
        recorder.record(signed_attestation(&signer, 80, 20));
        let pending = recorder.pending_batch();
        assert_eq!(pending.count, 2);
        assert_eq!(pending.total_input_tokens, 200);
        assert_eq!(pending.total_output_tokens, 50);
        assert_eq!(pending.total_tokens, 250);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_counts_batch_and_flush_without_panicking() {
        let signer = test_signer();
        let ledger = Arc::new(MockLedger::new());
        let recorder = recorder(&ledger, settings(10));
        let half = u64::MAX / 2 + 1;

        recorder.record(signed_attestation(&signer, half, 0));
        recorder.record(signed_attestation(&signer, half, 0));
        let pending = recorder.pending_batch();
        assert_eq!(pending.count, 2);
        assert_eq!(pending.total_input_tokens, u64::MAX);

        assert!(matches!(
            recorder.flush().await,
            RecordResult::Submitted { records: 2, .. }
        ));
        let memos = ledger.memos().await;
        assert!(memos[0].contains(&u64::MAX.to_string()));
    }
}

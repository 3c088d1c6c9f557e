// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batches signed usage attestations and settles one digest per batch on the
//! ledger.
//!
//! A batch flushes when it reaches the configured size or when its deadline
//! passes, whichever comes first. Each flush submits a single memo of the form
//! `meterline|v1|{count}|{sigHash16}|{totalIn}|{totalOut}|{timestamp base36}`.

pub mod batch;
pub mod policy;
pub mod recorder;

pub use batch::{Batch, PendingBatch, to_base36};
pub use policy::{DEFAULT_BATCH_SIZE, DEFAULT_BATCH_TIMEOUT, FlushFailurePolicy, RecorderSettings};
pub use recorder::{BatchRecorder, FlushStats, LedgerStatus, RecordResult};

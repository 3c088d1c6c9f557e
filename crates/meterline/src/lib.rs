// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request AI usage metering.
//!
//! A [`MeteringContext`] is built once at startup from [`MeterlineConfig`] and
//! shared by reference. Each completed provider exchange goes through
//! [`MeteringContext::record_usage`]: it is counted, priced, signed into a
//! [`UsageAttestation`], and handed to the batching recorder that settles
//! digests on the ledger.
//!
//! ```no_run
//! # async fn run() -> Result<(), meterline::MeterError> {
//! use meterline::{MeteringContext, MeterlineConfig};
//!
//! let ctx = MeteringContext::from_config(&MeterlineConfig::default())?;
//! // ... ctx.record_usage(exchange, false).await? per request ...
//! ctx.close().await;
//! # Ok(())
//! # }
//! ```

pub mod attestation;
pub mod context;
pub mod telemetry;

pub use attestation::{AttestationBuilder, AttestationReceipt};
pub use context::{MeteringContext, UsageReceipt};
pub use telemetry::init_tracing;

pub use meterline_config::MeterlineConfig;
pub use meterline_core::{
    CompletedExchange, CostBreakdown, MeterError, Message, Provider, UsageAttestation,
};
pub use meterline_cost::UsageDiscrepancy;
pub use meterline_recorder::{LedgerStatus, PendingBatch, RecordResult};
pub use meterline_signer::{AgentSigner, verify_attestation};

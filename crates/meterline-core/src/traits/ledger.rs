// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ledger adapter trait for the append-only settlement ledger.

use async_trait::async_trait;

use crate::error::MeterError;
use crate::traits::adapter::PluginAdapter;

/// Adapter for the external append-only ledger.
///
/// The ledger accepts one small opaque memo per transaction. Submission
/// resolves only once the transaction is confirmed.
#[async_trait]
pub trait LedgerAdapter: PluginAdapter {
    /// Submit a memo, wait for confirmation, and return the transaction id.
    async fn submit_memo(&self, memo: &str) -> Result<String, MeterError>;

    /// Current ledger height (slot). Used for connectivity checks.
    async fn current_slot(&self) -> Result<u64, MeterError>;
}

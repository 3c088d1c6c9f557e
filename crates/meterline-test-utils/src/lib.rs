// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Meterline integration tests.
//!
//! Provides a mock ledger and attestation fixtures for fast, deterministic,
//! CI-runnable tests without a Solana endpoint.
//!
//! # Components
//!
//! - [`MockLedger`] - In-memory ledger with memo capture and failure injection
//! - [`fixtures`] - Signers, attestations, and completed exchanges

pub mod fixtures;
pub mod mock_ledger;

pub use fixtures::{openai_exchange, signed_attestation, test_signer, unsigned_attestation};
pub use mock_ledger::MockLedger;

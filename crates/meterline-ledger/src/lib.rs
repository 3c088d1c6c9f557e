// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Solana settlement ledger for Meterline batch digests.
//!
//! Implements [`LedgerAdapter`](meterline_core::LedgerAdapter) by writing each
//! digest as a memo-program instruction, sent and confirmed through the
//! Solana RPC client.

pub mod error;
pub mod memo;
pub mod solana;

pub use memo::{MEMO_PROGRAM_ID, PACKET_DATA_SIZE, memo_transaction};
pub use solana::{Commitment, SolanaLedger, decode_payer_key};

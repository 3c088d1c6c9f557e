// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Meterline usage-metering pipeline.
//!
//! This crate provides the error type, the shared domain types, the
//! attestation payload, and the adapter traits for external collaborators.

pub mod attestation;
pub mod error;
pub mod traits;
pub mod types;

pub use attestation::{ATTESTATION_VERSION, UnsignedAttestation, UsageAttestation};
pub use error::MeterError;
pub use traits::{LedgerAdapter, PluginAdapter};
pub use types::{
    CompletedExchange, ContentBlock, CostBreakdown, Message, MessageContent, Provider, Role,
};

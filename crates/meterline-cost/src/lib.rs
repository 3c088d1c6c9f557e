// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pricing and usage validation for metered exchanges.
//!
//! This crate provides:
//! - **Pricing**: ordered per-model price table with configured overrides
//! - **Cost conversion**: USD to ledger units, always rounded up
//! - **Usage validation**: tolerance checks against provider-reported counts

pub mod pricing;
pub mod usage;

pub use pricing::{BUILTIN_PRICES, ModelPricing, PricingEngine, format_cost};
pub use usage::{DEFAULT_TOLERANCE, UsageDiscrepancy, check_usage, validate_provider_usage};

// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic token accounting for metered exchanges.
//!
//! [`TokenCounter`] gives a local estimate that is compared against the
//! provider-reported counts. It mirrors each provider's chat framing so the
//! estimate lands close to what the provider bills.

pub mod counter;
pub mod family;

pub use counter::{IMAGE_BLOCK_TOKENS, TokenCounter};
pub use family::{ChatFormat, Encoding, ModelFamily, strip_date_suffix};

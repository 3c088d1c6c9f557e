// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reported-versus-provider usage comparison.
//!
//! A discrepancy is an observability signal. It is logged and attached to
//! the receipt, and never blocks recording.

use serde::Serialize;
use tracing::warn;

/// Default relative tolerance (5%).
pub const DEFAULT_TOLERANCE: f64 = 0.05;

/// Relative difference of `reported` from `provider`.
///
/// A zero provider count only matches a zero reported count.
fn relative_diff(reported: u64, provider: u64) -> f64 {
    if provider == 0 {
        return if reported == 0 { 0.0 } else { f64::INFINITY };
    }
    reported.abs_diff(provider) as f64 / provider as f64
}

/// Whether both axes are within `tolerance` of the provider's counts.
pub fn validate_provider_usage(
    reported_input: u64,
    reported_output: u64,
    provider_input: u64,
    provider_output: u64,
    tolerance: f64,
) -> bool {
    relative_diff(reported_input, provider_input) <= tolerance
        && relative_diff(reported_output, provider_output) <= tolerance
}

/// Structured details of a usage mismatch beyond tolerance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageDiscrepancy {
    pub reported_input: u64,
    pub reported_output: u64,
    pub provider_input: u64,
    pub provider_output: u64,
    pub input_diff: f64,
    pub output_diff: f64,
    pub tolerance: f64,
}

/// Compare counts and return the discrepancy, if any, logging it at warn.
pub fn check_usage(
    reported_input: u64,
    reported_output: u64,
    provider_input: u64,
    provider_output: u64,
    tolerance: f64,
) -> Option<UsageDiscrepancy> {
    let input_diff = relative_diff(reported_input, provider_input);
    let output_diff = relative_diff(reported_output, provider_output);
    if input_diff <= tolerance && output_diff <= tolerance {
        return None;
    }

    warn!(
        reported_input,
        provider_input,
        reported_output,
        provider_output,
        input_diff,
        output_diff,
        tolerance,
        "token usage differs from provider report beyond tolerance"
    );

    Some(UsageDiscrepancy {
        reported_input,
        reported_output,
        provider_input,
        provider_output,
        input_diff,
        output_diff,
        tolerance,
    })
}

// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model pricing tables and cost calculation.
//!
//! Prices are USD per 1,000 tokens. Lookup is exact match first, then the
//! longest registered prefix, then a conservative default:
//!
//! gpt-4:          input=$0.03/KTok, output=$0.06/KTok
//! gpt-3.5-turbo:  input=$0.0005/KTok, output=$0.0015/KTok
//! claude-3-opus:  input=$0.015/KTok, output=$0.075/KTok
//! unknown:        input=$0.01/KTok, output=$0.03/KTok

use meterline_config::model::PricingConfig;
use meterline_core::CostBreakdown;
use tracing::warn;

/// Per-model pricing in USD per thousand tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// Cost per thousand input tokens.
    pub input_per_k: f64,
    /// Cost per thousand output tokens.
    pub output_per_k: f64,
}

impl ModelPricing {
    pub const fn new(input_per_k: f64, output_per_k: f64) -> Self {
        Self {
            input_per_k,
            output_per_k,
        }
    }
}

/// Built-in price table, in lookup order.
pub const BUILTIN_PRICES: &[(&str, ModelPricing)] = &[
    // OpenAI
    ("gpt-4o", ModelPricing::new(0.0025, 0.01)),
    ("gpt-4o-mini", ModelPricing::new(0.00015, 0.0006)),
    ("gpt-4-turbo", ModelPricing::new(0.01, 0.03)),
    ("gpt-4-turbo-preview", ModelPricing::new(0.01, 0.03)),
    ("gpt-4", ModelPricing::new(0.03, 0.06)),
    ("gpt-4-32k", ModelPricing::new(0.06, 0.12)),
    ("gpt-3.5-turbo", ModelPricing::new(0.0005, 0.0015)),
    ("gpt-3.5-turbo-16k", ModelPricing::new(0.003, 0.004)),
    // Anthropic
    ("claude-3-opus", ModelPricing::new(0.015, 0.075)),
    ("claude-3-sonnet", ModelPricing::new(0.003, 0.015)),
    ("claude-3-haiku", ModelPricing::new(0.00025, 0.00125)),
    ("claude-3-5-sonnet", ModelPricing::new(0.003, 0.015)),
    ("claude-3-5-haiku", ModelPricing::new(0.0008, 0.004)),
    // Google
    ("gemini-1.5-pro", ModelPricing::new(0.00125, 0.005)),
    ("gemini-1.5-flash", ModelPricing::new(0.000075, 0.0003)),
];

/// A unit count within this many ULPs of an integer is that integer.
const SNAP_ULPS: f64 = 4.0;

#[derive(Debug, Clone)]
struct PriceEntry {
    key: String,
    pricing: ModelPricing,
}

/// Resolves model prices and converts usage into ledger units.
#[derive(Debug, Clone)]
pub struct PricingEngine {
    /// Configured overrides followed by the built-in table.
    entries: Vec<PriceEntry>,
    default_pricing: ModelPricing,
    exchange_rate_usd: f64,
    units_per_whole: u64,
    tolerance: f64,
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(&PricingConfig::default())
    }
}

impl PricingEngine {
    /// Build an engine from validated pricing configuration.
    pub fn new(config: &PricingConfig) -> Self {
        let overrides = config.models.iter().map(|m| PriceEntry {
            key: m.model.clone(),
            pricing: ModelPricing::new(m.input_per_k, m.output_per_k),
        });
        let builtin = BUILTIN_PRICES.iter().map(|(key, pricing)| PriceEntry {
            key: (*key).to_string(),
            pricing: *pricing,
        });

        Self {
            entries: overrides.chain(builtin).collect(),
            default_pricing: ModelPricing::new(
                config.default_input_per_k,
                config.default_output_per_k,
            ),
            exchange_rate_usd: config.exchange_rate_usd,
            units_per_whole: config.units_per_whole,
            tolerance: config.tolerance,
        }
    }

    /// Relative tolerance used for usage discrepancy checks.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Look up pricing for a model identifier. Never fails.
    pub fn get_pricing(&self, model: &str) -> ModelPricing {
        if let Some(entry) = self.entries.iter().find(|e| e.key == model) {
            return entry.pricing;
        }

        // First entry wins among equal-length prefixes, so overrides shadow
        // built-ins.
        let prefix = self
            .entries
            .iter()
            .filter(|e| !e.key.is_empty() && model.starts_with(e.key.as_str()))
            .min_by_key(|e| std::cmp::Reverse(e.key.len()));

        match prefix {
            Some(entry) => entry.pricing,
            None => {
                warn!(
                    model,
                    input_per_k = self.default_pricing.input_per_k,
                    output_per_k = self.default_pricing.output_per_k,
                    "unknown model pricing, using default"
                );
                self.default_pricing
            }
        }
    }

    /// Cost of an exchange in USD and in ledger units (rounded up).
    pub fn calculate_cost(
        &self,
        model: &str,
        input_tokens: u64,
        output_tokens: u64,
    ) -> CostBreakdown {
        let pricing = self.get_pricing(model);

        let input_usd = (input_tokens as f64 / 1000.0) * pricing.input_per_k;
        let output_usd = (output_tokens as f64 / 1000.0) * pricing.output_per_k;
        let total_usd = input_usd + output_usd;

        CostBreakdown {
            input_usd,
            output_usd,
            total_usd,
            total_ledger_units: self.to_ledger_units(total_usd),
        }
    }

    fn to_ledger_units(&self, usd: f64) -> u64 {
        let raw = usd / self.exchange_rate_usd * self.units_per_whole as f64;
        let nearest = raw.round();
        let units = if (raw - nearest).abs() <= raw.abs() * SNAP_ULPS * f64::EPSILON {
            nearest
        } else {
            raw.ceil()
        };
        // Saturating float-to-int cast; negative and NaN become 0.
        units as u64
    }
}

/// Format a cost for display: cents below one cent, dollars otherwise.
pub fn format_cost(cost: &CostBreakdown) -> String {
    if cost.total_usd < 0.01 {
        format!("{:.4}¢", cost.total_usd * 100.0)
    } else {
        format!("${:.4}", cost.total_usd)
    }
}

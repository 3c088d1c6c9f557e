// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns a completed exchange into a signed usage attestation.

use std::sync::Arc;

use rand::RngCore;
use rand::rngs::OsRng;
use serde_json::Value;
use tracing::debug;

use meterline_core::{
    ATTESTATION_VERSION, CompletedExchange, CostBreakdown, MeterError, Message, Provider,
    UnsignedAttestation, UsageAttestation,
};
use meterline_cost::{PricingEngine, UsageDiscrepancy, check_usage};
use meterline_signer::{AgentSigner, hash_request, now_millis};
use meterline_tokens::TokenCounter;

const NONCE_BYTES: usize = 32;

/// A signed attestation with the figures it was derived from.
#[derive(Debug, Clone)]
pub struct AttestationReceipt {
    pub attestation: UsageAttestation,
    pub cost: CostBreakdown,
    /// Input tokens counted locally from the request body, when it carried
    /// messages.
    pub local_input_estimate: Option<u64>,
    /// Set when the local estimate disagrees with the provider beyond the
    /// pricing tolerance. Informational only.
    pub discrepancy: Option<UsageDiscrepancy>,
}

/// Counts, prices, and signs completed exchanges.
#[derive(Debug)]
pub struct AttestationBuilder {
    counter: TokenCounter,
    pricing: PricingEngine,
    signer: Arc<AgentSigner>,
}

impl AttestationBuilder {
    pub fn new(counter: TokenCounter, pricing: PricingEngine, signer: Arc<AgentSigner>) -> Self {
        Self {
            counter,
            pricing,
            signer,
        }
    }

    pub fn counter(&self) -> &TokenCounter {
        &self.counter
    }

    pub fn pricing(&self) -> &PricingEngine {
        &self.pricing
    }

    pub fn signer(&self) -> &AgentSigner {
        &self.signer
    }

    /// Build and sign the attestation for `exchange`.
    ///
    /// Billing uses the provider-reported counts. Malformed fields fail with
    /// [`MeterError::Schema`] before anything is signed.
    pub fn build(&self, exchange: CompletedExchange) -> Result<AttestationReceipt, MeterError> {
        let CompletedExchange {
            provider,
            model,
            request_body,
            input_tokens,
            output_tokens,
            agent_wallet,
            task_id,
        } = exchange;

        let local_input_estimate = self.estimate_input(provider, &model, &request_body);
        let cost = self
            .pricing
            .calculate_cost(&model, input_tokens, output_tokens);

        let unsigned = UnsignedAttestation {
            version: ATTESTATION_VERSION,
            task_id,
            agent_wallet,
            provider,
            request_hash: hash_request(&request_body),
            input_tokens,
            output_tokens,
            cost_units: cost.total_ledger_units,
            timestamp: now_millis(),
            nonce: fresh_nonce(),
            model,
        };
        let attestation = self.signer.sign_attestation(unsigned)?;

        let discrepancy = local_input_estimate.and_then(|estimate| {
            check_usage(
                estimate,
                output_tokens,
                input_tokens,
                output_tokens,
                self.pricing.tolerance(),
            )
        });

        debug!(
            provider = %attestation.provider(),
            model = attestation.model(),
            input_tokens,
            output_tokens,
            cost_units = attestation.cost_units(),
            local_input_estimate,
            "attestation signed"
        );

        Ok(AttestationReceipt {
            attestation,
            cost,
            local_input_estimate,
            discrepancy,
        })
    }

    /// Local input count from the body's `messages` (and Anthropic's
    /// top-level `system`). `None` when the body has no parseable messages.
    fn estimate_input(&self, provider: Provider, model: &str, body: &Value) -> Option<u64> {
        let messages: Vec<Message> = match body.get("messages") {
            Some(raw) => match serde_json::from_value(raw.clone()) {
                Ok(messages) => messages,
                Err(e) => {
                    debug!(error = %e, "request messages not countable");
                    return None;
                }
            },
            None => return None,
        };

        let count = match provider {
            Provider::Anthropic => {
                let system = system_prompt(body);
                self.counter
                    .count_structured_tokens(&messages, system.as_deref(), model)
            }
            Provider::OpenAi | Provider::Google => {
                self.counter.count_chat_tokens(&messages, model)
            }
        };
        Some(count)
    }
}

/// Anthropic `system`: a plain string or a list of text blocks.
fn system_prompt(body: &Value) -> Option<String> {
    match body.get("system")? {
        Value::String(s) => Some(s.clone()),
        Value::Array(blocks) => {
            let text: Vec<&str> = blocks
                .iter()
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect();
            (!text.is_empty()).then(|| text.join("\n"))
        }
        _ => None,
    }
}

fn fresh_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attestation and exchange fixtures.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::json;

use meterline_core::{
    ATTESTATION_VERSION, CompletedExchange, Provider, UnsignedAttestation, UsageAttestation,
};
use meterline_signer::{AgentKeypair, AgentSigner, hash_request, now_millis};

static NONCE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A signer with a freshly generated key (no ephemeral-key warning).
pub fn test_signer() -> AgentSigner {
    AgentSigner::new(Some(AgentKeypair::generate()))
}

/// A minimal chat request body.
pub fn chat_body(model: &str, prompt: &str) -> serde_json::Value {
    json!({
        "model": model,
        "messages": [{"role": "user", "content": prompt}],
    })
}

/// An unsigned attestation with a unique nonce.
pub fn unsigned_attestation(
    wallet: &str,
    input_tokens: u64,
    output_tokens: u64,
) -> UnsignedAttestation {
    let n = NONCE_COUNTER.fetch_add(1, Ordering::Relaxed);
    UnsignedAttestation {
        version: ATTESTATION_VERSION,
        task_id: None,
        agent_wallet: wallet.to_string(),
        provider: Provider::OpenAi,
        model: "gpt-4o".into(),
        request_hash: hash_request(&chat_body("gpt-4o", "fixture")),
        input_tokens,
        output_tokens,
        cost_units: input_tokens.saturating_add(output_tokens),
        timestamp: now_millis(),
        nonce: format!("{n:064x}"),
    }
}

/// A valid attestation signed by `signer`.
pub fn signed_attestation(
    signer: &AgentSigner,
    input_tokens: u64,
    output_tokens: u64,
) -> UsageAttestation {
    signer
        .sign_attestation(unsigned_attestation(
            signer.public_key(),
            input_tokens,
            output_tokens,
        ))
        .expect("fixture attestation is valid")
}

/// A completed OpenAI exchange billed to `wallet`.
pub fn openai_exchange(wallet: &str, input_tokens: u64, output_tokens: u64) -> CompletedExchange {
    CompletedExchange {
        provider: Provider::OpenAi,
        model: "gpt-4o".into(),
        request_body: chat_body("gpt-4o", "What is the capital of France?"),
        input_tokens,
        output_tokens,
        agent_wallet: wallet.to_string(),
        task_id: None,
    }
}

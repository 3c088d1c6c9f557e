// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent signer: usage signatures, attestation signing, and verification.

use std::time::{SystemTime, UNIX_EPOCH};

use ed25519_dalek::{Signature, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use meterline_config::model::SignerConfig;
use meterline_core::{MeterError, UnsignedAttestation, UsageAttestation};

use crate::hash::hash_request;
use crate::keypair::AgentKeypair;

/// Domain tag of the lightweight usage signature.
const USAGE_TAG: &str = "meterline:v1";

/// Length of the short agent identifier.
const AGENT_ID_LEN: usize = 8;

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Header-oriented usage signature for a single exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedUsage {
    pub timestamp: u64,
    pub request_hash: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub model: String,
    pub agent_id: String,
    /// Base58 Ed25519 signature over [`canonical_message`](Self::canonical_message).
    pub signature: String,
}

impl SignedUsage {
    pub fn canonical_message(&self) -> String {
        format!(
            "{USAGE_TAG}:{}:{}:{}:{}:{}:{}",
            self.timestamp,
            self.request_hash,
            self.input_tokens,
            self.output_tokens,
            self.model,
            self.agent_id
        )
    }
}

/// Signs usage on behalf of one agent identity.
pub struct AgentSigner {
    keypair: AgentKeypair,
    public_key: String,
    agent_id: String,
}

impl std::fmt::Debug for AgentSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentSigner")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

impl AgentSigner {
    /// Wrap `keypair`, or generate an ephemeral one when `None`.
    pub fn new(keypair: Option<AgentKeypair>) -> Self {
        let keypair = keypair.unwrap_or_else(|| {
            let kp = AgentKeypair::generate();
            warn!(
                public_key = %kp.public_key_b58(),
                "no signer key configured, generated ephemeral keypair"
            );
            kp
        });
        let public_key = keypair.public_key_b58();
        let agent_id = public_key.chars().take(AGENT_ID_LEN).collect();
        debug!(%public_key, "agent signer ready");
        Self {
            keypair,
            public_key,
            agent_id,
        }
    }

    /// Build from `[signer]` configuration. A malformed key is fatal.
    pub fn from_config(config: &SignerConfig) -> Result<Self, MeterError> {
        let keypair = config
            .secret_key
            .as_deref()
            .map(AgentKeypair::from_base58)
            .transpose()?;
        Ok(Self::new(keypair))
    }

    /// Base58 public key.
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// First eight characters of the public key.
    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn keypair(&self) -> &AgentKeypair {
        &self.keypair
    }

    /// Detached Ed25519 signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign(message)
    }

    fn sign_b58(&self, message: &str) -> String {
        bs58::encode(self.sign(message.as_bytes()).to_bytes()).into_string()
    }

    /// Sign the usage of one exchange, stamped with the current time.
    pub fn sign_usage(
        &self,
        request_body: &Value,
        input_tokens: u64,
        output_tokens: u64,
        model: &str,
    ) -> SignedUsage {
        let mut usage = SignedUsage {
            timestamp: now_millis(),
            request_hash: hash_request(request_body),
            input_tokens,
            output_tokens,
            model: model.to_string(),
            agent_id: self.agent_id.clone(),
            signature: String::new(),
        };
        usage.signature = self.sign_b58(&usage.canonical_message());
        usage
    }

    /// Validate and sign an attestation.
    pub fn sign_attestation(
        &self,
        attestation: UnsignedAttestation,
    ) -> Result<UsageAttestation, MeterError> {
        attestation.validate()?;
        let signature = self.sign_b58(&attestation.canonical_message());
        Ok(attestation.into_signed(signature))
    }
}

fn decode_public_key(public_key: &str) -> Option<VerifyingKey> {
    let bytes: [u8; 32] = bs58::decode(public_key).into_vec().ok()?.try_into().ok()?;
    VerifyingKey::from_bytes(&bytes).ok()
}

fn decode_signature(signature: &str) -> Option<Signature> {
    let bytes = bs58::decode(signature).into_vec().ok()?;
    Signature::from_slice(&bytes).ok()
}

fn verify_message(message: &str, signature: &str, public_key: &str) -> bool {
    let (Some(key), Some(signature)) = (decode_public_key(public_key), decode_signature(signature))
    else {
        return false;
    };
    key.verify_strict(message.as_bytes(), &signature).is_ok()
}

/// Verify a [`SignedUsage`] against a base58 public key.
///
/// Malformed keys or signatures yield `false`.
pub fn verify_signature(usage: &SignedUsage, public_key: &str) -> bool {
    verify_message(&usage.canonical_message(), &usage.signature, public_key)
}

/// Verify a signed attestation against a base58 public key.
pub fn verify_attestation(attestation: &UsageAttestation, public_key: &str) -> bool {
    verify_message(
        &attestation.canonical_message(),
        attestation.signature(),
        public_key,
    )
}

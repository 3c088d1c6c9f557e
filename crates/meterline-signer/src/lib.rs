// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ed25519 identity and signing for usage attestations.
//!
//! The agent keypair is supplied through `[signer]` configuration in Solana's
//! base58 format, or generated ephemerally when absent. Verification helpers
//! are free functions so a relying party needs only the public key.

pub mod hash;
pub mod keypair;
pub mod signer;

pub use ed25519_dalek::Signature;
pub use hash::{canonical_json, hash_data, hash_request};
pub use keypair::AgentKeypair;
pub use signer::{AgentSigner, SignedUsage, now_millis, verify_attestation, verify_signature};

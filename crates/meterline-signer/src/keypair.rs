// SPDX-FileCopyrightText: 2026 Meterline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ed25519 agent keypair in Solana-compatible encodings.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;

use meterline_core::MeterError;

/// An Ed25519 agent keypair.
///
/// Accepts and exports the 64-byte Solana layout (seed followed by public
/// key). The public key is base58 encoded wherever it leaves the process.
pub struct AgentKeypair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl std::fmt::Debug for AgentKeypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentKeypair")
            .field("public_key", &self.public_key_b58())
            .finish_non_exhaustive()
    }
}

impl AgentKeypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct a keypair from secret bytes.
    ///
    /// 64 bytes are a full keypair whose trailing public key must match the
    /// seed; 32 bytes are a bare seed.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self, MeterError> {
        match bytes.len() {
            64 => {
                let mut keypair = [0u8; 64];
                keypair.copy_from_slice(bytes);
                let signing_key = SigningKey::from_keypair_bytes(&keypair).map_err(|e| {
                    MeterError::Config(format!("secret key does not match its public key: {e}"))
                })?;
                Ok(Self::from_signing_key(signing_key))
            }
            32 => {
                let mut seed = [0u8; 32];
                seed.copy_from_slice(bytes);
                Ok(Self::from_signing_key(SigningKey::from_bytes(&seed)))
            }
            n => Err(MeterError::Config(format!(
                "invalid secret key length: {n} bytes (expected 32 or 64)"
            ))),
        }
    }

    /// Decode a base58 secret key and defer to [`from_secret_bytes`](Self::from_secret_bytes).
    pub fn from_base58(encoded: &str) -> Result<Self, MeterError> {
        let bytes = bs58::decode(encoded.trim())
            .into_vec()
            .map_err(|e| MeterError::Config(format!("secret key is not valid base58: {e}")))?;
        Self::from_secret_bytes(&bytes)
    }

    /// Public key bytes.
    pub fn public_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }

    /// Base58-encoded public key (the agent's wallet address).
    pub fn public_key_b58(&self) -> String {
        bs58::encode(self.public_bytes()).into_string()
    }

    /// Base58 of the 64-byte keypair, for storage.
    pub fn export_secret_key(&self) -> String {
        bs58::encode(self.signing_key.to_keypair_bytes()).into_string()
    }

    /// Detached signature over `message`.
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_creates_distinct_keys() {
        let a = AgentKeypair::generate();
        let b = AgentKeypair::generate();
        assert_ne!(a.public_key_b58(), b.public_key_b58());
    }

    #[test]
    fn export_and_reimport_keypair_bytes() {
        let kp = AgentKeypair::generate();
        let exported = kp.export_secret_key();
        assert_eq!(bs58::decode(&exported).into_vec().unwrap().len(), 64);

        let restored = AgentKeypair::from_base58(&exported).unwrap();
        assert_eq!(restored.public_key_b58(), kp.public_key_b58());
    }

    #[test]
    fn seed_and_keypair_forms_agree() {
        let kp = AgentKeypair::generate();
        let full = bs58::decode(kp.export_secret_key()).into_vec().unwrap();
        let from_seed = AgentKeypair::from_secret_bytes(&full[..32]).unwrap();
        assert_eq!(from_seed.public_bytes(), kp.public_bytes());
    }

    #[test]
    fn mismatched_public_half_is_rejected() {
        let a = AgentKeypair::generate();
        let b = AgentKeypair::generate();
        let mut bytes = bs58::decode(a.export_secret_key()).into_vec().unwrap();
        bytes[32..].copy_from_slice(&b.public_bytes());
        assert!(matches!(
            AgentKeypair::from_secret_bytes(&bytes),
            Err(MeterError::Config(_))
        ));
    }

    #[test]
    fn wrong_length_is_config_error() {
        let err = AgentKeypair::from_secret_bytes(&[7u8; 48]).unwrap_err();
        match err {
            MeterError::Config(msg) => assert!(msg.contains("48 bytes")),
            other => panic!("expected Config error, got: {other:?}"),
        }
    }

    #[test]
    fn invalid_base58_is_config_error() {
        // '0' and 'l' are outside the base58 alphabet.
        assert!(matches!(
            AgentKeypair::from_base58("0l0l0l"),
            Err(MeterError::Config(_))
        ));
    }

    #[test]
    fn debug_does_not_leak_secret() {
        let kp = AgentKeypair::generate();
        let rendered = format!("{kp:?}");
        assert!(rendered.contains(&kp.public_key_b58()));
        assert!(!rendered.contains(&kp.export_secret_key()));
    }

    #[test]
    fn signatures_are_deterministic() {
        let kp = AgentKeypair::generate();
        assert_eq!(kp.sign(b"payload").to_bytes(), kp.sign(b"payload").to_bytes());
    }
}

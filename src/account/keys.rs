//! Key material and signing.
//!
//! # Security
//! - Private keys are loaded from the pool file or an environment variable
//! - Keys are never logged
//! - Signing is RFC 6979 deterministic; no RNG is touched after key generation

use alloy::primitives::hex;
use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use thiserror::Error;

/// Width of one signature scalar on P-256.
pub const SCALAR_SIZE: usize = 32;

/// Errors from parsing key material or signing with it.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Public key does not match private key")]
    Mismatch,

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Environment variable {0} not set")]
    MissingEnv(String),
}

/// Hex-encoded P-256 keypair.
///
/// `public` is the uncompressed point without its SEC1 `04` prefix (64 bytes),
/// which is the form the chain registers.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyPair {
    pub public: String,
    pub private: String,
}

impl KeyPair {
    /// Generate a fresh keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut rand::thread_rng());
        Self::from_signing_key(&signing_key)
    }

    /// Build a keypair from a hex private key, deriving the public half.
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, KeyError> {
        let key_hex = private_key_hex.strip_prefix("0x").unwrap_or(private_key_hex);
        let signing_key = parse_signing_key(key_hex)?;
        Ok(Self::from_signing_key(&signing_key))
    }

    /// Load a private key from the named environment variable.
    pub fn from_env(var: &str) -> Result<Self, KeyError> {
        let private_key =
            std::env::var(var).map_err(|_| KeyError::MissingEnv(var.to_string()))?;
        Self::from_private_key(private_key.trim())
    }

    fn from_signing_key(signing_key: &SigningKey) -> Self {
        let point = signing_key.verifying_key().to_encoded_point(false);
        Self {
            public: hex::encode(&point.as_bytes()[1..]),
            private: hex::encode(signing_key.to_bytes()),
        }
    }

    /// Raw public key bytes.
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, KeyError> {
        let bytes = hex::decode(&self.public)
            .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?;
        if bytes.len() != 2 * SCALAR_SIZE {
            return Err(KeyError::InvalidPublicKey(format!(
                "expected {} bytes, got {}",
                2 * SCALAR_SIZE,
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    /// Parse the private half and check it matches the public half.
    pub fn signing_key(&self) -> Result<SigningKey, KeyError> {
        let signing_key = parse_signing_key(&self.private)?;
        if Self::from_signing_key(&signing_key).public != self.public.to_lowercase() {
            return Err(KeyError::Mismatch);
        }
        Ok(signing_key)
    }
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

fn parse_signing_key(private_key_hex: &str) -> Result<SigningKey, KeyError> {
    let bytes = hex::decode(private_key_hex)
        .map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))?;
    SigningKey::from_slice(&bytes).map_err(|e| KeyError::InvalidPrivateKey(e.to_string()))
}

/// Sign `message`: SHA3-256 digest, then ECDSA over P-256.
///
/// Returns `r || s`, each scalar big-endian and padded to 32 bytes.
pub fn sign_message(signing_key: &SigningKey, message: &[u8]) -> Result<Vec<u8>, KeyError> {
    let digest = Sha3_256::digest(message);
    let signature: Signature = signing_key
        .sign_prehash(&digest)
        .map_err(|e| KeyError::Signing(e.to_string()))?;
    Ok(signature.to_bytes().to_vec())
}

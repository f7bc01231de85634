//! Signing capabilities handed to the transport.

use p256::ecdsa::SigningKey;
use std::sync::Arc;

use crate::account::keys::{sign_message, KeyError};
use crate::flow::types::Address;

/// Role an account plays in a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Presents a sequence number the chain validates.
    Proposer,
    /// Payer or authorizer; carries no sequence number.
    Signer,
}

/// A capability to sign on behalf of one account key.
///
/// Proposer capabilities carry the sequence number that was allocated when the
/// capability was built. The transport resolves role and ordering; callers
/// never inspect the key.
#[derive(Clone)]
pub struct Authorization {
    role: Role,
    address: Address,
    key_id: u32,
    sequence_number: Option<u64>,
    signing_key: Arc<SigningKey>,
}

impl Authorization {
    pub(crate) fn proposer(
        address: Address,
        key_id: u32,
        sequence_number: u64,
        signing_key: Arc<SigningKey>,
    ) -> Self {
        Self {
            role: Role::Proposer,
            address,
            key_id,
            sequence_number: Some(sequence_number),
            signing_key,
        }
    }

    pub(crate) fn signer(address: Address, key_id: u32, signing_key: Arc<SigningKey>) -> Self {
        Self {
            role: Role::Signer,
            address,
            key_id,
            sequence_number: None,
            signing_key,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    pub fn sequence_number(&self) -> Option<u64> {
        self.sequence_number
    }

    /// Sign challenge bytes with this account's key.
    pub fn sign(&self, message: &[u8]) -> Result<Vec<u8>, KeyError> {
        sign_message(&self.signing_key, message)
    }
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authorization")
            .field("role", &self.role)
            .field("address", &self.address)
            .field("key_id", &self.key_id)
            .field("sequence_number", &self.sequence_number)
            .finish_non_exhaustive()
    }
}

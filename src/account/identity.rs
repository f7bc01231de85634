//! A transaction-submission identity and its sequencing state.
//!
//! # States
//! ```text
//! Free ──record_submission──▶ Busy(tx) ──is_available sees tx sealed──▶ Free
//! ```
//! Independently of that, an account is either unreserved or held by exactly
//! one `AccountLease`. Sequence allocation and `record_submission` are only
//! performed by the lease holder.

use p256::ecdsa::SigningKey;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::account::authorization::Authorization;
use crate::account::keys::{KeyError, KeyPair};
use crate::account::lease::AccountLease;
use crate::flow::transport::Transport;
use crate::flow::types::{Address, FlowResult, TxId, TxStatus};
use crate::manager::PoolResult;

/// Sequence number for keys the chain has never seen used.
pub const DEFAULT_SEQUENCE_NUMBER: u64 = 0;

/// An account key able to propose, pay for, or authorize transactions.
pub struct Account {
    address: Address,
    key_pair: KeyPair,
    key_id: u32,
    signing_key: Arc<SigningKey>,
    /// Next sequence number this key will present as proposer.
    sequence_number: AtomicU64,
    /// Last transaction proposed with this key, until it is seen sealed.
    pending_tx: Mutex<Option<TxId>>,
    /// Held while an `AccountLease` exists.
    pub(crate) reserved: AtomicBool,
}

impl Account {
    /// Create an account whose sequence number is already known.
    pub fn new(
        address: Address,
        key_pair: KeyPair,
        key_id: u32,
        sequence_number: u64,
    ) -> Result<Self, KeyError> {
        let signing_key = key_pair.signing_key()?;
        Ok(Self {
            address,
            key_pair,
            key_id,
            signing_key: Arc::new(signing_key),
            sequence_number: AtomicU64::new(sequence_number),
            pending_tx: Mutex::new(None),
            reserved: AtomicBool::new(false),
        })
    }

    /// Create an account, reading the key's sequence number from the chain.
    ///
    /// A key the chain does not list starts at `DEFAULT_SEQUENCE_NUMBER`.
    pub async fn from_chain(
        address: Address,
        key_pair: KeyPair,
        key_id: u32,
        transport: &dyn Transport,
    ) -> PoolResult<Self> {
        let info = transport.account(&address).await?;
        let sequence_number = info
            .sequence_number(key_id)
            .unwrap_or(DEFAULT_SEQUENCE_NUMBER);

        tracing::debug!(
            address = %address,
            key_id = key_id,
            sequence_number = sequence_number,
            "Sequence number loaded from chain"
        );

        Ok(Self::new(address, key_pair, key_id, sequence_number)?)
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn key_id(&self) -> u32 {
        self.key_id
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    /// Next sequence number, without consuming it.
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number.load(Ordering::SeqCst)
    }

    pub fn pending_tx(&self) -> Option<TxId> {
        *self.lock_pending()
    }

    /// Return the current sequence number and advance the counter.
    ///
    /// There is no rollback: a number allocated for a transaction that is
    /// never sent is burned.
    pub fn allocate_sequence_number(&self) -> u64 {
        self.sequence_number.fetch_add(1, Ordering::SeqCst)
    }

    /// Whether the account can propose again.
    ///
    /// Free accounts answer without a round trip. Otherwise the pending
    /// transaction's status is queried once; a terminal status clears it.
    /// An expired transaction never consumed its sequence number, so the
    /// counter is then re-read from the chain.
    pub async fn is_available(&self, transport: &dyn Transport) -> FlowResult<bool> {
        let Some(tx_id) = self.pending_tx() else {
            return Ok(true);
        };

        let status = transport.status(&tx_id).await?;
        if status == TxStatus::Expired {
            tracing::warn!(account = %self, tx_id = %tx_id, "Transaction expired");
            self.resync_sequence_number(transport).await?;
        }
        if status.is_terminal() {
            self.settle(&tx_id);
            return Ok(true);
        }

        tracing::trace!(account = %self, tx_id = %tx_id, status = ?status, "Account busy");
        Ok(false)
    }

    /// Replace the local counter with the chain's value for this key.
    ///
    /// Leaves the counter alone when the chain does not list the key.
    pub async fn resync_sequence_number(&self, transport: &dyn Transport) -> FlowResult<()> {
        let info = transport.account(&self.address).await?;
        if let Some(on_chain) = info.sequence_number(self.key_id) {
            let local = self.sequence_number.swap(on_chain, Ordering::SeqCst);
            if local != on_chain {
                tracing::info!(
                    address = %self.address,
                    local = local,
                    on_chain = on_chain,
                    "Sequence number resynced from chain"
                );
            }
        }
        Ok(())
    }

    /// Capability to sign as proposer. Allocates a sequence number.
    pub fn authorization_as_proposer(&self) -> Authorization {
        let sequence_number = self.allocate_sequence_number();
        Authorization::proposer(
            self.address,
            self.key_id,
            sequence_number,
            self.signing_key.clone(),
        )
    }

    /// Capability to sign as payer or authorizer. Carries no sequence number.
    pub fn authorization_as_signer(&self) -> Authorization {
        Authorization::signer(self.address, self.key_id, self.signing_key.clone())
    }

    /// Mark the account busy until `tx_id` seals.
    pub fn record_submission(&self, tx_id: TxId) {
        *self.lock_pending() = Some(tx_id);
    }

    /// Clear the pending transaction if it is still `tx_id`.
    pub(crate) fn settle(&self, tx_id: &TxId) {
        let mut pending = self.lock_pending();
        if pending.as_ref() == Some(tx_id) {
            *pending = None;
        }
    }

    /// Take the reservation if nobody holds it.
    pub fn try_reserve(self: &Arc<Self>) -> Option<AccountLease> {
        self.reserved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| AccountLease::new(self.clone()))
    }

    pub fn is_reserved(&self) -> bool {
        self.reserved.load(Ordering::Acquire)
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<TxId>> {
        self.pending_tx.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]", self.address, self.sequence_number())
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("key_id", &self.key_id)
            .field("sequence_number", &self.sequence_number())
            .field("pending_tx", &self.pending_tx())
            .field("reserved", &self.is_reserved())
            .finish()
    }
}

//! Proposer pool management.
//!
//! # Responsibilities
//! - Select a free proposer, earliest-created account first
//! - Mint a new account when every pooled account is busy
//! - Submit transactions with the funder as payer and sole authorizer
//! - Notify the persistence observer and throttle after each submission

use serde_json::json;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};

use crate::account::encoding::encode_public_key;
use crate::account::{Account, AccountLease, KeyPair};
use crate::config::PoolSettings;
use crate::flow::scripts::{
    ACCOUNT_CREATED_ADDRESS_FIELD, ACCOUNT_CREATED_EVENT, CREATE_ACCOUNT_SCRIPT,
};
use crate::flow::transport::{TransactionRequest, Transport};
use crate::flow::types::{Event, TxId};
use crate::manager::error::{PoolError, PoolResult};
use crate::observability::metrics;

/// Key index of the single key added to minted accounts.
const MINTED_KEY_ID: u32 = 0;

/// Callback receiving the whole pool after each submission.
///
/// Runs on the blocking thread pool, one call at a time. Each call sees the
/// pool as it is when that call starts, so a later call never receives an
/// older pool. `submit` returns only after it finishes.
pub type PoolObserver = Arc<dyn Fn(&[Arc<Account>]) + Send + Sync>;

/// A creation transaction sent but not yet seen sealed. Holds the only copy
/// of the new account's private key.
struct PendingCreation {
    tx_id: TxId,
    key_pair: KeyPair,
}

/// Tunables for an `AccountManager`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerOptions {
    /// Delay after every successful submission.
    pub throttle_interval: Duration,
    /// Computation limit attached to every transaction.
    pub fee_limit: u64,
    /// Upper bound on seal waits. `None` waits indefinitely.
    pub seal_timeout: Option<Duration>,
}

impl Default for ManagerOptions {
    fn default() -> Self {
        Self {
            throttle_interval: Duration::from_millis(100),
            fee_limit: 9999,
            seal_timeout: None,
        }
    }
}

impl From<&PoolSettings> for ManagerOptions {
    fn from(settings: &PoolSettings) -> Self {
        Self {
            throttle_interval: Duration::from_millis(settings.throttle_interval_ms),
            fee_limit: settings.fee_limit,
            seal_timeout: settings.seal_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Owns the funder and the proposer pool.
///
/// Safe to share between tasks: every account is reserved before its
/// availability is checked, so two callers never select the same proposer.
/// The pool only grows, by appending, and keeps creation order.
pub struct AccountManager {
    transport: Arc<dyn Transport>,
    funder: Arc<Account>,
    accounts: Arc<RwLock<Vec<Arc<Account>>>>,
    options: ManagerOptions,
    observer: Option<PoolObserver>,
    /// Serialises observer calls so snapshots are delivered in order.
    notifying: Arc<StdMutex<()>>,
    /// Held while the funder proposes a creation transaction. Keeps the
    /// creation that outlived a seal timeout so it can be adopted later.
    minting: Mutex<Option<PendingCreation>>,
}

impl AccountManager {
    /// Create a manager from a funder and a previously persisted pool.
    pub fn new(
        transport: Arc<dyn Transport>,
        funder: Account,
        accounts: Vec<Account>,
        options: ManagerOptions,
    ) -> Self {
        let accounts: Vec<Arc<Account>> = accounts.into_iter().map(Arc::new).collect();
        metrics::record_pool_size(accounts.len());

        tracing::info!(
            funder = %funder,
            pool_size = accounts.len(),
            throttle_ms = options.throttle_interval.as_millis() as u64,
            "Account manager initialized"
        );

        Self {
            transport,
            funder: Arc::new(funder),
            accounts: Arc::new(RwLock::new(accounts)),
            options,
            observer: None,
            notifying: Arc::new(StdMutex::new(())),
            minting: Mutex::new(None),
        }
    }

    /// Register the callback run after every submission.
    pub fn on_submitted<F>(&mut self, observer: F)
    where
        F: Fn(&[Arc<Account>]) + Send + Sync + 'static,
    {
        self.observer = Some(Arc::new(observer));
    }

    pub fn funder(&self) -> &Arc<Account> {
        &self.funder
    }

    /// Snapshot of the pool in creation order.
    pub fn accounts(&self) -> Vec<Arc<Account>> {
        self.read_accounts().clone()
    }

    pub fn len(&self) -> usize {
        self.read_accounts().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_accounts().is_empty()
    }

    pub fn options(&self) -> &ManagerOptions {
        &self.options
    }

    /// Reserve a proposer.
    ///
    /// Scans the pool in creation order and returns the first account that is
    /// both unreserved and available. When none is, finishes an earlier
    /// creation that timed out if there is one, otherwise waits for the funder
    /// to be free (without a timeout unless one is configured), then mints a
    /// new account and returns it.
    pub async fn select_proposer(&self) -> PoolResult<AccountLease> {
        for account in self.accounts() {
            let Some(lease) = account.try_reserve() else {
                tracing::trace!(account = %account, "Account reserved by another caller");
                continue;
            };
            if lease.is_available(self.transport.as_ref()).await? {
                tracing::debug!(account = %account, "Proposer selected");
                return Ok(lease);
            }
        }

        let mut pending = self.minting.lock().await;
        if let Some(lease) = self.complete_creation(&mut pending).await? {
            return Ok(lease);
        }
        self.wait_for_funder().await?;
        self.mint_reserved(&mut pending).await
    }

    /// Submit a transaction with a pooled proposer.
    ///
    /// The funder pays and is the only authorizer. Returns once the
    /// transaction is sent and the throttle interval has passed; it does not
    /// wait for the seal.
    pub async fn submit(
        &self,
        script: &str,
        arguments: Vec<serde_json::Value>,
    ) -> PoolResult<TxId> {
        let proposer = self.select_proposer().await?;

        let funder_auth = self.funder.authorization_as_signer();
        let request = TransactionRequest {
            script: script.to_string(),
            arguments,
            proposer: proposer.authorization_as_proposer(),
            payer: funder_auth.clone(),
            authorizers: vec![funder_auth],
            gas_limit: self.options.fee_limit,
        };

        let tx_id = self.transport.submit(request).await?;
        proposer.record_submission(tx_id);

        tracing::info!(tx_id = %tx_id, proposer = %proposer.address(), "Transaction submitted");
        drop(proposer);
        metrics::record_submission();

        self.notify_observer().await;

        sleep(self.options.throttle_interval).await;
        Ok(tx_id)
    }

    /// Create one account on chain and append it to the pool.
    ///
    /// An earlier creation that outlived its seal timeout is finished first
    /// and its account returned instead.
    pub async fn mint_account(&self) -> PoolResult<Arc<Account>> {
        let mut pending = self.minting.lock().await;
        let lease = match self.complete_creation(&mut pending).await? {
            Some(lease) => lease,
            None => self.mint_reserved(&mut pending).await?,
        };
        Ok(lease.account().clone())
    }

    /// Whether a creation transaction is still awaiting its seal. Waits for
    /// a creation in progress to finish or fail.
    pub async fn has_pending_creation(&self) -> bool {
        self.minting.lock().await.is_some()
    }

    async fn notify_observer(&self) {
        let Some(observer) = self.observer.clone() else {
            return;
        };
        let accounts = self.accounts.clone();
        let notifying = self.notifying.clone();

        let notified = tokio::task::spawn_blocking(move || {
            let _ordered = notifying.lock().unwrap_or_else(PoisonError::into_inner);
            let snapshot = accounts
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .clone();
            observer(&snapshot);
        })
        .await;

        if let Err(e) = notified {
            tracing::error!(error = %e, "Pool observer failed");
        }
    }

    async fn wait_for_funder(&self) -> PoolResult<()> {
        if self.funder.is_available(self.transport.as_ref()).await? {
            return Ok(());
        }
        let Some(tx_id) = self.funder.pending_tx() else {
            return Ok(());
        };

        metrics::record_funder_wait();
        tracing::info!(tx_id = %tx_id, "Funder busy, waiting for its transaction to seal");

        self.wait_sealed(&tx_id).await?;
        self.funder.settle(&tx_id);
        Ok(())
    }

    /// Mint an account and return it already reserved, so no concurrent
    /// scan can take it between the append and the caller's use.
    async fn mint_reserved(
        &self,
        pending: &mut Option<PendingCreation>,
    ) -> PoolResult<AccountLease> {
        let key_pair = KeyPair::generate();
        let encoded_key = encode_public_key(&key_pair.public_key_bytes()?);

        let funder_auth = self.funder.authorization_as_signer();
        let request = TransactionRequest {
            script: CREATE_ACCOUNT_SCRIPT.to_string(),
            arguments: vec![json!({ "type": "String", "value": encoded_key })],
            proposer: self.funder.authorization_as_proposer(),
            payer: funder_auth.clone(),
            authorizers: vec![funder_auth],
            gas_limit: self.options.fee_limit,
        };

        let tx_id = self.transport.submit(request).await?;
        self.funder.record_submission(tx_id);
        *pending = Some(PendingCreation { tx_id, key_pair });
        tracing::info!(tx_id = %tx_id, "Account creation submitted");

        self.complete_creation(pending)
            .await?
            .ok_or(PoolError::Creation { tx_id })
    }

    /// Wait for the pending creation to seal and append its account.
    ///
    /// The creation stays pending if the wait fails or is cancelled. Returns
    /// `None` when nothing is pending.
    async fn complete_creation(
        &self,
        pending: &mut Option<PendingCreation>,
    ) -> PoolResult<Option<AccountLease>> {
        let Some(tx_id) = pending.as_ref().map(|c| c.tx_id) else {
            return Ok(None);
        };

        let events = self.wait_sealed(&tx_id).await?;
        self.funder.settle(&tx_id);
        let Some(creation) = pending.take() else {
            return Ok(None);
        };

        let address = events
            .iter()
            .find(|e| e.kind == ACCOUNT_CREATED_EVENT)
            .and_then(|e| e.address_field(ACCOUNT_CREATED_ADDRESS_FIELD));
        let Some(address) = address else {
            metrics::record_creation_failure();
            tracing::error!(tx_id = %tx_id, events = events.len(), "Account creation failed");
            // An expired creation left the funder's counter one ahead.
            if let Err(e) = self.funder.resync_sequence_number(self.transport.as_ref()).await {
                tracing::warn!(error = %e, "Could not resync funder sequence number");
            }
            return Err(PoolError::Creation { tx_id });
        };

        let account = Arc::new(Account::new(address, creation.key_pair, MINTED_KEY_ID, 0)?);
        let lease = AccountLease::claim_new(account.clone());

        let pool_size = {
            let mut accounts = self.write_accounts();
            accounts.push(account);
            accounts.len()
        };
        metrics::record_account_created();
        metrics::record_pool_size(pool_size);
        tracing::info!(address = %address, pool_size = pool_size, "Account created");

        Ok(Some(lease))
    }

    async fn wait_sealed(&self, tx_id: &TxId) -> PoolResult<Vec<Event>> {
        let wait = self.transport.wait_sealed(tx_id);
        match self.options.seal_timeout {
            None => Ok(wait.await?),
            Some(limit) => match timeout(limit, wait).await {
                Ok(events) => Ok(events?),
                Err(_) => {
                    tracing::warn!(tx_id = %tx_id, "Gave up waiting for seal");
                    Err(PoolError::SealTimeout {
                        tx_id: *tx_id,
                        waited_secs: limit.as_secs(),
                    })
                }
            },
        }
    }

    fn read_accounts(&self) -> RwLockReadGuard<'_, Vec<Arc<Account>>> {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_accounts(&self) -> RwLockWriteGuard<'_, Vec<Arc<Account>>> {
        self.accounts.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for AccountManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountManager")
            .field("funder", &self.funder)
            .field("pool_size", &self.len())
            .field("options", &self.options)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_from_settings() {
        let settings = PoolSettings {
            pool_file: "pool.json".to_string(),
            throttle_interval_ms: 250,
            fee_limit: 1000,
            seal_timeout_secs: Some(30),
        };
        let options = ManagerOptions::from(&settings);
        assert_eq!(options.throttle_interval, Duration::from_millis(250));
        assert_eq!(options.fee_limit, 1000);
        assert_eq!(options.seal_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_default_options_block_indefinitely() {
        let options = ManagerOptions::default();
        assert!(options.seal_timeout.is_none());
        assert_eq!(options.fee_limit, 9999);
    }
}

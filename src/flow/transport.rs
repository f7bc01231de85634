//! Transport seam between the pool and the chain.

use async_trait::async_trait;

use crate::account::Authorization;
use crate::flow::types::{AccountInfo, Address, Event, FlowResult, TxId, TxStatus};

/// Everything the transport needs to build, sign and send one transaction.
#[derive(Debug, Clone)]
pub struct TransactionRequest {
    /// Cadence source.
    pub script: String,
    /// JSON-Cadence encoded arguments.
    pub arguments: Vec<serde_json::Value>,
    pub proposer: Authorization,
    pub payer: Authorization,
    pub authorizers: Vec<Authorization>,
    /// Computation limit.
    pub gas_limit: u64,
}

/// Chain operations consumed by accounts and the pool manager.
///
/// Implementations must not retry on the caller's behalf beyond endpoint
/// failover; errors surface unchanged to the pool.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sign and send a transaction, returning its id.
    async fn submit(&self, request: TransactionRequest) -> FlowResult<TxId>;

    /// Snapshot of a transaction's status. Does not wait.
    async fn status(&self, tx_id: &TxId) -> FlowResult<TxStatus>;

    /// Wait until the transaction reaches a terminal status and return the
    /// events it emitted.
    async fn wait_sealed(&self, tx_id: &TxId) -> FlowResult<Vec<Event>>;

    /// Current on-chain state of an account, including its keys.
    async fn account(&self, address: &Address) -> FlowResult<AccountInfo>;
}

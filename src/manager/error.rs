//! Pool error definitions.

use thiserror::Error;

use crate::account::KeyError;
use crate::flow::types::{FlowError, TxId};

/// Errors surfaced by the pool manager.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The creation transaction sealed without announcing a new account.
    /// Not retried.
    #[error("Account creation transaction {tx_id} sealed without a flow.AccountCreated event")]
    Creation { tx_id: TxId },

    /// A configured seal timeout elapsed.
    #[error("Transaction {tx_id} not sealed within {waited_secs} seconds")]
    SealTimeout { tx_id: TxId, waited_secs: u64 },

    /// Transport failure, unchanged.
    #[error(transparent)]
    Transport(#[from] FlowError),

    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::B256;

    #[test]
    fn test_error_display() {
        let tx_id = TxId(B256::repeat_byte(0x11));
        let err = PoolError::Creation { tx_id };
        assert!(err.to_string().contains(&"11".repeat(32)));
        assert!(err.to_string().contains("flow.AccountCreated"));

        let err = PoolError::from(FlowError::Rpc("boom".to_string()));
        assert_eq!(err.to_string(), "RPC error: boom");
    }
}

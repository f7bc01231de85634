//! Chain integration subsystem.
//!
//! # Data Flow
//! ```text
//! TransactionRequest (script, args, proposer/payer/authorizer capabilities)
//!     → transaction.rs (canonical RLP, payload + envelope signatures)
//!     → client.rs (Access REST API, timeouts, failover)
//!     → TxId
//!
//! TxId → client.rs status / wait_sealed → TxStatus / events
//! ```
//!
//! # Constraints
//! - The pool only sees the `Transport` trait; `FlowClient` is one implementation
//! - Transport errors are never retried here beyond endpoint failover

pub mod client;
pub mod scripts;
pub mod transaction;
pub mod transport;
pub mod types;

pub use client::FlowClient;
pub use transport::{TransactionRequest, Transport};
pub use types::{AccountInfo, AccountKey, Address, Event, FlowError, FlowResult, TxId, TxStatus};

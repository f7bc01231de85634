//! Proposer account pool for Flow transaction submission.

pub mod account;
pub mod config;
pub mod flow;
pub mod manager;
pub mod observability;
pub mod store;

pub use account::{Account, AccountLease, KeyPair};
pub use config::schema::PoolConfig;
pub use flow::{FlowClient, Transport};
pub use manager::{AccountManager, ManagerOptions, PoolError};

//! Proposer pool subsystem.
//!
//! # Data Flow
//! ```text
//! submit(script, args)
//!     → select_proposer (first free account in creation order)
//!         ↳ none free: wait for funder → mint account (funder pays and proposes)
//!     → Transport::submit (pooled proposer, funder as payer + authorizer)
//!     → observer(pool) → throttle → TxId
//! ```
//!
//! # Invariants
//! - A selected proposer has no pending transaction and is leased to one caller
//! - The pool is append-only; creation order is selection order
//! - Minted accounts start at sequence number 0 and are handed straight to
//!   the caller that minted them

pub mod error;
pub mod pool;

pub use error::{PoolError, PoolResult};
pub use pool::{AccountManager, ManagerOptions, PoolObserver};

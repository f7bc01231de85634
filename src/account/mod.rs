//! Submission identities.
//!
//! # Data Flow
//! ```text
//! keys.rs (P-256 keypair, SHA3-256 + ECDSA signing)
//!     → identity.rs (address, key, sequence counter, pending transaction)
//!     → lease.rs (exclusive reservation before any state change)
//!     → authorization.rs (proposer / signer capabilities for the transport)
//!
//! encoding.rs: public key → registration payload for new accounts
//! ```
//!
//! # Invariants
//! - The sequence counter only moves forward, by one per proposer capability
//! - A pending transaction is cleared only after it is seen sealed or expired
//! - Private keys never reach logs or `Debug` output

pub mod authorization;
pub mod encoding;
pub mod identity;
pub mod keys;
pub mod lease;

pub use authorization::{Authorization, Role};
pub use identity::Account;
pub use keys::{KeyError, KeyPair};
pub use lease::AccountLease;

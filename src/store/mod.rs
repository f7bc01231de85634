//! Pool persistence.
//!
//! The pool file is a JSON array of account records in creation order.
//! Records without a sequence number are resolved against the chain on load.

pub mod pool_file;

pub use pool_file::{load_pool, read_records, save_hook, save_pool, AccountRecord, StoreError};

//! Reservation guard for an account.

use std::ops::Deref;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::account::identity::Account;

/// An RAII guard proving exclusive use of an account.
///
/// Created by `Account::try_reserve`. The reservation is released on drop.
#[derive(Debug)]
pub struct AccountLease {
    account: Arc<Account>,
}

impl AccountLease {
    pub(crate) fn new(account: Arc<Account>) -> Self {
        Self { account }
    }

    /// Reserve an account no other caller can see yet.
    pub(crate) fn claim_new(account: Arc<Account>) -> Self {
        account.reserved.store(true, Ordering::Release);
        Self { account }
    }

    /// The shared handle of the leased account.
    pub fn account(&self) -> &Arc<Account> {
        &self.account
    }
}

impl Deref for AccountLease {
    type Target = Account;

    fn deref(&self) -> &Self::Target {
        &self.account
    }
}

impl Drop for AccountLease {
    fn drop(&mut self) {
        self.account.reserved.store(false, Ordering::Release);
    }
}

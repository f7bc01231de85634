//! Shared utilities for integration testing.

use alloy::primitives::B256;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flow_proposer_pool::account::{Account, KeyPair};
use flow_proposer_pool::flow::scripts::{ACCOUNT_CREATED_EVENT, CREATE_ACCOUNT_SCRIPT};
use flow_proposer_pool::flow::{
    AccountInfo, AccountKey, Address, Event, FlowError, FlowResult, TransactionRequest, Transport,
    TxId, TxStatus,
};
use flow_proposer_pool::manager::{AccountManager, ManagerOptions};

pub const FUNDER_ADDRESS: &str = "0xf8d6e0586b0a20c7";

/// In-memory chain.
///
/// Creation transactions seal immediately and emit `flow.AccountCreated`
/// when `emit_creation_events` is on. With `hold_creations` set they stay
/// pending until `release_creations`. Every other transaction stays pending
/// until `seal` is called.
pub struct MockTransport {
    statuses: Mutex<HashMap<TxId, TxStatus>>,
    events: Mutex<HashMap<TxId, Vec<Event>>>,
    submitted: Mutex<Vec<TransactionRequest>>,
    held_creations: Mutex<Vec<TxId>>,
    sequence_numbers: Mutex<HashMap<Address, u64>>,
    next_tx: AtomicU64,
    next_address: AtomicU64,
    pub emit_creation_events: AtomicBool,
    pub hold_creations: AtomicBool,
    pub fail_submissions: AtomicBool,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            statuses: Mutex::new(HashMap::new()),
            events: Mutex::new(HashMap::new()),
            submitted: Mutex::new(Vec::new()),
            held_creations: Mutex::new(Vec::new()),
            sequence_numbers: Mutex::new(HashMap::new()),
            next_tx: AtomicU64::new(1),
            next_address: AtomicU64::new(0x1000),
            emit_creation_events: AtomicBool::new(true),
            hold_creations: AtomicBool::new(false),
            fail_submissions: AtomicBool::new(false),
        }
    }
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn next_tx_id(&self) -> TxId {
        let n = self.next_tx.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&n.to_be_bytes());
        TxId(B256::from(bytes))
    }

    fn next_account_address(&self) -> Address {
        let n = self.next_address.fetch_add(1, Ordering::SeqCst);
        format!("{:x}", n).parse().unwrap()
    }

    /// A pending transaction nobody submitted through this mock.
    pub fn register_pending(&self) -> TxId {
        let tx_id = self.next_tx_id();
        self.set_status(tx_id, TxStatus::Pending);
        tx_id
    }

    pub fn set_status(&self, tx_id: TxId, status: TxStatus) {
        self.statuses.lock().unwrap().insert(tx_id, status);
    }

    pub fn seal(&self, tx_id: TxId) {
        self.set_status(tx_id, TxStatus::Sealed);
    }

    /// Seal every held creation, emitting its creation event. Returns the
    /// new account addresses.
    pub fn release_creations(&self) -> Vec<Address> {
        let held: Vec<TxId> = self.held_creations.lock().unwrap().drain(..).collect();
        held.into_iter()
            .map(|tx_id| {
                let address = self.next_account_address();
                self.events
                    .lock()
                    .unwrap()
                    .insert(tx_id, vec![Self::creation_event(address)]);
                self.seal(tx_id);
                address
            })
            .collect()
    }

    /// Sequence number the chain reports for key 0 of `address`.
    pub fn set_chain_sequence_number(&self, address: Address, sequence_number: u64) {
        self.sequence_numbers
            .lock()
            .unwrap()
            .insert(address, sequence_number);
    }

    pub fn submitted(&self) -> Vec<TransactionRequest> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn creation_requests(&self) -> Vec<TransactionRequest> {
        self.submitted()
            .into_iter()
            .filter(|r| r.script == CREATE_ACCOUNT_SCRIPT)
            .collect()
    }

    pub fn user_requests(&self) -> Vec<TransactionRequest> {
        self.submitted()
            .into_iter()
            .filter(|r| r.script != CREATE_ACCOUNT_SCRIPT)
            .collect()
    }

    fn creation_event(address: Address) -> Event {
        Event {
            kind: ACCOUNT_CREATED_EVENT.to_string(),
            payload: json!({
                "type": "Event",
                "value": {
                    "id": ACCOUNT_CREATED_EVENT,
                    "fields": [
                        { "name": "address", "value": { "type": "Address", "value": address.to_string() } }
                    ]
                }
            }),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn submit(&self, request: TransactionRequest) -> FlowResult<TxId> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(FlowError::Rpc("submission refused".to_string()));
        }

        let tx_id = self.next_tx_id();
        let is_creation = request.script == CREATE_ACCOUNT_SCRIPT;
        self.submitted.lock().unwrap().push(request);

        if is_creation && !self.hold_creations.load(Ordering::SeqCst) {
            let mut events = Vec::new();
            if self.emit_creation_events.load(Ordering::SeqCst) {
                events.push(Self::creation_event(self.next_account_address()));
            }
            self.events.lock().unwrap().insert(tx_id, events);
            self.seal(tx_id);
        } else {
            if is_creation {
                self.held_creations.lock().unwrap().push(tx_id);
            }
            self.set_status(tx_id, TxStatus::Pending);
        }
        Ok(tx_id)
    }

    async fn status(&self, tx_id: &TxId) -> FlowResult<TxStatus> {
        Ok(self
            .statuses
            .lock()
            .unwrap()
            .get(tx_id)
            .copied()
            .unwrap_or(TxStatus::Unknown))
    }

    async fn wait_sealed(&self, tx_id: &TxId) -> FlowResult<Vec<Event>> {
        loop {
            if self.status(tx_id).await?.is_terminal() {
                let events = self.events.lock().unwrap().get(tx_id).cloned();
                return Ok(events.unwrap_or_default());
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn account(&self, address: &Address) -> FlowResult<AccountInfo> {
        let keys = self
            .sequence_numbers
            .lock()
            .unwrap()
            .get(address)
            .map(|seq| {
                vec![AccountKey {
                    index: 0,
                    sequence_number: *seq,
                }]
            })
            .unwrap_or_default();
        Ok(AccountInfo {
            address: *address,
            keys,
        })
    }
}

#[allow(dead_code)]
pub fn addr(s: &str) -> Address {
    s.parse().unwrap()
}

#[allow(dead_code)]
pub fn account(address: &str, sequence_number: u64) -> Account {
    Account::new(address.parse().unwrap(), KeyPair::generate(), 0, sequence_number).unwrap()
}

#[allow(dead_code)]
pub fn funder() -> Account {
    account(FUNDER_ADDRESS, 0)
}

/// Options with no throttle so tests run fast.
#[allow(dead_code)]
pub fn fast_options() -> ManagerOptions {
    ManagerOptions {
        throttle_interval: Duration::ZERO,
        ..ManagerOptions::default()
    }
}

#[allow(dead_code)]
pub fn manager(transport: &Arc<MockTransport>, pool: Vec<Account>) -> AccountManager {
    AccountManager::new(transport.clone(), funder(), pool, fast_options())
}

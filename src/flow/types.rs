//! Chain-specific types and error definitions.

use alloy::primitives::{hex, FixedBytes, B256};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Flow account address (8 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub FixedBytes<8>);

impl Address {
    /// Raw address bytes as they appear in the canonical transaction encoding.
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_slice()
    }

    /// Hex form without the `0x` prefix, as the Access API expects it.
    pub fn to_bare_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for Address {
    type Err = FlowError;

    /// Accepts `0x`-prefixed or bare hex. Short forms such as `0x1` are
    /// left-padded to the full 8 bytes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > 16 {
            return Err(FlowError::InvalidAddress(s.to_string()));
        }
        let padded = format!("{:0>16}", digits);
        let bytes: [u8; 8] = hex::decode_to_array(&padded)
            .map_err(|_| FlowError::InvalidAddress(s.to_string()))?;
        Ok(Self(FixedBytes(bytes)))
    }
}

impl TryFrom<String> for Address {
    type Error = FlowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.to_string()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Transaction identifier (32-byte hash).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TxId(pub B256);

impl From<B256> for TxId {
    fn from(hash: B256) -> Self {
        Self(hash)
    }
}

impl FromStr for TxId {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<B256>()
            .map(Self)
            .map_err(|e| FlowError::Decode(format!("Invalid transaction id '{}': {}", s, e)))
    }
}

impl TryFrom<String> for TxId {
    type Error = FlowError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TxId> for String {
    fn from(id: TxId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Transaction lifecycle status, ordered by progress.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TxStatus {
    Unknown = 0,
    /// Awaiting finalization.
    Pending = 1,
    /// Finalized, awaiting execution.
    Finalized = 2,
    /// Executed, awaiting sealing.
    Executed = 3,
    /// Result committed to the chain.
    Sealed = 4,
    /// Dropped because its reference block expired.
    Expired = 5,
}

impl TxStatus {
    /// Sealed or later. No further progress will happen.
    pub fn is_terminal(self) -> bool {
        self >= TxStatus::Sealed
    }

    /// Parse the status name used by the Access API. Unrecognised names map
    /// to `Unknown`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Pending" => TxStatus::Pending,
            "Finalized" => TxStatus::Finalized,
            "Executed" => TxStatus::Executed,
            "Sealed" => TxStatus::Sealed,
            "Expired" => TxStatus::Expired,
            _ => TxStatus::Unknown,
        }
    }
}

impl From<u8> for TxStatus {
    fn from(val: u8) -> Self {
        match val {
            1 => TxStatus::Pending,
            2 => TxStatus::Finalized,
            3 => TxStatus::Executed,
            4 => TxStatus::Sealed,
            5 => TxStatus::Expired,
            _ => TxStatus::Unknown,
        }
    }
}

/// Event emitted by a transaction, with its JSON-Cadence payload decoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Fully qualified event type, e.g. `flow.AccountCreated`.
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: serde_json::Value,
}

impl Event {
    /// Look up the raw value of a named event field.
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.payload
            .get("value")?
            .get("fields")?
            .as_array()?
            .iter()
            .find(|f| f.get("name").and_then(|n| n.as_str()) == Some(name))?
            .get("value")?
            .get("value")
    }

    /// Look up a named field holding an `Address` value.
    pub fn address_field(&self, name: &str) -> Option<Address> {
        self.field(name)?.as_str()?.parse().ok()
    }
}

/// One key registered on an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountKey {
    pub index: u32,
    pub sequence_number: u64,
}

/// Account state as reported by the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountInfo {
    pub address: Address,
    pub keys: Vec<AccountKey>,
}

impl AccountInfo {
    /// Sequence number of key `key_id`, if the account lists that key.
    pub fn sequence_number(&self, key_id: u32) -> Option<u64> {
        self.keys
            .iter()
            .find(|k| k.index == key_id)
            .map(|k| k.sequence_number)
    }
}

/// Errors raised by the chain transport.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Connection or request failed on every endpoint.
    #[error("RPC error: {0}")]
    Rpc(String),

    /// The Access API answered with an error status.
    #[error("Request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// Response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Malformed account address.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// A signer could not produce its signature.
    #[error("Signing failed: {0}")]
    Signing(String),
}

/// Result type for transport operations.
pub type FlowResult<T> = Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_address_parsing() {
        let full: Address = "0xf8d6e0586b0a20c7".parse().unwrap();
        assert_eq!(full.to_string(), "0xf8d6e0586b0a20c7");
        assert_eq!(full.to_bare_hex(), "f8d6e0586b0a20c7");

        let bare: Address = "f8d6e0586b0a20c7".parse().unwrap();
        assert_eq!(bare, full);

        let short: Address = "0x1".parse().unwrap();
        assert_eq!(short.to_string(), "0x0000000000000001");
    }

    #[test]
    fn test_invalid_address() {
        assert!("0x".parse::<Address>().is_err());
        assert!("0xzz".parse::<Address>().is_err());
        assert!("0x00112233445566778899".parse::<Address>().is_err());
    }

    #[test]
    fn test_status_ordering() {
        assert!(!TxStatus::Unknown.is_terminal());
        assert!(!TxStatus::Executed.is_terminal());
        assert!(TxStatus::Sealed.is_terminal());
        assert!(TxStatus::Expired.is_terminal());
        assert_eq!(TxStatus::from(4), TxStatus::Sealed);
        assert_eq!(TxStatus::from(42), TxStatus::Unknown);
    }

    #[test]
    fn test_status_from_api_name() {
        assert_eq!(TxStatus::from_name("Finalized"), TxStatus::Finalized);
        assert_eq!(TxStatus::from_name("Expired"), TxStatus::Expired);
        assert_eq!(TxStatus::from_name("SomethingNew"), TxStatus::Unknown);
    }

    #[test]
    fn test_event_address_field() {
        let event = Event {
            kind: "flow.AccountCreated".to_string(),
            payload: json!({
                "type": "Event",
                "value": {
                    "id": "flow.AccountCreated",
                    "fields": [
                        { "name": "address", "value": { "type": "Address", "value": "0x01cf0e2f2f715450" } }
                    ]
                }
            }),
        };
        assert_eq!(
            event.address_field("address").unwrap().to_string(),
            "0x01cf0e2f2f715450"
        );
        assert!(event.field("missing").is_none());
    }

    #[test]
    fn test_account_info_sequence_lookup() {
        let info = AccountInfo {
            address: "0x01".parse().unwrap(),
            keys: vec![
                AccountKey { index: 0, sequence_number: 7 },
                AccountKey { index: 2, sequence_number: 3 },
            ],
        };
        assert_eq!(info.sequence_number(0), Some(7));
        assert_eq!(info.sequence_number(2), Some(3));
        assert_eq!(info.sequence_number(1), None);
    }

    #[test]
    fn test_error_display() {
        let err = FlowError::Rpc("connection refused".to_string());
        assert_eq!(err.to_string(), "RPC error: connection refused");

        let err = FlowError::Rejected {
            status: 400,
            message: "invalid signature".to_string(),
        };
        assert!(err.to_string().contains("400"));
    }
}

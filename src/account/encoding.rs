//! Public key encoding for on-chain registration.

use alloy::primitives::hex;
use rlp::RlpStream;

/// ECDSA over P-256.
pub const SIGN_ALGO_ECDSA_P256: u8 = 2;
/// SHA3-256.
pub const HASH_ALGO_SHA3_256: u8 = 3;
/// A key at this weight can authorize alone.
pub const FULL_KEY_WEIGHT: u16 = 1000;

/// Encode a raw public key as the hex RLP list
/// `[public_key, sign_algo, hash_algo, weight]` the account-creation script
/// expects.
pub fn encode_public_key(public_key: &[u8]) -> String {
    let mut stream = RlpStream::new_list(4);
    stream.append(&public_key.to_vec());
    stream.append(&SIGN_ALGO_ECDSA_P256);
    stream.append(&HASH_ALGO_SHA3_256);
    stream.append(&FULL_KEY_WEIGHT);
    hex::encode(stream.out())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_layout() {
        let encoded = encode_public_key(&[0xab; 64]);

        // list header (71 byte payload), then a 64 byte string header
        assert!(encoded.starts_with("f847b840"));
        assert!(encoded.contains(&"ab".repeat(64)));
        // 2, 3, then 1000 as a two byte string
        assert!(encoded.ends_with("02038203e8"));
        assert_eq!(encoded.len(), 2 * (2 + 71));
    }
}

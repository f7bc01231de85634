//! Transaction canonical encoding and signature assembly.
//!
//! # Signing order
//! ```text
//! signers = [proposer, authorizers..., payer]   (deduplicated, first wins)
//! payload  = RLP[script, args, ref_block, gas, proposer, key, seq, payer, authorizers]
//!     → every non-payer signer signs  TAG ‖ payload
//! envelope = RLP[payload, payload_signatures]
//!     → payer signs  TAG ‖ envelope
//! ```

use alloy::primitives::B256;
use rlp::RlpStream;
use std::iter;

use crate::account::Authorization;
use crate::flow::transport::TransactionRequest;
use crate::flow::types::{Address, FlowError, FlowResult};

/// Domain separation tag for transaction signatures.
pub const TRANSACTION_DOMAIN_TAG: &[u8] = b"FLOW-V0.0-transaction";

/// The domain tag right-padded with zeros to 32 bytes.
pub fn domain_tag() -> [u8; 32] {
    let mut tag = [0u8; 32];
    tag[..TRANSACTION_DOMAIN_TAG.len()].copy_from_slice(TRANSACTION_DOMAIN_TAG);
    tag
}

/// One signature attached to a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionSignature {
    pub address: Address,
    /// Position of `address` in the signer list.
    pub signer_index: usize,
    pub key_id: u32,
    pub signature: Vec<u8>,
}

/// A transaction in canonical form, ready for the wire.
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub script: Vec<u8>,
    pub arguments: Vec<Vec<u8>>,
    pub reference_block_id: B256,
    pub gas_limit: u64,
    pub proposer: Address,
    pub proposer_key_id: u32,
    pub sequence_number: u64,
    pub payer: Address,
    pub authorizers: Vec<Address>,
    pub payload_signatures: Vec<TransactionSignature>,
    pub envelope_signatures: Vec<TransactionSignature>,
}

impl SignedTransaction {
    fn unsigned(request: &TransactionRequest, reference_block_id: B256) -> FlowResult<Self> {
        let sequence_number = request.proposer.sequence_number().ok_or_else(|| {
            FlowError::Signing("proposer authorization carries no sequence number".to_string())
        })?;

        let arguments = request
            .arguments
            .iter()
            .map(serde_json::to_vec)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| FlowError::Decode(format!("Unencodable argument: {}", e)))?;

        Ok(Self {
            script: request.script.as_bytes().to_vec(),
            arguments,
            reference_block_id,
            gas_limit: request.gas_limit,
            proposer: request.proposer.address(),
            proposer_key_id: request.proposer.key_id(),
            sequence_number,
            payer: request.payer.address(),
            authorizers: request.authorizers.iter().map(|a| a.address()).collect(),
            payload_signatures: Vec::new(),
            envelope_signatures: Vec::new(),
        })
    }

    /// Signer list: proposer, authorizers, payer. Each address appears once.
    pub fn signers(&self) -> Vec<Address> {
        let mut signers = Vec::with_capacity(self.authorizers.len() + 2);
        let all = iter::once(self.proposer)
            .chain(self.authorizers.iter().copied())
            .chain(iter::once(self.payer));
        for address in all {
            if !signers.contains(&address) {
                signers.push(address);
            }
        }
        signers
    }

    fn append_payload(&self, stream: &mut RlpStream) {
        stream.begin_list(9);
        stream.append(&self.script);
        stream.begin_list(self.arguments.len());
        for argument in &self.arguments {
            stream.append(argument);
        }
        stream.append(&self.reference_block_id.as_slice().to_vec());
        stream.append(&self.gas_limit);
        stream.append(&self.proposer.as_bytes().to_vec());
        stream.append(&u64::from(self.proposer_key_id));
        stream.append(&self.sequence_number);
        stream.append(&self.payer.as_bytes().to_vec());
        stream.begin_list(self.authorizers.len());
        for authorizer in &self.authorizers {
            stream.append(&authorizer.as_bytes().to_vec());
        }
    }

    /// Bytes non-payer signers sign.
    pub fn payload_message(&self) -> Vec<u8> {
        let mut stream = RlpStream::new();
        self.append_payload(&mut stream);
        with_domain_tag(&stream.out())
    }

    /// Bytes the payer signs.
    pub fn envelope_message(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(2);
        self.append_payload(&mut stream);
        stream.begin_list(self.payload_signatures.len());
        for sig in &self.payload_signatures {
            stream.begin_list(3);
            stream.append(&(sig.signer_index as u64));
            stream.append(&u64::from(sig.key_id));
            stream.append(&sig.signature);
        }
        with_domain_tag(&stream.out())
    }
}

fn with_domain_tag(encoded: &[u8]) -> Vec<u8> {
    let mut message = domain_tag().to_vec();
    message.extend_from_slice(encoded);
    message
}

fn signature_for(
    auth: &Authorization,
    signers: &[Address],
    message: &[u8],
) -> FlowResult<TransactionSignature> {
    let signer_index = signers
        .iter()
        .position(|a| *a == auth.address())
        .ok_or_else(|| FlowError::Signing(format!("{} is not a signer", auth.address())))?;
    let signature = auth
        .sign(message)
        .map_err(|e| FlowError::Signing(e.to_string()))?;

    Ok(TransactionSignature {
        address: auth.address(),
        signer_index,
        key_id: auth.key_id(),
        signature,
    })
}

/// Build the canonical transaction and collect every signature it needs.
pub fn sign_transaction(
    request: &TransactionRequest,
    reference_block_id: B256,
) -> FlowResult<SignedTransaction> {
    let mut tx = SignedTransaction::unsigned(request, reference_block_id)?;
    let signers = tx.signers();

    // The payer covers its other roles with the envelope signature.
    let mut payload_signers: Vec<&Authorization> = Vec::new();
    for auth in iter::once(&request.proposer).chain(request.authorizers.iter()) {
        let duplicate = payload_signers
            .iter()
            .any(|a| a.address() == auth.address() && a.key_id() == auth.key_id());
        if auth.address() != tx.payer && !duplicate {
            payload_signers.push(auth);
        }
    }

    let payload = tx.payload_message();
    for auth in payload_signers {
        tx.payload_signatures
            .push(signature_for(auth, &signers, &payload)?);
    }
    tx.payload_signatures
        .sort_by_key(|s| (s.signer_index, s.key_id));

    let envelope = tx.envelope_message();
    tx.envelope_signatures
        .push(signature_for(&request.payer, &signers, &envelope)?);

    Ok(tx)
}

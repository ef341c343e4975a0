//! Signature Assembler
//!
//! Turns the curve primitive's raw `(r, s, recovery_id)` into either a
//! broadcast-ready signed transaction or a 65-byte message signature.

use serde::{Deserialize, Serialize};

use super::transaction::CanonicalTransaction;
use crate::error::{CoreError, CoreResult};
use crate::primitives::{HashFn, RawSignature, SignatureTriple, TransactionCodec};
use crate::utils::crypto::{encode_hex_prefixed, left_pad_32};

/// Offset distinguishing message signatures from transaction signatures
pub const MESSAGE_V_OFFSET: u8 = 27;

/// Broadcast-ready transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignedTransaction {
    /// `hash(raw_tx)`
    pub transaction_id: String,
    pub raw_tx: String,
    /// Digest that was signed
    pub digest: String,
    /// `v` as written on the wire
    pub v: u64,
    pub r: String,
    pub s: String,
}

fn padded_components(raw: &RawSignature) -> CoreResult<([u8; 32], [u8; 32])> {
    if raw.recovery_id > 1 {
        return Err(CoreError::signing_primitive(format!(
            "Invalid recovery id: {}",
            raw.recovery_id
        )));
    }
    let r = left_pad_32(&raw.r).map_err(|_| CoreError::signing_primitive("r exceeds 32 bytes"))?;
    let s = left_pad_32(&raw.s).map_err(|_| CoreError::signing_primitive("s exceeds 32 bytes"))?;
    Ok((r, s))
}

/// Pad `r`/`s` and let the codec derive the signature triple
pub fn assemble_transaction_signature(
    codec: &dyn TransactionCodec,
    raw: &RawSignature,
) -> CoreResult<SignatureTriple> {
    let (r, s) = padded_components(raw)?;
    codec.split_signature(raw.recovery_id, &r, &s)
}

/// `0x || r || s || (recovery_id + 27)`, always 65 bytes
pub fn assemble_message_signature(raw: &RawSignature) -> CoreResult<String> {
    let (r, s) = padded_components(raw)?;

    let mut signature = [0u8; 65];
    signature[..32].copy_from_slice(&r);
    signature[32..64].copy_from_slice(&s);
    signature[64] = raw.recovery_id + MESSAGE_V_OFFSET;
    Ok(encode_hex_prefixed(&signature))
}

/// Serialize `tx` with `signature` attached; the id is `hash(raw bytes)`
pub fn finalize_transaction(
    codec: &dyn TransactionCodec,
    hash: HashFn,
    tx: &CanonicalTransaction,
    digest: &[u8; 32],
    signature: &SignatureTriple,
) -> CoreResult<SignedTransaction> {
    let raw_tx = codec.serialize_signed(tx, signature)?;
    let transaction_id = hash(&raw_tx);

    Ok(SignedTransaction {
        transaction_id: encode_hex_prefixed(&transaction_id),
        raw_tx: encode_hex_prefixed(&raw_tx),
        digest: encode_hex_prefixed(digest),
        v: codec.wire_v(tx, signature),
        r: encode_hex_prefixed(&signature.r),
        s: encode_hex_prefixed(&signature.s),
    })
}

//! Ethereum Message Hashing
//!
//! Digest per message type:
//! - `eth_sign`: the message is already a 32-byte hex digest
//! - `personal_sign`: EIP-191, `"\x19Ethereum Signed Message:\n" + len + message`
//! - typed data V1/V3/V4: see `crate::typed_data`
//!
//! Reference: https://eips.ethereum.org/EIPS/eip-191

use super::MessageHasher;
use crate::error::{CoreError, CoreResult};
use crate::typed_data::{hash_legacy_typed_data, hash_typed_data, TypedData, TypedDataVersion};
use crate::types::MessageType;
use crate::utils::crypto::{decode_hex, keccak256};

/// Ethereum message prefix for personal_sign
const ETH_MESSAGE_PREFIX: &str = "\x19Ethereum Signed Message:\n";

#[derive(Debug, Clone, Copy, Default)]
pub struct EthMessageHasher;

impl MessageHasher for EthMessageHasher {
    fn hash_message(&self, message_type: MessageType, message: &str) -> CoreResult<[u8; 32]> {
        match message_type {
            MessageType::EthSign => eth_sign_digest(message),
            MessageType::PersonalSign => Ok(personal_sign_hash(&personal_message_bytes(message)?)),
            MessageType::TypedDataV1 => Ok(hash_legacy_typed_data(message)?),
            MessageType::TypedDataV3 => hash_eip712(message, TypedDataVersion::V3),
            MessageType::TypedDataV4 => hash_eip712(message, TypedDataVersion::V4),
        }
    }
}

/// Keccak-256 of the EIP-191 prefixed message
pub fn personal_sign_hash(message: &[u8]) -> [u8; 32] {
    let prefix = format!("{}{}", ETH_MESSAGE_PREFIX, message.len());
    let mut data = Vec::with_capacity(prefix.len() + message.len());
    data.extend_from_slice(prefix.as_bytes());
    data.extend_from_slice(message);
    keccak256(&data)
}

/// `0x`-prefixed hex is signed as the bytes it encodes; anything else as UTF-8
fn personal_message_bytes(message: &str) -> CoreResult<Vec<u8>> {
    let is_hex = message
        .strip_prefix("0x")
        .map_or(false, |digits| digits.len() % 2 == 0 && digits.bytes().all(|b| b.is_ascii_hexdigit()));

    if is_hex {
        decode_hex(message)
    } else {
        Ok(message.as_bytes().to_vec())
    }
}

fn eth_sign_digest(message: &str) -> CoreResult<[u8; 32]> {
    let bytes = decode_hex(message)?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        CoreError::invalid_input(format!(
            "eth_sign expects a 32-byte hex digest, got {} bytes",
            bytes.len()
        ))
    })
}

fn hash_eip712(message: &str, version: TypedDataVersion) -> CoreResult<[u8; 32]> {
    let typed_data = TypedData::from_json(message)?;
    Ok(hash_typed_data(&typed_data, version)?)
}

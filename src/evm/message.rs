//! Message Pre-image Builder
//!
//! Computes the digest a message signature commits to. Hashing itself is
//! delegated to the injected `MessageHasher`; this module owns the JSON
//! compatibility rewrite applied beforehand.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;

use crate::error::{CoreError, CoreResult};
use crate::primitives::secp256k1::recover_address;
use crate::primitives::MessageHasher;
use crate::types::{Address, MessageType};
use crate::utils::crypto::{decode_hex, encode_hex_prefixed};
use crate::{log_debug, log_info};

const MODULE: &str = "evm::message";

/// A message signing request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub message: String,
}

impl MessagePayload {
    pub fn new(message_type: MessageType, message: impl Into<String>) -> Self {
        Self {
            message_type,
            message: message.into(),
        }
    }

    pub fn from_json(json: &str) -> CoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Rewrite `{"message": {"value1": X}}` (no `value`) to carry `value: X`.
///
/// Anything that does not parse as JSON or does not have exactly that
/// shape is returned untouched.
pub fn apply_compat_rewrite(message: &str) -> Cow<'_, str> {
    let mut root: Value = match serde_json::from_str(message) {
        Ok(root) => root,
        Err(_) => return Cow::Borrowed(message),
    };

    let inner = match root.get_mut("message").and_then(Value::as_object_mut) {
        Some(inner) => inner,
        None => return Cow::Borrowed(message),
    };
    if inner.contains_key("value") {
        return Cow::Borrowed(message);
    }
    let value1 = match inner.get("value1") {
        Some(value1) => value1.clone(),
        None => return Cow::Borrowed(message),
    };
    inner.insert("value".to_string(), value1);

    match serde_json::to_string(&root) {
        Ok(rewritten) => Cow::Owned(rewritten),
        Err(_) => Cow::Borrowed(message),
    }
}

/// Digest to sign for `payload`
pub fn build_preimage(
    hasher: &dyn MessageHasher,
    payload: &MessagePayload,
    legacy_patch: bool,
) -> CoreResult<[u8; 32]> {
    let message = if legacy_patch {
        apply_compat_rewrite(&payload.message)
    } else {
        Cow::Borrowed(payload.message.as_str())
    };

    if let Cow::Owned(_) = message {
        log_info!(
            MODULE,
            "Applied value1 compatibility rewrite to message",
            message_type = payload.message_type,
        );
    }

    let digest = hasher.hash_message(payload.message_type, &message)?;
    log_debug!(
        MODULE,
        "Computed message digest",
        message_type = payload.message_type,
        digest = encode_hex_prefixed(&digest),
    );
    Ok(digest)
}

/// Recover the signer of a 65-byte `r || s || v` message signature.
///
/// `v` may be the raw recovery id (0/1) or carry the legacy +27 offset.
pub fn recover_message_signer(
    hasher: &dyn MessageHasher,
    payload: &MessagePayload,
    signature: &str,
    legacy_patch: bool,
) -> CoreResult<Address> {
    let bytes = decode_hex(signature)?;
    if bytes.len() != 65 {
        return Err(CoreError::invalid_input(format!(
            "Message signature must be 65 bytes, got {}",
            bytes.len()
        )));
    }

    let recovery_id = match bytes[64] {
        v @ (0 | 1) => v,
        v @ (27 | 28) => v - 27,
        v => {
            return Err(CoreError::invalid_input(format!(
                "Invalid signature v value: {}",
                v
            )))
        }
    };

    let mut r = [0u8; 32];
    let mut s = [0u8; 32];
    r.copy_from_slice(&bytes[..32]);
    s.copy_from_slice(&bytes[32..64]);

    let digest = build_preimage(hasher, payload, legacy_patch)?;
    recover_address(&digest, &r, &s, recovery_id)
}

/// Whether `signature` over `payload` was produced by `expected`
pub fn verify_message(
    hasher: &dyn MessageHasher,
    payload: &MessagePayload,
    signature: &str,
    expected: &Address,
    legacy_patch: bool,
) -> CoreResult<bool> {
    let recovered = recover_message_signer(hasher, payload, signature, legacy_patch)?;
    Ok(&recovered == expected)
}

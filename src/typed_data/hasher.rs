//! EIP-712 Hashing
//!
//! `hash = keccak256("\x19\x01" || domainSeparator || hashStruct(message))`

use serde_json::Value;

use super::encoder::encode_data;
use super::types::*;
use super::TypedDataVersion;
use crate::utils::crypto::keccak256;

/// Magic prefix for EIP-712 encoding
const EIP712_PREFIX: &[u8] = b"\x19\x01";

/// `keccak256(typeHash || encodeData(s))`
pub fn hash_struct(
    type_name: &str,
    data: &Value,
    types: &TypeMap,
    version: TypedDataVersion,
) -> Result<[u8; 32], TypedDataError> {
    let encoded = encode_data(type_name, data, types, version)?;
    Ok(keccak256(&encoded))
}

/// `hashStruct(domain)`; the domain type is inferred when not declared
pub fn domain_separator(
    typed_data: &TypedData,
    version: TypedDataVersion,
) -> Result<[u8; 32], TypedDataError> {
    let types = typed_data.types_with_domain();
    hash_domain(typed_data, &types, version)
}

fn hash_domain(
    typed_data: &TypedData,
    types: &TypeMap,
    version: TypedDataVersion,
) -> Result<[u8; 32], TypedDataError> {
    let empty = Value::Object(Default::default());
    let domain = if typed_data.domain.is_null() {
        &empty
    } else {
        &typed_data.domain
    };
    hash_struct(DOMAIN_TYPE, domain, types, version)
}

/// The EIP-712 signing digest of `typed_data`.
///
/// When the primary type is the domain itself only the domain separator
/// is appended to the prefix.
pub fn hash_typed_data(
    typed_data: &TypedData,
    version: TypedDataVersion,
) -> Result<[u8; 32], TypedDataError> {
    typed_data.validate()?;
    let types = typed_data.types_with_domain();

    let mut data = Vec::with_capacity(2 + 32 + 32);
    data.extend_from_slice(EIP712_PREFIX);
    data.extend_from_slice(&hash_domain(typed_data, &types, version)?);

    if typed_data.primary_type != DOMAIN_TYPE {
        data.extend_from_slice(&hash_struct(
            &typed_data.primary_type,
            &typed_data.message,
            &types,
            version,
        )?);
    }

    Ok(keccak256(&data))
}

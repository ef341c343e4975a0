//! Legacy (V1) typed data
//!
//! The message is a flat list of `{type, name, value}` entries. The digest
//! is `keccak256(keccak256(packed schema) || keccak256(packed values))`
//! where the schema is each entry's `"type name"` string and values use
//! Solidity tight packing.

use serde::Deserialize;
use serde_json::Value;

use super::encoder::{parse_address, parse_bool, parse_bytes, parse_fixed_bytes, parse_integer};
use super::types::*;
use crate::utils::crypto::keccak256;

#[derive(Debug, Clone, Deserialize)]
pub struct LegacyTypedEntry {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    pub value: Value,
}

pub fn hash_legacy_typed_data(json: &str) -> Result<[u8; 32], TypedDataError> {
    let entries: Vec<LegacyTypedEntry> =
        serde_json::from_str(json).map_err(|e| TypedDataError::InvalidJson(e.to_string()))?;
    if entries.is_empty() {
        return Err(TypedDataError::InvalidJson("Expected at least one entry".to_string()));
    }

    let mut schema = Vec::new();
    let mut values = Vec::new();
    for entry in &entries {
        schema.extend_from_slice(format!("{} {}", entry.type_name, entry.name).as_bytes());
        values.extend_from_slice(&pack_value(&entry.type_name, &entry.value)?);
    }

    let mut data = Vec::with_capacity(64);
    data.extend_from_slice(&keccak256(&schema));
    data.extend_from_slice(&keccak256(&values));
    Ok(keccak256(&data))
}

/// Solidity tight packing of one value
fn pack_value(type_name: &str, value: &Value) -> Result<Vec<u8>, TypedDataError> {
    match type_name {
        "string" => value
            .as_str()
            .map(|s| s.as_bytes().to_vec())
            .ok_or_else(|| TypedDataError::invalid_value(type_name, value)),
        "bytes" => parse_bytes(type_name, value),
        "address" => Ok(parse_address(value)?.to_vec()),
        "bool" => Ok(vec![parse_bool(value)? as u8]),
        _ => {
            if let Some((_, bits)) = integer_bits(type_name) {
                let word = parse_integer(type_name, value)?;
                return Ok(word[32 - bits / 8..].to_vec());
            }
            if let Some(size) = fixed_bytes_len(type_name) {
                let mut packed = parse_fixed_bytes(type_name, size, value)?;
                packed.resize(size, 0);
                return Ok(packed);
            }
            if get_element_type(type_name).is_some() {
                return Err(TypedDataError::Unsupported(format!(
                    "array type {} in legacy typed data",
                    type_name
                )));
            }
            Err(TypedDataError::InvalidType(type_name.to_string()))
        }
    }
}

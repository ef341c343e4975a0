//! EIP-712 Encoding
//!
//! `encodeType`, `typeHash` and `encodeData`, plus the atomic value
//! parsers shared with the legacy V1 hasher.

use ethers_core::types::U256;
use serde_json::Value;
use std::collections::BTreeSet;
use std::str::FromStr;

use super::types::*;
use super::TypedDataVersion;
use crate::types::Quantity;
use crate::utils::crypto::{keccak256, strip_hex_prefix};

/// `Mail(Person from,Person to,string contents)Person(string name,address wallet)`
///
/// The primary type comes first, then every referenced struct type in
/// alphabetical order.
pub fn encode_type(type_name: &str, types: &TypeMap) -> Result<String, TypedDataError> {
    let fields = types
        .get(type_name)
        .ok_or_else(|| TypedDataError::InvalidType(type_name.to_string()))?;

    let mut result = format_type_string(type_name, fields);
    for dep in find_type_dependencies(type_name, types) {
        if dep == type_name {
            continue;
        }
        if let Some(dep_fields) = types.get(&dep) {
            result.push_str(&format_type_string(&dep, dep_fields));
        }
    }

    Ok(result)
}

fn format_type_string(type_name: &str, fields: &[TypedDataField]) -> String {
    let field_strs: Vec<String> = fields
        .iter()
        .map(|f| format!("{} {}", f.type_name, f.name))
        .collect();

    format!("{}({})", type_name, field_strs.join(","))
}

/// All struct types reachable from `type_name`, itself included, sorted
pub fn find_type_dependencies(type_name: &str, types: &TypeMap) -> BTreeSet<String> {
    let mut dependencies = BTreeSet::new();
    let mut to_visit = vec![type_name.to_string()];

    while let Some(current) = to_visit.pop() {
        if dependencies.contains(&current) {
            continue;
        }

        if let Some(fields) = types.get(&current) {
            dependencies.insert(current);

            for field in fields {
                let base_type = get_base_type(&field.type_name);
                if types.contains_key(base_type) && !dependencies.contains(base_type) {
                    to_visit.push(base_type.to_string());
                }
            }
        }
    }

    dependencies
}

/// `keccak256(encodeType(type_name))`
pub fn type_hash(type_name: &str, types: &TypeMap) -> Result<[u8; 32], TypedDataError> {
    let encoded = encode_type(type_name, types)?;
    Ok(keccak256(encoded.as_bytes()))
}

/// `typeHash || enc(field_1) || ... || enc(field_n)`
pub fn encode_data(
    type_name: &str,
    value: &Value,
    types: &TypeMap,
    version: TypedDataVersion,
) -> Result<Vec<u8>, TypedDataError> {
    let fields = types
        .get(type_name)
        .ok_or_else(|| TypedDataError::InvalidType(type_name.to_string()))?;
    let obj = value
        .as_object()
        .ok_or_else(|| TypedDataError::invalid_value(type_name, value))?;

    let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
    encoded.extend_from_slice(&type_hash(type_name, types)?);

    for field in fields {
        match obj.get(&field.name) {
            Some(field_value) => {
                encoded.extend_from_slice(&encode_field(&field.type_name, field_value, types, version)?);
            }
            // V3 leaves absent fields out of the encoding entirely
            None if version == TypedDataVersion::V3 => {}
            None if types.contains_key(&field.type_name) => encoded.extend_from_slice(&[0u8; 32]),
            None => {
                return Err(TypedDataError::MissingField(format!(
                    "{}.{}",
                    type_name, field.name
                )))
            }
        }
    }

    Ok(encoded)
}

/// One 32-byte word of `encodeData`
fn encode_field(
    type_name: &str,
    value: &Value,
    types: &TypeMap,
    version: TypedDataVersion,
) -> Result<[u8; 32], TypedDataError> {
    if let Some(element_type) = get_element_type(type_name) {
        if version == TypedDataVersion::V3 {
            return Err(TypedDataError::Unsupported(format!(
                "array type {} requires typed data V4",
                type_name
            )));
        }
        let items = value
            .as_array()
            .ok_or_else(|| TypedDataError::invalid_value(type_name, value))?;

        let mut concat = Vec::with_capacity(items.len() * 32);
        for item in items {
            concat.extend_from_slice(&encode_field(element_type, item, types, version)?);
        }
        return Ok(keccak256(&concat));
    }

    if types.contains_key(type_name) {
        if version == TypedDataVersion::V4 && value.is_null() {
            return Ok([0u8; 32]);
        }
        return Ok(keccak256(&encode_data(type_name, value, types, version)?));
    }

    match type_name {
        "string" => {
            let s = value
                .as_str()
                .ok_or_else(|| TypedDataError::invalid_value(type_name, value))?;
            Ok(keccak256(s.as_bytes()))
        }
        "bytes" => Ok(keccak256(&parse_bytes(type_name, value)?)),
        _ => encode_atomic(type_name, value),
    }
}

/// Atomic values as one ABI word
pub fn encode_atomic(type_name: &str, value: &Value) -> Result<[u8; 32], TypedDataError> {
    let mut word = [0u8; 32];

    if type_name == "address" {
        word[12..].copy_from_slice(&parse_address(value)?);
        return Ok(word);
    }

    if type_name == "bool" {
        word[31] = parse_bool(value)? as u8;
        return Ok(word);
    }

    if integer_bits(type_name).is_some() {
        return parse_integer(type_name, value);
    }

    if let Some(size) = fixed_bytes_len(type_name) {
        let bytes = parse_fixed_bytes(type_name, size, value)?;
        word[..bytes.len()].copy_from_slice(&bytes);
        return Ok(word);
    }

    Err(TypedDataError::InvalidType(type_name.to_string()))
}

pub(crate) fn parse_address(value: &Value) -> Result<[u8; 20], TypedDataError> {
    let addr = value
        .as_str()
        .ok_or_else(|| TypedDataError::InvalidAddress(value.to_string()))?;
    let addr = strip_hex_prefix(addr);

    if addr.len() != 40 {
        return Err(TypedDataError::InvalidAddress(format!(
            "expected 40 hex chars, got {}",
            addr.len()
        )));
    }

    let bytes = hex::decode(addr)
        .map_err(|e| TypedDataError::InvalidAddress(format!("invalid hex: {}", e)))?;
    let mut result = [0u8; 20];
    result.copy_from_slice(&bytes);
    Ok(result)
}

pub(crate) fn parse_bool(value: &Value) -> Result<bool, TypedDataError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s == "true" => Ok(true),
        Value::String(s) if s == "false" => Ok(false),
        _ => Err(TypedDataError::invalid_value("bool", value)),
    }
}

pub(crate) fn parse_bytes(type_name: &str, value: &Value) -> Result<Vec<u8>, TypedDataError> {
    let hex_str = value
        .as_str()
        .ok_or_else(|| TypedDataError::invalid_value(type_name, value))?;
    hex::decode(strip_hex_prefix(hex_str))
        .map_err(|e| TypedDataError::invalid_value(type_name, format!("invalid hex: {}", e)))
}

/// `bytesN` value, at most `size` bytes
pub(crate) fn parse_fixed_bytes(
    type_name: &str,
    size: usize,
    value: &Value,
) -> Result<Vec<u8>, TypedDataError> {
    let bytes = parse_bytes(type_name, value)?;
    if bytes.len() > size {
        return Err(TypedDataError::invalid_value(
            type_name,
            format!("bytes too long: {} > {}", bytes.len(), size),
        ));
    }
    Ok(bytes)
}

/// `uintN`/`intN` as a 32-byte two's complement word, range-checked
/// against `N`. Accepts JSON numbers, decimal strings and `0x` hex,
/// with a leading `-` for signed types.
pub(crate) fn parse_integer(type_name: &str, value: &Value) -> Result<[u8; 32], TypedDataError> {
    let (signed, bits) =
        integer_bits(type_name).ok_or_else(|| TypedDataError::InvalidType(type_name.to_string()))?;
    let out_of_range = || TypedDataError::invalid_value(type_name, value);

    let (negative, magnitude) = match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                (false, Quantity::from_u64(u))
            } else if let Some(i) = n.as_i64() {
                (i < 0, Quantity::from_u64(i.unsigned_abs()))
            } else {
                // floats and integers beyond 64 bits must be sent as strings
                return Err(out_of_range());
            }
        }
        Value::String(s) => {
            let s = s.trim();
            let (negative, digits) = match s.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, s),
            };
            let magnitude = Quantity::from_str(digits).map_err(|_| out_of_range())?;
            (negative, magnitude)
        }
        _ => return Err(out_of_range()),
    };

    if magnitude.is_zero() {
        return Ok([0u8; 32]);
    }
    if negative && !signed {
        return Err(out_of_range());
    }

    let word = if negative {
        let mut out = [0u8; 32];
        (!magnitude.as_u256())
            .overflowing_add(U256::one())
            .0
            .to_big_endian(&mut out);
        out
    } else {
        magnitude.to_be_bytes()
    };

    let pad = 32 - bits / 8;
    let fill = if signed {
        let sign_set = word[pad] & 0x80 != 0;
        if sign_set != negative {
            return Err(out_of_range());
        }
        if negative {
            0xff
        } else {
            0x00
        }
    } else {
        0x00
    };

    if word[..pad].iter().any(|b| *b != fill) {
        return Err(out_of_range());
    }
    Ok(word)
}

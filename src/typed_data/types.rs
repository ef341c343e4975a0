//! Typed Data Definitions

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the domain struct type
pub const DOMAIN_TYPE: &str = "EIP712Domain";

/// A field in a struct type definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TypedDataField {
    pub name: String,
    /// e.g. "address", "uint256", "Person[]"
    #[serde(rename = "type")]
    pub type_name: String,
}

impl TypedDataField {
    pub fn new(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            type_name: type_name.to_string(),
        }
    }
}

pub type TypeMap = HashMap<String, Vec<TypedDataField>>;

/// Complete EIP-712 typed data document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypedData {
    pub types: TypeMap,
    pub primary_type: String,
    #[serde(default)]
    pub domain: serde_json::Value,
    pub message: serde_json::Value,
}

impl TypedData {
    pub fn from_json(json: &str) -> Result<Self, TypedDataError> {
        serde_json::from_str(json).map_err(|e| TypedDataError::InvalidJson(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, TypedDataError> {
        serde_json::to_string(self).map_err(|e| TypedDataError::InvalidJson(e.to_string()))
    }

    /// Declared `EIP712Domain` fields, or the fields inferred from the
    /// domain keys that are present, in canonical order.
    pub fn domain_fields(&self) -> Vec<TypedDataField> {
        if let Some(declared) = self.types.get(DOMAIN_TYPE) {
            return declared.clone();
        }

        const CANONICAL: [(&str, &str); 5] = [
            ("name", "string"),
            ("version", "string"),
            ("chainId", "uint256"),
            ("verifyingContract", "address"),
            ("salt", "bytes32"),
        ];

        CANONICAL
            .iter()
            .filter(|(name, _)| self.domain.get(name).map_or(false, |v| !v.is_null()))
            .map(|(name, type_name)| TypedDataField::new(name, type_name))
            .collect()
    }

    /// The type map with `EIP712Domain` present
    pub fn types_with_domain(&self) -> TypeMap {
        let mut types = self.types.clone();
        types
            .entry(DOMAIN_TYPE.to_string())
            .or_insert_with(|| self.domain_fields());
        types
    }

    /// Check the primary type and every field type reference
    pub fn validate(&self) -> Result<(), TypedDataError> {
        if !self.types.contains_key(&self.primary_type) {
            return Err(TypedDataError::InvalidPrimaryType(self.primary_type.clone()));
        }

        for fields in self.types.values() {
            for field in fields {
                self.validate_type(&field.type_name)?;
            }
        }

        Ok(())
    }

    fn validate_type(&self, type_name: &str) -> Result<(), TypedDataError> {
        let base_type = get_base_type(type_name);

        if is_atomic_type(base_type) || is_dynamic_type(base_type) {
            return Ok(());
        }
        if self.types.contains_key(base_type) {
            return Ok(());
        }

        Err(TypedDataError::InvalidType(type_name.to_string()))
    }
}

/// Errors raised while hashing typed data
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypedDataError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid type: {0}")]
    InvalidType(String),

    #[error("Invalid primary type: {0}")]
    InvalidPrimaryType(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid value for type {type_name}: {value}")]
    InvalidValue { type_name: String, value: String },

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl TypedDataError {
    pub fn invalid_value(type_name: &str, value: impl ToString) -> Self {
        TypedDataError::InvalidValue {
            type_name: type_name.to_string(),
            value: value.to_string(),
        }
    }
}

/// `Person[]` -> `Person`, `uint256[2][]` -> `uint256`
pub fn get_base_type(type_name: &str) -> &str {
    match type_name.find('[') {
        Some(bracket_pos) => &type_name[..bracket_pos],
        None => type_name,
    }
}

/// Element type of an array type: `uint256[2][]` -> `uint256[2]`
pub fn get_element_type(type_name: &str) -> Option<&str> {
    if !type_name.ends_with(']') {
        return None;
    }
    type_name.rfind('[').map(|pos| &type_name[..pos])
}

/// Bit width of `uintN`/`intN`, if `type_name` is one
pub fn integer_bits(type_name: &str) -> Option<(bool, usize)> {
    let (signed, bits) = if let Some(bits) = type_name.strip_prefix("uint") {
        (false, bits)
    } else if let Some(bits) = type_name.strip_prefix("int") {
        (true, bits)
    } else {
        return None;
    };

    match bits.parse::<usize>() {
        Ok(n) if n > 0 && n <= 256 && n % 8 == 0 => Some((signed, n)),
        _ => None,
    }
}

/// Width of `bytesN`, if `type_name` is one
pub fn fixed_bytes_len(type_name: &str) -> Option<usize> {
    let size = type_name.strip_prefix("bytes")?;
    match size.parse::<usize>() {
        Ok(n) if n > 0 && n <= 32 => Some(n),
        _ => None,
    }
}

/// Fixed-size value types
pub fn is_atomic_type(type_name: &str) -> bool {
    type_name == "address"
        || type_name == "bool"
        || integer_bits(type_name).is_some()
        || fixed_bytes_len(type_name).is_some()
}

pub fn is_dynamic_type(type_name: &str) -> bool {
    type_name == "bytes" || type_name == "string"
}

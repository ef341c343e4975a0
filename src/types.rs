//! Shared types used throughout the signing core

use ethers_core::types::U256;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::utils::crypto::{strip_hex_prefix, to_checksum_address};

// =============================================================================
// Quantity
// =============================================================================

/// Unsigned 256-bit transaction quantity.
///
/// Renders as minimal hex: no leading zero digits, `0x0` for zero.
/// Deserializes from a JSON number, a decimal string or `0x` hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Quantity(U256);

impl Quantity {
    pub const ZERO: Quantity = Quantity(U256::zero());

    pub fn from_u64(value: u64) -> Self {
        Self(U256::from(value))
    }

    pub fn from_u128(value: u128) -> Self {
        Self(U256::from(value))
    }

    /// Build from big-endian bytes; leading zeros beyond 32 bytes are tolerated
    pub fn from_be_slice(bytes: &[u8]) -> CoreResult<Self> {
        let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        let significant = &bytes[start..];
        if significant.len() > 32 {
            return Err(CoreError::invalid_input(format!(
                "Quantity exceeds 256 bits ({} bytes)",
                significant.len()
            )));
        }
        Ok(Self(U256::from_big_endian(significant)))
    }

    pub fn as_u256(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// 32-byte big-endian word
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        self.0.to_big_endian(&mut out);
        out
    }

    /// Minimal big-endian bytes (empty for zero)
    pub fn to_be_bytes_trimmed(&self) -> Vec<u8> {
        let len = (self.0.bits() + 7) / 8;
        self.to_be_bytes()[32 - len..].to_vec()
    }

    /// Value as u64, if it fits
    pub fn as_u64(&self) -> Option<u64> {
        (self.0.bits() <= 64).then(|| self.0.low_u64())
    }

    /// Minimal `0x`-prefixed hex, `0x0` for zero
    pub fn to_hex(&self) -> String {
        format!("{:#x}", self.0)
    }
}

impl FromStr for Quantity {
    type Err = CoreError;

    /// Accepts `0x`-prefixed hex or a decimal string
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CoreError::invalid_input("Empty quantity"));
        }

        let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(digits) => {
                let digits = digits.trim_start_matches('0');
                if digits.is_empty() {
                    return Ok(Self::ZERO);
                }
                U256::from_str_radix(digits, 16).map_err(|e| e.to_string())
            }
            None => U256::from_dec_str(s).map_err(|e| format!("{:?}", e)),
        };

        parsed
            .map(Self)
            .map_err(|e| CoreError::invalid_input(format!("Invalid quantity {}: {}", s, e)))
    }
}

impl From<u64> for Quantity {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<u128> for Quantity {
    fn from(value: u128) -> Self {
        Self::from_u128(value)
    }
}

impl From<U256> for Quantity {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Quantity({})", self.to_hex())
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

struct QuantityVisitor;

impl<'de> Visitor<'de> for QuantityVisitor {
    type Value = Quantity;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an unsigned integer, a decimal string or a 0x-prefixed hex string")
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Quantity, E> {
        Ok(Quantity::from_u64(v))
    }

    fn visit_u128<E: de::Error>(self, v: u128) -> Result<Quantity, E> {
        Ok(Quantity::from_u128(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Quantity, E> {
        u64::try_from(v)
            .map(Quantity::from_u64)
            .map_err(|_| E::custom(format!("negative quantity: {}", v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Quantity, E> {
        Quantity::from_str(v).map_err(E::custom)
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(QuantityVisitor)
    }
}

// =============================================================================
// Address
// =============================================================================

/// 20-byte account address
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn from_slice(bytes: &[u8]) -> CoreResult<Self> {
        let arr: [u8; 20] = bytes.try_into().map_err(|_| {
            CoreError::invalid_input(format!("Address must be 20 bytes, got {}", bytes.len()))
        })?;
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// EIP-55 mixed-case rendering
    pub fn to_checksum(&self) -> String {
        to_checksum_address(&self.0)
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = strip_hex_prefix(s.trim());
        if digits.len() != 40 {
            return Err(CoreError::invalid_input(format!(
                "Address must be 40 hex chars, got {}",
                digits.len()
            )));
        }
        let bytes = hex::decode(digits)?;
        Self::from_slice(&bytes)
    }
}

/// Lowercase `0x`-prefixed hex
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::from_str(&s).map_err(de::Error::custom)
    }
}

// =============================================================================
// Curves and message types
// =============================================================================

/// Elliptic curves understood by the collaborator primitives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Curve {
    Secp256k1,
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Curve::Secp256k1 => write!(f, "secp256k1"),
        }
    }
}

/// Message signing schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Raw 32-byte digest, signed without a prefix
    EthSign,
    /// EIP-191 `personal_sign`
    PersonalSign,
    /// Legacy typed data (array of `{type, name, value}`)
    TypedDataV1,
    /// EIP-712 without arrays
    TypedDataV3,
    /// EIP-712 with arrays and nested structs
    TypedDataV4,
}

impl MessageType {
    pub fn is_typed_data(&self) -> bool {
        matches!(self, Self::TypedDataV1 | Self::TypedDataV3 | Self::TypedDataV4)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EthSign => "eth_sign",
            Self::PersonalSign => "personal_sign",
            Self::TypedDataV1 => "typed_data_v1",
            Self::TypedDataV3 => "typed_data_v3",
            Self::TypedDataV4 => "typed_data_v4",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

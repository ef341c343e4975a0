//! Typed Structured Data Hashing
//!
//! Digest computation for the `eth_signTypedData` family:
//! - V1: legacy `[{type, name, value}]` schema hash
//! - V3: EIP-712 without arrays; absent fields are skipped
//! - V4: full EIP-712 with arrays and null structs
//!
//! # Reference
//! - <https://eips.ethereum.org/EIPS/eip-712>

pub mod types;
pub mod encoder;
pub mod hasher;
pub mod legacy;

pub use types::*;
pub use encoder::{encode_type, type_hash};
pub use hasher::{domain_separator, hash_struct, hash_typed_data};
pub use legacy::hash_legacy_typed_data;

/// Encoding revision for EIP-712 typed data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypedDataVersion {
    V3,
    V4,
}

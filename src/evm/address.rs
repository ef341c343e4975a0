//! Address Deriver
//!
//! Public key to address mapping, and batch derivation of address records
//! from an encrypted seed over a path template such as
//! `m/44'/60'/0'/0/{index}`.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};
use crate::{log_debug, log_error};
use crate::primitives::hd::join_path;
use crate::primitives::{HashFn, Primitives};
use crate::security::keystore::EncryptedKey;
use crate::types::{Address, Curve};
use crate::utils::crypto::{encode_hex_prefixed, keccak256};

const MODULE: &str = "evm::address";

/// Placeholder substituted with each requested index
pub const INDEX_PLACEHOLDER: &str = "{index}";

/// Uncompressed SEC1 public keys are `0x04 || x || y`
const UNCOMPRESSED_KEY_LEN: usize = 65;
const UNCOMPRESSED_KEY_TAG: u8 = 0x04;

/// `keccak256(x || y)[12..]`
pub fn address_from_uncompressed(uncompressed: &[u8]) -> CoreResult<Address> {
    address_from_uncompressed_with(keccak256, uncompressed)
}

pub fn address_from_uncompressed_with(hash: HashFn, uncompressed: &[u8]) -> CoreResult<Address> {
    if uncompressed.len() != UNCOMPRESSED_KEY_LEN || uncompressed[0] != UNCOMPRESSED_KEY_TAG {
        return Err(CoreError::invalid_key(format!(
            "Expected a 65-byte uncompressed public key, got {} bytes",
            uncompressed.len()
        )));
    }
    let digest = hash(&uncompressed[1..]);
    Address::from_slice(&digest[12..])
}

/// Decompress a 33-byte public key and map it to its address
pub fn address_from_public_key(primitives: &Primitives, compressed: &[u8]) -> CoreResult<Address> {
    let uncompressed = primitives.decompressor.decompress(Curve::Secp256k1, compressed)?;
    address_from_uncompressed_with(primitives.hash, &uncompressed)
}

/// Derivation path split around its `{index}` segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    prefix: String,
    suffix: String,
}

impl PathTemplate {
    /// Split `template` into the segments before the placeholder segment
    /// (the prefix) and the placeholder segment onward (the suffix).
    pub fn parse(template: &str) -> CoreResult<Self> {
        let template = template.trim();
        let invalid = |reason: &str| {
            CoreError::InvalidPathTemplate(format!("{}: {}", template, reason))
        };

        if template.matches(INDEX_PLACEHOLDER).count() != 1 {
            return Err(invalid("expected exactly one {index} placeholder"));
        }

        let segments: Vec<&str> = template.split('/').collect();
        if segments.first() != Some(&"m") {
            return Err(invalid("must start with m/"));
        }

        let pos = segments
            .iter()
            .position(|segment| segment.contains(INDEX_PLACEHOLDER))
            .ok_or_else(|| invalid("placeholder not found in any segment"))?;

        Ok(Self {
            prefix: segments[..pos].join("/"),
            suffix: segments[pos..].join("/"),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn resolve_suffix(&self, index: u32) -> String {
        self.suffix.replace(INDEX_PLACEHOLDER, &index.to_string())
    }

    /// Full path for `index`
    pub fn resolve(&self, index: u32) -> String {
        join_path(&self.prefix, &self.resolve_suffix(index))
    }
}

impl FromStr for PathTemplate {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.prefix, self.suffix)
    }
}

/// Batch derivation request over an encrypted seed
#[derive(Debug)]
pub struct DeriveRequest {
    pub seed: EncryptedKey,
    pub password: SecretString,
    /// Falls back to the configured template when absent
    pub path_template: Option<String>,
    pub indices: Vec<u32>,
}

impl DeriveRequest {
    pub fn new(seed: EncryptedKey, password: impl Into<String>, indices: Vec<u32>) -> Self {
        Self {
            seed,
            password: SecretString::from(password.into()),
            path_template: None,
            indices,
        }
    }

    pub fn with_path_template(mut self, template: impl Into<String>) -> Self {
        self.path_template = Some(template.into());
        self
    }
}

/// One derived account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressRecord {
    pub path: String,
    /// `0x`-prefixed compressed public key
    pub public_key: String,
    pub address: Address,
}

/// Derive one `AddressRecord` per index, in the order given.
///
/// The whole batch fails with `DerivationCountMismatch` when the HD
/// primitive returns a different number of keys than requested.
pub fn derive_addresses(
    primitives: &Primitives,
    seed: &EncryptedKey,
    password: &SecretString,
    template: &PathTemplate,
    indices: &[u32],
) -> CoreResult<Vec<AddressRecord>> {
    if indices.is_empty() {
        return Ok(Vec::new());
    }

    let suffixes: Vec<String> = indices
        .iter()
        .map(|index| template.resolve_suffix(*index))
        .collect();

    log_debug!(
        MODULE,
        "Deriving address batch",
        prefix = template.prefix(),
        count = indices.len(),
    );

    let keys = primitives.deriver.derive_batch(
        Curve::Secp256k1,
        seed,
        password,
        template.prefix(),
        &suffixes,
    )?;

    if keys.len() != indices.len() {
        log_error!(
            MODULE,
            "HD primitive returned the wrong number of keys",
            requested = indices.len(),
            derived = keys.len(),
        );
        return Err(CoreError::DerivationCountMismatch {
            requested: indices.len(),
            derived: keys.len(),
        });
    }

    keys.into_iter()
        .map(|key| {
            let address = address_from_public_key(primitives, &key.public_key)?;
            Ok(AddressRecord {
                path: key.path,
                public_key: encode_hex_prefixed(&key.public_key),
                address,
            })
        })
        .collect()
}

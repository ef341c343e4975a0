//! Collaborator Primitives
//!
//! The signing core treats curve signing, HD derivation, key decompression,
//! transaction wire encoding and message hashing as injected capabilities.
//! Each one is a trait here; `Primitives` bundles one implementation of each
//! and `Primitives::local()` wires up the in-process defaults.

pub mod secp256k1;
pub mod hd;
pub mod rlp;
pub mod message_hasher;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::CoreResult;
use crate::evm::transaction::CanonicalTransaction;
use crate::security::keystore::EncryptedKey;
use crate::types::{Address, Curve, MessageType};

pub use self::secp256k1::{LocalSigner, Secp256k1Decompressor};
pub use hd::Bip32Deriver;
pub use message_hasher::EthMessageHasher;
pub use rlp::RlpCodec;

/// Output of the curve signing primitive.
///
/// `r` and `s` may arrive in their minimal big-endian encoding; the
/// signature assembler pads them to 32 bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct RawSignature {
    pub r: Vec<u8>,
    pub s: Vec<u8>,
    pub recovery_id: u8,
}

impl fmt::Debug for RawSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawSignature")
            .field("r", &hex::encode(&self.r))
            .field("s", &hex::encode(&self.s))
            .field("recovery_id", &self.recovery_id)
            .finish()
    }
}

/// Chain-aware signature produced by the codec's split step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureTriple {
    /// Legacy `27 + recovery_param`; the codec rewrites it per transaction type
    pub v: u64,
    #[serde(with = "hex_32")]
    pub r: [u8; 32],
    #[serde(with = "hex_32")]
    pub s: [u8; 32],
    pub recovery_param: u8,
}

/// One key returned by the HD batch primitive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedPublicKey {
    /// Full resolved derivation path
    pub path: String,
    /// 33-byte compressed public key
    pub public_key: Vec<u8>,
    /// Base58 extended public key at `path`
    pub extended_key: String,
}

/// Curve signing primitive
pub trait SignerPrimitive: Send + Sync {
    /// Sign a 32-byte digest with the key behind `key`.
    ///
    /// Fails with `Decryption` on a wrong password and `SigningPrimitive`
    /// on any other curve failure.
    fn sign(
        &self,
        key: &EncryptedKey,
        password: &SecretString,
        curve: Curve,
        digest: &[u8; 32],
    ) -> CoreResult<RawSignature>;
}

/// HD batch-derive primitive
pub trait HdBatchDeriver: Send + Sync {
    /// Derive one public key per suffix under `path_prefix`, in order
    fn derive_batch(
        &self,
        curve: Curve,
        seed: &EncryptedKey,
        password: &SecretString,
        path_prefix: &str,
        path_suffixes: &[String],
    ) -> CoreResult<Vec<DerivedPublicKey>>;
}

/// Public-key decompression primitive
pub trait KeyDecompressor: Send + Sync {
    /// Compressed (33-byte) to uncompressed (65-byte) public key
    fn decompress(&self, curve: Curve, compressed: &[u8]) -> CoreResult<Vec<u8>>;
}

/// Transaction wire codec
pub trait TransactionCodec: Send + Sync {
    /// Bytes whose hash is the signing digest
    fn serialize_unsigned(&self, tx: &CanonicalTransaction) -> CoreResult<Vec<u8>>;

    /// Broadcast-ready bytes with the signature attached
    fn serialize_signed(
        &self,
        tx: &CanonicalTransaction,
        signature: &SignatureTriple,
    ) -> CoreResult<Vec<u8>>;

    /// Normalize `(recovery_param, r, s)` into a signature triple
    fn split_signature(
        &self,
        recovery_param: u8,
        r: &[u8; 32],
        s: &[u8; 32],
    ) -> CoreResult<SignatureTriple>;

    /// The `v` actually written to the wire for `tx`
    fn wire_v(&self, tx: &CanonicalTransaction, signature: &SignatureTriple) -> u64;

    /// Recover the sender address from a signed canonical transaction
    fn recover_signer(
        &self,
        tx: &CanonicalTransaction,
        signature: &SignatureTriple,
    ) -> CoreResult<Address>;
}

/// Message hashing collaborator, scheme keyed by message type
pub trait MessageHasher: Send + Sync {
    fn hash_message(&self, message_type: MessageType, message: &str) -> CoreResult<[u8; 32]>;
}

/// Hash primitive
pub type HashFn = fn(&[u8]) -> [u8; 32];

/// Injected capability set used by the chain implementations
#[derive(Clone)]
pub struct Primitives {
    pub signer: Arc<dyn SignerPrimitive>,
    pub deriver: Arc<dyn HdBatchDeriver>,
    pub decompressor: Arc<dyn KeyDecompressor>,
    pub codec: Arc<dyn TransactionCodec>,
    pub message_hasher: Arc<dyn MessageHasher>,
    pub hash: HashFn,
}

impl Primitives {
    /// In-process secp256k1, BIP-32, RLP and keccak implementations
    pub fn local() -> Self {
        Self {
            signer: Arc::new(LocalSigner),
            deriver: Arc::new(Bip32Deriver),
            decompressor: Arc::new(Secp256k1Decompressor),
            codec: Arc::new(RlpCodec),
            message_hasher: Arc::new(EthMessageHasher),
            hash: crate::utils::crypto::keccak256,
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn SignerPrimitive>) -> Self {
        self.signer = signer;
        self
    }

    pub fn with_deriver(mut self, deriver: Arc<dyn HdBatchDeriver>) -> Self {
        self.deriver = deriver;
        self
    }

    pub fn with_decompressor(mut self, decompressor: Arc<dyn KeyDecompressor>) -> Self {
        self.decompressor = decompressor;
        self
    }

    pub fn with_codec(mut self, codec: Arc<dyn TransactionCodec>) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_message_hasher(mut self, hasher: Arc<dyn MessageHasher>) -> Self {
        self.message_hasher = hasher;
        self
    }
}

impl Default for Primitives {
    fn default() -> Self {
        Self::local()
    }
}

impl fmt::Debug for Primitives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Primitives").finish_non_exhaustive()
    }
}

mod hex_32 {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.trim_start_matches("0x")).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

//! EVM Signing Core
//!
//! Turns chain-agnostic transaction and message descriptions into signed,
//! wire-ready artifacts for EVM chains using secp256k1.
//!
//! # Architecture
//!
//! This crate provides:
//! - **evm**: transaction canonicalization, address derivation, message
//!   pre-images and signature assembly
//! - **chain**: the `ChainApi` capability set and `CoreChain` dispatcher
//! - **primitives**: injected signing, HD, decompression, codec and hashing
//!   capabilities with in-process defaults
//! - **typed_data**: EIP-712 and legacy typed data hashing
//! - **security**: encrypted key handles and scoped signing credentials
//!
//! # Security
//!
//! Private keys and seeds only exist decrypted inside a single signing or
//! derivation call, in `zeroize`-backed buffers. Passwords are held as
//! `secrecy::SecretString` and never reach the logger.
//!
//! # Example
//!
//! ```rust,ignore
//! use evm_signing_core::{ChainApi, CoreChain, ChainFamily, EncodedTransaction, SigningMaterial};
//!
//! let chain = CoreChain::local(ChainFamily::Evm);
//! let tx = EncodedTransaction::from_json(tx_json)?;
//! let signed = chain.sign_transaction(&tx, SigningMaterial::new(encrypted_key, password))?;
//! println!("{} {}", signed.transaction_id, signed.raw_tx);
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod utils;
pub mod security;
pub mod primitives;
pub mod typed_data;
pub mod evm;
pub mod chain;

pub use error::{CoreError, CoreResult, ErrorCode};
pub use types::*;

pub use chain::{ChainApi, ChainFamily, CoreChain};
pub use config::SignerConfig;
pub use evm::{
    AddressRecord, CanonicalTransaction, DeriveRequest, EncodedTransaction, EvmChainApi, FeeModel,
    MessagePayload, PathTemplate, SignedTransaction,
};
pub use primitives::{Primitives, RawSignature, SignatureTriple};
pub use security::{EncryptedKey, KdfParams, SigningMaterial};
pub use utils::crypto::{keccak256, to_checksum_address};

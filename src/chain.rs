//! Chain Capability Set
//!
//! `ChainApi` is the chain-agnostic signing contract. Each chain family
//! plugs in its own canonicalization and hashing; `CoreChain` dispatches
//! to the implementation selected by `ChainFamily`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::SignerConfig;
use crate::error::{CoreError, CoreResult};
use crate::evm::{
    AddressRecord, CanonicalTransaction, DeriveRequest, EncodedTransaction, EvmChainApi,
    MessagePayload, SignedTransaction,
};
use crate::primitives::Primitives;
use crate::security::credential::SigningMaterial;
use crate::types::Address;

/// Supported chain families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainFamily {
    Evm,
}

impl fmt::Display for ChainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainFamily::Evm => write!(f, "evm"),
        }
    }
}

impl FromStr for ChainFamily {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "evm" | "eth" | "ethereum" => Ok(ChainFamily::Evm),
            other => Err(CoreError::invalid_input(format!("Unsupported chain family: {}", other))),
        }
    }
}

/// Signing operations every chain family provides
pub trait ChainApi: Send + Sync {
    fn family(&self) -> ChainFamily;

    /// Normalize a transaction description into its signable form
    fn canonicalize(&self, tx: &EncodedTransaction) -> CoreResult<CanonicalTransaction>;

    /// Digest a message signature commits to
    fn build_preimage(&self, payload: &MessagePayload) -> CoreResult<[u8; 32]>;

    /// Canonicalize, sign and serialize; `material` is consumed by the call
    fn sign_transaction(
        &self,
        tx: &EncodedTransaction,
        material: SigningMaterial,
    ) -> CoreResult<SignedTransaction>;

    /// `0x`-prefixed 65-byte message signature
    fn sign_message(&self, payload: &MessagePayload, material: SigningMaterial) -> CoreResult<String>;

    fn derive_addresses(&self, request: DeriveRequest) -> CoreResult<Vec<AddressRecord>>;

    fn address_from_public_key(&self, compressed: &[u8]) -> CoreResult<Address>;
}

/// Tagged dispatcher over the chain implementations
#[derive(Debug, Clone)]
pub enum CoreChain {
    Evm(EvmChainApi),
}

impl CoreChain {
    pub fn new(family: ChainFamily, primitives: Primitives, config: SignerConfig) -> CoreResult<Self> {
        match family {
            ChainFamily::Evm => Ok(CoreChain::Evm(EvmChainApi::new(primitives, config)?)),
        }
    }

    /// Default primitives and configuration for `family`
    pub fn local(family: ChainFamily) -> Self {
        match family {
            ChainFamily::Evm => CoreChain::Evm(EvmChainApi::local()),
        }
    }

    fn api(&self) -> &dyn ChainApi {
        match self {
            CoreChain::Evm(api) => api,
        }
    }
}

impl ChainApi for CoreChain {
    fn family(&self) -> ChainFamily {
        self.api().family()
    }

    fn canonicalize(&self, tx: &EncodedTransaction) -> CoreResult<CanonicalTransaction> {
        self.api().canonicalize(tx)
    }

    fn build_preimage(&self, payload: &MessagePayload) -> CoreResult<[u8; 32]> {
        self.api().build_preimage(payload)
    }

    fn sign_transaction(
        &self,
        tx: &EncodedTransaction,
        material: SigningMaterial,
    ) -> CoreResult<SignedTransaction> {
        self.api().sign_transaction(tx, material)
    }

    fn sign_message(&self, payload: &MessagePayload, material: SigningMaterial) -> CoreResult<String> {
        self.api().sign_message(payload, material)
    }

    fn derive_addresses(&self, request: DeriveRequest) -> CoreResult<Vec<AddressRecord>> {
        self.api().derive_addresses(request)
    }

    fn address_from_public_key(&self, compressed: &[u8]) -> CoreResult<Address> {
        self.api().address_from_public_key(compressed)
    }
}

//! EVM Signing
//!
//! The EVM implementation of the chain capability set. Each operation is a
//! stateless pipeline over the injected `Primitives`:
//!
//! ```text
//! EncodedTransaction -> canonicalize -> serialize_unsigned -> hash -> sign
//!                    -> split_signature -> serialize_signed -> SignedTransaction
//! MessagePayload     -> compat rewrite -> hash_message -> sign -> r||s||v
//! DeriveRequest      -> derive_batch -> decompress -> hash -> AddressRecord[]
//! ```

pub mod address;
pub mod message;
pub mod signature;
pub mod transaction;

pub use address::{AddressRecord, DeriveRequest, PathTemplate};
pub use message::MessagePayload;
pub use signature::SignedTransaction;
pub use transaction::{CanonicalTransaction, EncodedTransaction, FeeModel};

use crate::chain::{ChainApi, ChainFamily};
use crate::config::SignerConfig;
use crate::error::{CoreError, CoreResult};
use crate::primitives::{Primitives, SignatureTriple};
use crate::security::credential::SigningMaterial;
use crate::types::{Address, Curve};
use crate::utils::crypto::encode_hex_prefixed;
use crate::utils::logging;
use crate::{log_debug, log_info};

const MODULE: &str = "evm";

/// EVM chain implementation
#[derive(Debug, Clone)]
pub struct EvmChainApi {
    primitives: Primitives,
    config: SignerConfig,
}

impl EvmChainApi {
    pub fn new(primitives: Primitives, config: SignerConfig) -> CoreResult<Self> {
        config.validate()?;
        Ok(Self { primitives, config })
    }

    /// In-process primitives with the default configuration
    pub fn local() -> Self {
        Self {
            primitives: Primitives::local(),
            config: SignerConfig::default(),
        }
    }

    pub fn primitives(&self) -> &Primitives {
        &self.primitives
    }

    pub fn config(&self) -> &SignerConfig {
        &self.config
    }

    /// Run `f` with this signer's debug logging setting
    fn logged<T>(&self, f: impl FnOnce() -> T) -> T {
        logging::with_debug(self.config.debug_logging, f)
    }

    /// `hash(serialize_unsigned(tx))`
    pub fn transaction_digest(&self, tx: &CanonicalTransaction) -> CoreResult<[u8; 32]> {
        let unsigned = self.primitives.codec.serialize_unsigned(tx)?;
        Ok((self.primitives.hash)(&unsigned))
    }

    /// Recover the sender of a signed canonical transaction
    pub fn recover_transaction_signer(
        &self,
        tx: &CanonicalTransaction,
        signature: &SignatureTriple,
    ) -> CoreResult<Address> {
        self.primitives.codec.recover_signer(tx, signature)
    }

    /// Check a 65-byte `r||s||v` message signature against `expected`
    pub fn verify_message(
        &self,
        payload: &MessagePayload,
        signature: &str,
        expected: &Address,
    ) -> CoreResult<bool> {
        self.logged(|| {
            message::verify_message(
                self.primitives.message_hasher.as_ref(),
                payload,
                signature,
                expected,
                self.config.legacy_message_patch,
            )
        })
    }
}

impl ChainApi for EvmChainApi {
    fn family(&self) -> ChainFamily {
        ChainFamily::Evm
    }

    fn canonicalize(&self, tx: &EncodedTransaction) -> CoreResult<CanonicalTransaction> {
        self.logged(|| transaction::canonicalize(tx))
    }

    fn build_preimage(&self, payload: &MessagePayload) -> CoreResult<[u8; 32]> {
        self.logged(|| {
            message::build_preimage(
                self.primitives.message_hasher.as_ref(),
                payload,
                self.config.legacy_message_patch,
            )
        })
    }

    fn sign_transaction(
        &self,
        tx: &EncodedTransaction,
        material: SigningMaterial,
    ) -> CoreResult<SignedTransaction> {
        self.logged(|| {
            let canonical = transaction::canonicalize(tx)?;
            let digest = self.transaction_digest(&canonical)?;
            log_debug!(
                MODULE,
                "Signing transaction digest",
                digest = encode_hex_prefixed(&digest),
                tx_type = canonical.tx_type(),
            );

            let raw = self
                .primitives
                .signer
                .sign(material.key(), material.password(), Curve::Secp256k1, &digest)?;
            drop(material);

            let triple = signature::assemble_transaction_signature(self.primitives.codec.as_ref(), &raw)?;
            let signed = signature::finalize_transaction(
                self.primitives.codec.as_ref(),
                self.primitives.hash,
                &canonical,
                &digest,
                &triple,
            )?;

            log_info!(
                MODULE,
                "Transaction signed",
                transaction_id = signed.transaction_id,
                chain_id = canonical.chain_id(),
            );
            Ok(signed)
        })
    }

    fn sign_message(&self, payload: &MessagePayload, material: SigningMaterial) -> CoreResult<String> {
        self.logged(|| {
            let digest = self.build_preimage(payload)?;
            let raw = self
                .primitives
                .signer
                .sign(material.key(), material.password(), Curve::Secp256k1, &digest)?;
            drop(material);

            signature::assemble_message_signature(&raw)
        })
    }

    fn derive_addresses(&self, request: DeriveRequest) -> CoreResult<Vec<AddressRecord>> {
        self.logged(|| {
            if request.indices.len() > self.config.max_derivation_batch {
                return Err(CoreError::invalid_input(format!(
                    "Requested {} indices, limit is {}",
                    request.indices.len(),
                    self.config.max_derivation_batch
                )));
            }

            let template = match request.path_template.as_deref() {
                Some(template) => PathTemplate::parse(template)?,
                None => self.config.default_path_template()?,
            };

            address::derive_addresses(
                &self.primitives,
                &request.seed,
                &request.password,
                &template,
                &request.indices,
            )
        })
    }

    fn address_from_public_key(&self, compressed: &[u8]) -> CoreResult<Address> {
        address::address_from_public_key(&self.primitives, compressed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::keystore::{EncryptedKey, KdfParams};
    use crate::types::{MessageType, Quantity};

    const HARDHAT_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const HARDHAT_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn fast_params() -> KdfParams {
        KdfParams { memory_cost: 1024, time_cost: 1, parallelism: 1 }
    }

    fn material() -> SigningMaterial {
        let key = EncryptedKey::encrypt(&hex::decode(HARDHAT_KEY).unwrap(), "pass phrase", fast_params())
            .unwrap();
        SigningMaterial::new(key, "pass phrase")
    }

    fn transfer() -> EncodedTransaction {
        EncodedTransaction {
            to: Some("0x70997970c51812dc3a010c7d01b50e0d17dc79c8".parse().unwrap()),
            nonce: Some(Quantity::from_u64(0)),
            gas_limit: Some(Quantity::from_u64(21000)),
            value: Some(Quantity::from_u64(1)),
            chain_id: Some(Quantity::from_u64(31337)),
            max_fee_per_gas: Some(Quantity::from_u64(2_000_000_000)),
            max_priority_fee_per_gas: Some(Quantity::from_u64(1_000_000_000)),
            ..Default::default()
        }
    }

    #[test]
    fn test_sign_transaction_recovers_signer() {
        let api = EvmChainApi::local();
        let signed = api.sign_transaction(&transfer(), material()).unwrap();

        assert!(signed.raw_tx.starts_with("0x02"));
        assert_eq!(signed.transaction_id.len(), 66);
        assert!(signed.v <= 1);

        let canonical = api.canonicalize(&transfer()).unwrap();
        assert_eq!(signed.digest, encode_hex_prefixed(&api.transaction_digest(&canonical).unwrap()));

        let triple = SignatureTriple {
            v: signed.v,
            r: hex::decode(&signed.r[2..]).unwrap().try_into().unwrap(),
            s: hex::decode(&signed.s[2..]).unwrap().try_into().unwrap(),
            recovery_param: signed.v as u8,
        };
        let signer = api.recover_transaction_signer(&canonical, &triple).unwrap();
        assert_eq!(signer.to_string(), HARDHAT_ADDRESS);
    }

    #[test]
    fn test_sign_transaction_wrong_password() {
        let api = EvmChainApi::local();
        let key = EncryptedKey::encrypt(&hex::decode(HARDHAT_KEY).unwrap(), "pass phrase", fast_params())
            .unwrap();
        let result = api.sign_transaction(&transfer(), SigningMaterial::new(key, "wrong phrase"));
        assert_eq!(result.unwrap_err(), CoreError::Decryption);
    }

    #[test]
    fn test_sign_and_verify_message() {
        let api = EvmChainApi::local();
        let payload = MessagePayload::new(MessageType::PersonalSign, "Sign in to example.org");
        let signature = api.sign_message(&payload, material()).unwrap();

        assert_eq!(signature.len(), 132);
        let expected: Address = HARDHAT_ADDRESS.parse().unwrap();
        assert!(api.verify_message(&payload, &signature, &expected).unwrap());
    }

    #[test]
    fn test_derive_batch_limit() {
        let api = EvmChainApi::new(
            Primitives::local(),
            SignerConfig { max_derivation_batch: 2, ..SignerConfig::default() },
        )
        .unwrap();
        let seed = EncryptedKey::encrypt(&[1u8; 64], "seed phrase", fast_params()).unwrap();
        let request = DeriveRequest::new(seed, "seed phrase", vec![0, 1, 2]);

        assert!(matches!(api.derive_addresses(request), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn test_debug_logging_is_scoped_to_the_instance() {
        let verbose = EvmChainApi::new(
            Primitives::local(),
            SignerConfig::default().with_debug_logging(true),
        )
        .unwrap();
        let quiet = EvmChainApi::local();

        assert!(!logging::is_debug_enabled());
        assert!(verbose.logged(logging::is_debug_enabled));
        assert!(!quiet.logged(logging::is_debug_enabled));
        assert!(!verbose.logged(|| quiet.logged(logging::is_debug_enabled)));

        verbose.canonicalize(&transfer()).unwrap();
        assert!(!logging::is_debug_enabled());
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SignerConfig::default().with_path_template("m/44'/60'");
        assert!(EvmChainApi::new(Primitives::local(), config).is_err());
    }
}

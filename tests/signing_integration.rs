//! Signing Integration Tests
//!
//! Full pipelines through the public API:
//! - address derivation from an encrypted BIP-39 seed
//! - transaction signing against the EIP-155 reference transaction
//! - message signing, including the `value1` rewrite
//! - failure propagation from injected primitives

use std::sync::Arc;

use evm_signing_core::primitives::{
    Bip32Deriver, DerivedPublicKey, HdBatchDeriver, SignerPrimitive,
};
use evm_signing_core::security::keystore::{EncryptedKey, KdfParams};
use evm_signing_core::*;
use secrecy::SecretString;

// MARK: - Helper Functions

const HARDHAT_MNEMONIC: &str = "test test test test test test test test test test test junk";
const HARDHAT_ADDRESSES: [&str; 3] = [
    "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
    "0x70997970c51812dc3a010c7d01b50e0d17dc79c8",
    "0x3c44cdddb6a900fa2b585dd299e03d12fa4293bc",
];
const HARDHAT_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

const EIP155_SIGNED: &str = "0xf86c098504a817c800825208943535353535353535353535353535353535353535880de0b6b3a76400008025a028ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276a067cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83";
const EIP155_DIGEST: &str = "0xdaf5a779ae972f972197303d7b574746c7ef83eadac0f2791ad23db92e4c8e53";

const PASSWORD: &str = "integration password";

fn fast_params() -> KdfParams {
    KdfParams { memory_cost: 1024, time_cost: 1, parallelism: 1 }
}

fn encrypted(secret: &[u8]) -> EncryptedKey {
    EncryptedKey::encrypt(secret, PASSWORD, fast_params()).unwrap()
}

fn hardhat_seed() -> EncryptedKey {
    let mnemonic = bip39::Mnemonic::parse_normalized(HARDHAT_MNEMONIC).unwrap();
    encrypted(&mnemonic.to_seed_normalized(""))
}

fn material(secret_hex: &str) -> SigningMaterial {
    SigningMaterial::new(encrypted(&hex::decode(secret_hex).unwrap()), PASSWORD)
}

fn eip155_tx() -> EncodedTransaction {
    EncodedTransaction::from_json(
        r#"{
            "to": "0x3535353535353535353535353535353535353535",
            "nonce": 9,
            "gasPrice": "20000000000",
            "gasLimit": "0x5208",
            "value": "1000000000000000000",
            "chainId": 1
        }"#,
    )
    .unwrap()
}

/// Returns one key fewer than requested
struct ShortDeriver;

impl HdBatchDeriver for ShortDeriver {
    fn derive_batch(
        &self,
        curve: Curve,
        seed: &EncryptedKey,
        password: &SecretString,
        path_prefix: &str,
        path_suffixes: &[String],
    ) -> CoreResult<Vec<DerivedPublicKey>> {
        let mut keys = Bip32Deriver.derive_batch(curve, seed, password, path_prefix, path_suffixes)?;
        keys.pop();
        Ok(keys)
    }
}

/// Returns a fixed signature with minimally encoded r and s
struct FixedSigner(RawSignature);

impl SignerPrimitive for FixedSigner {
    fn sign(
        &self,
        _key: &EncryptedKey,
        _password: &SecretString,
        _curve: Curve,
        _digest: &[u8; 32],
    ) -> CoreResult<RawSignature> {
        Ok(self.0.clone())
    }
}

struct FailingSigner;

impl SignerPrimitive for FailingSigner {
    fn sign(
        &self,
        _key: &EncryptedKey,
        _password: &SecretString,
        _curve: Curve,
        _digest: &[u8; 32],
    ) -> CoreResult<RawSignature> {
        Err(CoreError::signing_primitive("hardware signer unavailable"))
    }
}

// MARK: - Address Derivation

#[test]
fn test_hardhat_addresses_in_order() {
    let chain = CoreChain::local(ChainFamily::Evm);
    let records = chain
        .derive_addresses(DeriveRequest::new(hardhat_seed(), PASSWORD, vec![0, 1, 2]))
        .unwrap();

    assert_eq!(records.len(), 3);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.path, format!("m/44'/60'/0'/0/{}", i));
        assert_eq!(record.address.to_string(), HARDHAT_ADDRESSES[i]);
        assert_eq!(record.public_key.len(), 2 + 66);
    }
}

#[test]
fn test_derivation_preserves_caller_order() {
    let chain = CoreChain::local(ChainFamily::Evm);
    let records = chain
        .derive_addresses(DeriveRequest::new(hardhat_seed(), PASSWORD, vec![2, 0]))
        .unwrap();

    assert_eq!(records[0].address.to_string(), HARDHAT_ADDRESSES[2]);
    assert_eq!(records[1].address.to_string(), HARDHAT_ADDRESSES[0]);
}

#[test]
fn test_derivation_with_explicit_template() {
    let chain = CoreChain::local(ChainFamily::Evm);
    let request = DeriveRequest::new(hardhat_seed(), PASSWORD, vec![0])
        .with_path_template("m/44'/60'/{index}'/0/0");
    let records = chain.derive_addresses(request).unwrap();

    assert_eq!(records[0].path, "m/44'/60'/0'/0/0");
    assert_eq!(records[0].address.to_string(), HARDHAT_ADDRESSES[0]);
}

#[test]
fn test_derivation_count_mismatch_fails_whole_batch() {
    let primitives = Primitives::local().with_deriver(Arc::new(ShortDeriver));
    let chain = CoreChain::new(ChainFamily::Evm, primitives, SignerConfig::default()).unwrap();

    let result = chain.derive_addresses(DeriveRequest::new(hardhat_seed(), PASSWORD, vec![0, 1, 2]));
    assert_eq!(
        result.unwrap_err(),
        CoreError::DerivationCountMismatch { requested: 3, derived: 2 }
    );
}

#[test]
fn test_derivation_wrong_password() {
    let chain = CoreChain::local(ChainFamily::Evm);
    let result = chain.derive_addresses(DeriveRequest::new(hardhat_seed(), "not the password", vec![0]));
    assert_eq!(result.unwrap_err(), CoreError::Decryption);
}

#[test]
fn test_address_from_public_key_matches_derivation() {
    let chain = CoreChain::local(ChainFamily::Evm);
    let records = chain
        .derive_addresses(DeriveRequest::new(hardhat_seed(), PASSWORD, vec![1]))
        .unwrap();

    let compressed = hex::decode(&records[0].public_key[2..]).unwrap();
    let first = chain.address_from_public_key(&compressed).unwrap();
    let second = chain.address_from_public_key(&compressed).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.to_string(), HARDHAT_ADDRESSES[1]);
    assert_eq!(first.to_checksum(), "0x70997970C51812dc3A010C7d01b50e0d17dc79C8");
}

// MARK: - Transaction Signing

#[test]
fn test_eip155_reference_transaction() {
    let chain = CoreChain::local(ChainFamily::Evm);
    let secret = hex::encode([0x46u8; 32]);

    let signed = chain.sign_transaction(&eip155_tx(), material(&secret)).unwrap();

    assert_eq!(signed.raw_tx, EIP155_SIGNED);
    assert_eq!(signed.digest, EIP155_DIGEST);
    assert_eq!(signed.v, 37);

    let raw = hex::decode(&signed.raw_tx[2..]).unwrap();
    assert_eq!(signed.transaction_id, format!("0x{}", hex::encode(keccak256(&raw))));
}

#[test]
fn test_canonical_json_rendering() {
    let chain = CoreChain::local(ChainFamily::Evm);
    let canonical = chain.canonicalize(&eip155_tx()).unwrap();
    let json = serde_json::to_value(&canonical).unwrap();

    assert_eq!(json["type"], 0);
    assert_eq!(json["nonce"], "0x9");
    assert_eq!(json["gasPrice"], "0x4a817c800");
    assert_eq!(json["value"], "0xde0b6b3a7640000");
    assert_eq!(json["data"], "0x");
    assert!(json.get("maxFeePerGas").is_none());
}

#[test]
fn test_signing_material_wrong_password() {
    let chain = CoreChain::local(ChainFamily::Evm);
    let key = encrypted(&hex::decode(HARDHAT_KEY).unwrap());
    let result = chain.sign_transaction(&eip155_tx(), SigningMaterial::new(key, "bad password"));
    assert_eq!(result.unwrap_err(), CoreError::Decryption);
}

#[test]
fn test_missing_fee_model_never_reaches_signer() {
    let primitives = Primitives::local().with_signer(Arc::new(FailingSigner));
    let chain = CoreChain::new(ChainFamily::Evm, primitives, SignerConfig::default()).unwrap();

    let mut tx = eip155_tx();
    tx.gas_price = None;
    let result = chain.sign_transaction(&tx, material(HARDHAT_KEY));
    assert_eq!(result.unwrap_err(), CoreError::missing_field("gasPrice"));
}

#[test]
fn test_oversized_chain_id_is_rejected_before_signing() {
    let primitives = Primitives::local().with_signer(Arc::new(FailingSigner));
    let chain = CoreChain::new(ChainFamily::Evm, primitives, SignerConfig::default()).unwrap();

    let mut tx = eip155_tx();
    tx.chain_id = Some("9223372036854775808".parse().unwrap());
    let result = chain.sign_transaction(&tx, material(HARDHAT_KEY));
    assert!(matches!(result, Err(CoreError::InvalidInput(_))));
}

#[test]
fn test_signer_failure_is_propagated() {
    let primitives = Primitives::local().with_signer(Arc::new(FailingSigner));
    let chain = CoreChain::new(ChainFamily::Evm, primitives, SignerConfig::default()).unwrap();

    let err = chain.sign_transaction(&eip155_tx(), material(HARDHAT_KEY)).unwrap_err();
    assert!(err.is_signing_error());

    let payload = MessagePayload::new(MessageType::PersonalSign, "hello");
    let err = chain.sign_message(&payload, material(HARDHAT_KEY)).unwrap_err();
    assert!(matches!(err, CoreError::SigningPrimitive(_)));
}

#[test]
fn test_minimal_signature_components_are_padded() {
    let raw = RawSignature { r: vec![0x01, 0x02], s: vec![0x03], recovery_id: 1 };
    let primitives = Primitives::local().with_signer(Arc::new(FixedSigner(raw)));
    let chain = CoreChain::new(ChainFamily::Evm, primitives, SignerConfig::default()).unwrap();

    let signed = chain.sign_transaction(&eip155_tx(), material(HARDHAT_KEY)).unwrap();
    assert_eq!(signed.r, format!("0x{}0102", "0".repeat(60)));
    assert_eq!(signed.s, format!("0x{}03", "0".repeat(62)));
    assert_eq!(signed.v, 38);

    let payload = MessagePayload::new(MessageType::PersonalSign, "hello");
    let signature = chain.sign_message(&payload, material(HARDHAT_KEY)).unwrap();
    assert_eq!(signature, format!("0x{}0102{}031c", "0".repeat(60), "0".repeat(62)));
}

// MARK: - Message Signing

#[test]
fn test_personal_sign_verifies() {
    let chain = EvmChainApi::local();
    let payload = MessagePayload::new(MessageType::PersonalSign, "0x68656c6c6f");
    let signature = chain.sign_message(&payload, material(HARDHAT_KEY)).unwrap();

    let bytes = hex::decode(&signature[2..]).unwrap();
    assert_eq!(bytes.len(), 65);
    assert!(bytes[64] == 27 || bytes[64] == 28);

    let signer: Address = HARDHAT_ADDRESSES[0].parse().unwrap();
    assert!(chain.verify_message(&payload, &signature, &signer).unwrap());
}

const VALUE1_TYPED_DATA: &str = r#"{"types":{"EIP712Domain":[{"name":"name","type":"string"}],"Transfer":[{"name":"value1","type":"uint256"},{"name":"value","type":"uint256"}]},"primaryType":"Transfer","domain":{"name":"Bridge"},"message":{"value1":"42"}}"#;

#[test]
fn test_value1_rewrite_makes_typed_data_hashable() {
    let chain = EvmChainApi::local();
    let payload = MessagePayload::new(MessageType::TypedDataV4, VALUE1_TYPED_DATA);

    let patched = chain.build_preimage(&payload).unwrap();
    let explicit = chain
        .build_preimage(&MessagePayload::new(
            MessageType::TypedDataV4,
            VALUE1_TYPED_DATA.replace(r#"{"value1":"42"}"#, r#"{"value1":"42","value":"42"}"#),
        ))
        .unwrap();
    assert_eq!(patched, explicit);
}

#[test]
fn test_value1_rewrite_can_be_disabled() {
    let config = SignerConfig::default().with_legacy_message_patch(false);
    let chain = CoreChain::new(ChainFamily::Evm, Primitives::local(), config).unwrap();
    let payload = MessagePayload::new(MessageType::TypedDataV4, VALUE1_TYPED_DATA);

    let err = chain.build_preimage(&payload).unwrap_err();
    assert!(matches!(err, CoreError::TypedData(_)));
    assert_eq!(err.code(), ErrorCode::TypedDataError);
}

#[test]
fn test_plain_text_message_is_not_rewritten() {
    let chain = EvmChainApi::local();
    let payload = MessagePayload::new(MessageType::PersonalSign, "{not json");
    let digest = chain.build_preimage(&payload).unwrap();
    assert_eq!(
        digest,
        evm_signing_core::primitives::message_hasher::personal_sign_hash(b"{not json")
    );
}

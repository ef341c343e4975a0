//! secp256k1 Primitives
//!
//! Recoverable ECDSA signing over an encrypted key handle, public-key
//! decompression and signer recovery.

use ::secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use ::secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use secrecy::SecretString;

use super::{KeyDecompressor, RawSignature, SignerPrimitive};
use crate::error::{CoreError, CoreResult};
use crate::evm::address::address_from_uncompressed;
use crate::security::credential::with_unlocked;
use crate::security::keystore::EncryptedKey;
use crate::types::{Address, Curve};

/// Signs with a key decrypted for the duration of one call
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSigner;

impl SignerPrimitive for LocalSigner {
    fn sign(
        &self,
        key: &EncryptedKey,
        password: &SecretString,
        curve: Curve,
        digest: &[u8; 32],
    ) -> CoreResult<RawSignature> {
        match curve {
            Curve::Secp256k1 => {}
        }

        with_unlocked(key, password, |secret| sign_digest(secret, digest))
    }
}

/// Recoverable ECDSA over a raw 32-byte private key
pub fn sign_digest(private_key: &[u8], digest: &[u8; 32]) -> CoreResult<RawSignature> {
    if private_key.len() != 32 {
        return Err(CoreError::invalid_key(format!(
            "Private key must be 32 bytes, got {}",
            private_key.len()
        )));
    }

    let secp = Secp256k1::new();
    let mut secret_key = SecretKey::from_slice(private_key)
        .map_err(|e| CoreError::invalid_key(e.to_string()))?;

    let msg = Message::from_digest(*digest);
    let sig = secp.sign_ecdsa_recoverable(&msg, &secret_key);
    secret_key.non_secure_erase();

    let (recovery_id, compact) = sig.serialize_compact();
    let recovery_id = u8::try_from(recovery_id.to_i32())
        .map_err(|_| CoreError::signing_primitive("Recovery id out of range"))?;

    Ok(RawSignature {
        r: compact[..32].to_vec(),
        s: compact[32..].to_vec(),
        recovery_id,
    })
}

/// Recover the signer address of `digest` from a compact signature
pub fn recover_address(
    digest: &[u8; 32],
    r: &[u8; 32],
    s: &[u8; 32],
    recovery_id: u8,
) -> CoreResult<Address> {
    if recovery_id > 1 {
        return Err(CoreError::signing_primitive(format!(
            "Invalid recovery id: {}",
            recovery_id
        )));
    }

    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(r);
    compact[32..].copy_from_slice(s);

    let rec_id = RecoveryId::from_i32(recovery_id as i32)?;
    let signature = RecoverableSignature::from_compact(&compact, rec_id)?;

    let secp = Secp256k1::verification_only();
    let public_key = secp.recover_ecdsa(&Message::from_digest(*digest), &signature)?;

    address_from_uncompressed(&public_key.serialize_uncompressed())
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Secp256k1Decompressor;

impl KeyDecompressor for Secp256k1Decompressor {
    fn decompress(&self, curve: Curve, compressed: &[u8]) -> CoreResult<Vec<u8>> {
        match curve {
            Curve::Secp256k1 => {}
        }

        if compressed.len() != 33 {
            return Err(CoreError::invalid_key(format!(
                "Compressed public key must be 33 bytes, got {}",
                compressed.len()
            )));
        }
        let public_key = PublicKey::from_slice(compressed)
            .map_err(|e| CoreError::invalid_key(e.to_string()))?;
        Ok(public_key.serialize_uncompressed().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::keystore::KdfParams;
    use crate::utils::crypto::keccak256;

    // Hardhat account #0
    const TEST_PRIVATE_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const TEST_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn fast_params() -> KdfParams {
        KdfParams { memory_cost: 1024, time_cost: 1, parallelism: 1 }
    }

    #[test]
    fn test_sign_and_recover() {
        let key = hex::decode(TEST_PRIVATE_KEY).unwrap();
        let digest = keccak256(b"digest under test");

        let raw = sign_digest(&key, &digest).unwrap();
        assert_eq!(raw.r.len(), 32);
        assert_eq!(raw.s.len(), 32);
        assert!(raw.recovery_id <= 1);

        let r: [u8; 32] = raw.r.clone().try_into().unwrap();
        let s: [u8; 32] = raw.s.clone().try_into().unwrap();
        let recovered = recover_address(&digest, &r, &s, raw.recovery_id).unwrap();
        assert_eq!(recovered.to_string(), TEST_ADDRESS);
    }

    #[test]
    fn test_local_signer_uses_encrypted_handle() {
        let secret = hex::decode(TEST_PRIVATE_KEY).unwrap();
        let handle = EncryptedKey::encrypt(&secret, "signing password", fast_params()).unwrap();
        let digest = [0x11u8; 32];

        let raw = LocalSigner
            .sign(&handle, &SecretString::from("signing password".to_string()), Curve::Secp256k1, &digest)
            .unwrap();
        assert_eq!(raw, sign_digest(&secret, &digest).unwrap());
    }

    #[test]
    fn test_local_signer_wrong_password() {
        let secret = hex::decode(TEST_PRIVATE_KEY).unwrap();
        let handle = EncryptedKey::encrypt(&secret, "signing password", fast_params()).unwrap();

        let result = LocalSigner.sign(
            &handle,
            &SecretString::from("not the password".to_string()),
            Curve::Secp256k1,
            &[0u8; 32],
        );
        assert_eq!(result.unwrap_err(), CoreError::Decryption);
    }

    #[test]
    fn test_wrong_length_key_is_invalid_key() {
        let result = sign_digest(&[1u8; 16], &[0u8; 32]);
        assert!(matches!(result, Err(CoreError::InvalidKey(_))));

        // zero is not a valid scalar
        let result = sign_digest(&[0u8; 32], &[0u8; 32]);
        assert!(matches!(result, Err(CoreError::InvalidKey(_))));
    }

    #[test]
    fn test_decompress() {
        let secp = Secp256k1::new();
        let sk = SecretKey::from_slice(&hex::decode(TEST_PRIVATE_KEY).unwrap()).unwrap();
        let pk = PublicKey::from_secret_key(&secp, &sk);

        let uncompressed = Secp256k1Decompressor
            .decompress(Curve::Secp256k1, &pk.serialize())
            .unwrap();
        assert_eq!(uncompressed.len(), 65);
        assert_eq!(uncompressed[0], 0x04);
        assert_eq!(uncompressed, pk.serialize_uncompressed().to_vec());

        assert!(Secp256k1Decompressor.decompress(Curve::Secp256k1, &[2u8; 10]).is_err());
    }

    #[test]
    fn test_recover_rejects_bad_recovery_id() {
        let result = recover_address(&[0u8; 32], &[1u8; 32], &[1u8; 32], 4);
        assert!(result.is_err());
    }
}

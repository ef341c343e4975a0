//! BIP-32 Batch Derivation
//!
//! Derives public keys from an encrypted seed. The account node at the
//! path prefix is derived once; each suffix is then derived beneath it.

use bitcoin::bip32::{DerivationPath, Xpriv, Xpub};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::Network;
use secrecy::SecretString;
use std::str::FromStr;

use super::{DerivedPublicKey, HdBatchDeriver};
use crate::error::{CoreError, CoreResult};
use crate::security::credential::with_unlocked;
use crate::security::keystore::EncryptedKey;
use crate::types::Curve;

/// BIP-32 seeds are 128 to 512 bits
const MIN_SEED_LEN: usize = 16;
const MAX_SEED_LEN: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct Bip32Deriver;

impl HdBatchDeriver for Bip32Deriver {
    fn derive_batch(
        &self,
        curve: Curve,
        seed: &EncryptedKey,
        password: &SecretString,
        path_prefix: &str,
        path_suffixes: &[String],
    ) -> CoreResult<Vec<DerivedPublicKey>> {
        match curve {
            Curve::Secp256k1 => {}
        }

        let prefix_path = parse_path(path_prefix.trim_end_matches('/'))?;
        let suffix_paths = path_suffixes
            .iter()
            .map(|suffix| parse_path(&format!("m/{}", suffix)))
            .collect::<CoreResult<Vec<_>>>()?;

        with_unlocked(seed, password, |seed_bytes| {
            if seed_bytes.len() < MIN_SEED_LEN || seed_bytes.len() > MAX_SEED_LEN {
                return Err(CoreError::invalid_key(format!(
                    "Seed must be {}-{} bytes, got {}",
                    MIN_SEED_LEN,
                    MAX_SEED_LEN,
                    seed_bytes.len()
                )));
            }

            let secp = Secp256k1::new();
            let mut master = Xpriv::new_master(Network::Bitcoin, seed_bytes)
                .map_err(|e| CoreError::invalid_key(format!("BIP32 error: {}", e)))?;
            let account = master.derive_priv(&secp, &prefix_path);
            master.private_key.non_secure_erase();
            let mut account =
                account.map_err(|e| CoreError::signing_primitive(format!("BIP32 error: {}", e)))?;

            let derived = suffix_paths
                .iter()
                .zip(path_suffixes)
                .map(|(child_path, suffix)| {
                    let mut child = account
                        .derive_priv(&secp, child_path)
                        .map_err(|e| CoreError::signing_primitive(format!("BIP32 error: {}", e)))?;
                    let xpub = Xpub::from_priv(&secp, &child);
                    child.private_key.non_secure_erase();

                    Ok(DerivedPublicKey {
                        path: join_path(path_prefix, suffix),
                        public_key: xpub.public_key.serialize().to_vec(),
                        extended_key: xpub.to_string(),
                    })
                })
                .collect::<CoreResult<Vec<_>>>();

            account.private_key.non_secure_erase();
            derived
        })
    }
}

fn parse_path(path: &str) -> CoreResult<DerivationPath> {
    DerivationPath::from_str(path)
        .map_err(|e| CoreError::InvalidPathTemplate(format!("{}: {}", path, e)))
}

/// `prefix` + `/` + `suffix`, tolerating a trailing slash on the prefix
pub fn join_path(prefix: &str, suffix: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::keystore::KdfParams;

    fn fast_params() -> KdfParams {
        KdfParams { memory_cost: 1024, time_cost: 1, parallelism: 1 }
    }

    fn encrypted_seed() -> (EncryptedKey, SecretString) {
        let seed = [0x42u8; 64];
        let handle = EncryptedKey::encrypt(&seed, "seed password", fast_params()).unwrap();
        (handle, SecretString::from("seed password".to_string()))
    }

    #[test]
    fn test_derive_batch_preserves_order() {
        let (seed, password) = encrypted_seed();
        let suffixes: Vec<String> = vec!["2".into(), "0".into(), "1".into()];

        let keys = Bip32Deriver
            .derive_batch(Curve::Secp256k1, &seed, &password, "m/44'/60'/0'/0", &suffixes)
            .unwrap();

        assert_eq!(keys.len(), 3);
        assert_eq!(keys[0].path, "m/44'/60'/0'/0/2");
        assert_eq!(keys[1].path, "m/44'/60'/0'/0/0");
        assert_eq!(keys[2].path, "m/44'/60'/0'/0/1");
        for key in &keys {
            assert_eq!(key.public_key.len(), 33);
            assert!(key.extended_key.starts_with("xpub"));
        }
        assert_ne!(keys[0].public_key, keys[1].public_key);
    }

    #[test]
    fn test_derive_batch_is_deterministic() {
        let (seed, password) = encrypted_seed();
        let suffixes: Vec<String> = vec!["0".into()];
        let a = Bip32Deriver
            .derive_batch(Curve::Secp256k1, &seed, &password, "m/44'/60'/0'/0", &suffixes)
            .unwrap();
        let b = Bip32Deriver
            .derive_batch(Curve::Secp256k1, &seed, &password, "m/44'/60'/0'/0/", &suffixes)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_suffix_rejected() {
        let (seed, password) = encrypted_seed();
        let suffixes: Vec<String> = vec!["not-a-number".into()];
        let result = Bip32Deriver.derive_batch(Curve::Secp256k1, &seed, &password, "m/44'/60'/0'/0", &suffixes);
        assert!(matches!(result, Err(CoreError::InvalidPathTemplate(_))));
    }

    #[test]
    fn test_wrong_password() {
        let (seed, _) = encrypted_seed();
        let result = Bip32Deriver.derive_batch(
            Curve::Secp256k1,
            &seed,
            &SecretString::from("wrong password".to_string()),
            "m/44'/60'/0'/0",
            &["0".to_string()],
        );
        assert_eq!(result.unwrap_err(), CoreError::Decryption);
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("m/44'/60'/0'/0", "5"), "m/44'/60'/0'/0/5");
        assert_eq!(join_path("m/44'/60'/0'/0/", "5"), "m/44'/60'/0'/0/5");
    }
}

//! Encrypted Key Handles
//!
//! Private keys and HD seeds reach the core only in encrypted form:
//! - Argon2id derives the wrapping key from the password
//! - AES-256-GCM authenticates the ciphertext, so a wrong password is
//!   detected as a tag failure and surfaced as `CoreError::Decryption`

use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{CoreError, CoreResult};

const KEYSTORE_VERSION: u8 = 1;
const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Encrypted private key or seed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedKey {
    /// Format version
    pub version: u8,
    /// KDF salt (base64)
    pub salt: String,
    /// AES-GCM nonce (base64)
    pub nonce: String,
    /// Ciphertext with auth tag (base64)
    pub ciphertext: String,
    pub kdf_params: KdfParams,
}

/// Argon2id parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KdfParams {
    /// Memory cost in KiB
    pub memory_cost: u32,
    /// Time cost (iterations)
    pub time_cost: u32,
    pub parallelism: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        // 64 MiB memory, 3 iterations, 4 parallel lanes
        Self {
            memory_cost: 65536,
            time_cost: 3,
            parallelism: 4,
        }
    }
}

impl EncryptedKey {
    /// Encrypt existing key material under a password
    pub fn encrypt(plaintext: &[u8], password: &str, kdf_params: KdfParams) -> CoreResult<Self> {
        if password.len() < 8 {
            return Err(CoreError::invalid_input(
                "Password must be at least 8 characters",
            ));
        }
        if plaintext.is_empty() {
            return Err(CoreError::invalid_key("Nothing to encrypt"));
        }

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);

        let key = derive_key(password, &salt, &kdf_params)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|e| CoreError::signing_primitive(format!("Failed to create cipher: {}", e)))?;

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| CoreError::signing_primitive(format!("Encryption failed: {}", e)))?;

        Ok(Self {
            version: KEYSTORE_VERSION,
            salt: base64_encode(&salt),
            nonce: base64_encode(&nonce_bytes),
            ciphertext: base64_encode(&ciphertext),
            kdf_params,
        })
    }

    /// Decrypt into a buffer that is zeroized on drop
    pub fn decrypt(&self, password: &SecretString) -> CoreResult<Zeroizing<Vec<u8>>> {
        if self.version != KEYSTORE_VERSION {
            return Err(CoreError::invalid_key(format!(
                "Unsupported keystore version: {}",
                self.version
            )));
        }

        let salt = base64_decode(&self.salt)?;
        let nonce_bytes = base64_decode(&self.nonce)?;
        let ciphertext = base64_decode(&self.ciphertext)?;

        if salt.len() != SALT_LEN {
            return Err(CoreError::invalid_key("Invalid salt length"));
        }
        if nonce_bytes.len() != NONCE_LEN {
            return Err(CoreError::invalid_key("Invalid nonce length"));
        }

        let key = derive_key(password.expose_secret(), &salt, &self.kdf_params)?;
        let cipher = Aes256Gcm::new_from_slice(key.as_ref())
            .map_err(|e| CoreError::signing_primitive(format!("Failed to create cipher: {}", e)))?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| CoreError::Decryption)?;

        Ok(Zeroizing::new(plaintext))
    }

    pub fn from_json(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| CoreError::invalid_key(format!("Invalid keystore JSON: {}", e)))
    }

    pub fn to_json(&self) -> CoreResult<String> {
        serde_json::to_string(self)
            .map_err(|e| CoreError::encoding(format!("JSON serialization failed: {}", e)))
    }
}

fn derive_key(password: &str, salt: &[u8], params: &KdfParams) -> CoreResult<Zeroizing<[u8; 32]>> {
    use argon2::{Algorithm, Argon2, Params, Version};

    let argon2_params = Params::new(
        params.memory_cost,
        params.time_cost,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| CoreError::invalid_key(format!("Invalid KDF params: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, argon2_params);

    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(password.as_bytes(), salt, key.as_mut())
        .map_err(|e| CoreError::signing_primitive(format!("Key derivation failed: {}", e)))?;

    Ok(key)
}

fn base64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}

fn base64_decode(s: &str) -> CoreResult<Vec<u8>> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(s)
        .map_err(|e| CoreError::invalid_key(format!("Invalid base64: {}", e)))
}

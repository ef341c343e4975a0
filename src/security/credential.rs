//! Scoped Credentials
//!
//! A `SigningMaterial` pairs an encrypted key handle with the password that
//! unlocks it. It is moved into exactly one signing call and dropped there;
//! the password is held in a `SecretString` and is zeroized on drop.
//! Decrypted key bytes only ever exist inside `with_unlocked`.

use secrecy::SecretString;
use std::fmt;
use zeroize::Zeroizing;

use crate::error::CoreResult;
use crate::security::keystore::EncryptedKey;

/// Encrypted private key plus the passphrase needed to decrypt it
pub struct SigningMaterial {
    key: EncryptedKey,
    password: SecretString,
}

impl SigningMaterial {
    pub fn new(key: EncryptedKey, password: impl Into<String>) -> Self {
        Self {
            key,
            password: SecretString::from(password.into()),
        }
    }

    pub fn key(&self) -> &EncryptedKey {
        &self.key
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }
}

impl fmt::Debug for SigningMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningMaterial")
            .field("key", &"[ENCRYPTED]")
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Decrypt `key`, hand the plaintext to `f`, and erase it on every exit path.
pub fn with_unlocked<T>(
    key: &EncryptedKey,
    password: &SecretString,
    f: impl FnOnce(&[u8]) -> CoreResult<T>,
) -> CoreResult<T> {
    let plaintext: Zeroizing<Vec<u8>> = key.decrypt(password)?;
    f(plaintext.as_slice())
}

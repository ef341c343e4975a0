//! Unified error types for the signing core
//!
//! Every operation returns `CoreResult<T>`. Errors are plain values;
//! the core never retries and never returns a partial signature.

use serde::{Deserialize, Serialize};

use crate::typed_data::TypedDataError;

/// Main error type for all signing-core operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A required transaction field was absent (caller input defect)
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// The HD primitive returned a different number of keys than requested
    #[error("Derivation count mismatch: requested {requested}, derived {derived}")]
    DerivationCountMismatch { requested: usize, derived: usize },

    /// Wrong password for an encrypted key or seed
    #[error("Decryption failed - incorrect password or corrupted key material")]
    Decryption,

    /// The underlying curve operation failed
    #[error("Signing primitive failed: {0}")]
    SigningPrimitive(String),

    /// Malformed or wrong-length key material
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid path template: {0}")]
    InvalidPathTemplate(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error(transparent)]
    TypedData(#[from] TypedDataError),
}

impl CoreError {
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField(field.into())
    }

    pub fn signing_primitive(msg: impl Into<String>) -> Self {
        Self::SigningPrimitive(msg.into())
    }

    pub fn invalid_key(msg: impl Into<String>) -> Self {
        Self::InvalidKey(msg.into())
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding(msg.into())
    }

    /// Errors raised by the signer primitive path.
    pub fn is_signing_error(&self) -> bool {
        matches!(
            self,
            Self::Decryption | Self::SigningPrimitive(_) | Self::InvalidKey(_)
        )
    }

    /// Stable code for callers that surface errors as JSON
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::MissingField(_) => ErrorCode::MissingField,
            Self::DerivationCountMismatch { .. } => ErrorCode::DerivationCountMismatch,
            Self::Decryption => ErrorCode::DecryptionFailed,
            Self::SigningPrimitive(_) => ErrorCode::SigningFailed,
            Self::InvalidKey(_) => ErrorCode::InvalidKey,
            Self::InvalidPathTemplate(_) => ErrorCode::InvalidPath,
            Self::InvalidInput(_) => ErrorCode::InvalidInput,
            Self::Encoding(_) => ErrorCode::EncodingError,
            Self::TypedData(_) => ErrorCode::TypedDataError,
        }
    }
}

/// Error codes for categorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    // Input errors
    MissingField,
    InvalidInput,
    InvalidPath,
    InvalidKey,

    // Key store errors
    DecryptionFailed,
    DerivationCountMismatch,

    // Crypto errors
    SigningFailed,

    // Encoding errors
    EncodingError,
    TypedDataError,
}

/// Result type alias for signing-core operations
pub type CoreResult<T> = Result<T, CoreError>;

impl From<hex::FromHexError> for CoreError {
    fn from(e: hex::FromHexError) -> Self {
        CoreError::Encoding(format!("Invalid hex: {}", e))
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::InvalidInput(format!("Invalid JSON: {}", e))
    }
}

impl From<secp256k1::Error> for CoreError {
    fn from(e: secp256k1::Error) -> Self {
        CoreError::SigningPrimitive(format!("Secp256k1 error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_serialization() {
        let err = CoreError::DerivationCountMismatch { requested: 3, derived: 2 };
        let json = serde_json::to_string(&err.code()).unwrap();
        assert_eq!(json, "\"derivation_count_mismatch\"");
        assert!(err.to_string().contains("requested 3"));
    }

    #[test]
    fn test_signing_error_family() {
        assert!(CoreError::Decryption.is_signing_error());
        assert!(CoreError::signing_primitive("boom").is_signing_error());
        assert!(CoreError::invalid_key("short").is_signing_error());
        assert!(!CoreError::missing_field("nonce").is_signing_error());
    }
}

//! Security Module
//!
//! Handling of secret material for the signing core:
//! - Encrypted key and seed handles (Argon2id + AES-256-GCM)
//! - Scoped credentials that are erased when the signing call ends

pub mod keystore;
pub mod credential;

pub use keystore::*;
pub use credential::*;

//! Cryptographic primitives for CredVault.
//!
//! This module provides:
//! - The `SymmetricKey` type (`keys`)
//! - Key file loading, creation and corruption handling (`keyfile`)
//! - The AES-256-GCM `Cipher` handle (`encryption`)

pub mod encryption;
pub mod keyfile;
pub mod keys;

pub use encryption::Cipher;
pub use keyfile::{load_or_create_key, load_or_create_key_with_policy, CorruptKeyPolicy};
pub use keys::SymmetricKey;

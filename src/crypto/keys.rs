//! The vault's symmetric key.
//!
//! A `SymmetricKey` is 32 random bytes generated once and persisted in the
//! key file.  Every record in a store is encrypted under it, so the bytes
//! must stay identical across runs.

use std::fmt;

use sha2::{Digest, Sha256};
use zeroize::Zeroize;

/// Length of the symmetric key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// A 32-byte key that automatically zeroes its memory when dropped.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_LEN],
}

impl SymmetricKey {
    /// Create a new `SymmetricKey` from raw bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Build a key from a slice, returning `None` unless it is exactly
    /// `KEY_LEN` bytes long.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().ok()?;
        Some(Self::new(bytes))
    }

    /// Access the raw key bytes (e.g. to build a cipher).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Short, non-reversible identifier for this key.
    ///
    /// First 8 bytes of SHA-256 over the key, hex-encoded.  Safe to log.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.bytes);
        digest[..8].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl Eq for SymmetricKey {}

// Never print key material.
impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

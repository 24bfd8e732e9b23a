//! AES-256-GCM authenticated encryption of password fields.
//!
//! A `Cipher` is built once from the vault's `SymmetricKey` and passed by
//! reference into every store operation.  Each call to `encrypt` generates
//! a fresh random 12-byte nonce, so encrypting the same password twice
//! never yields the same envelope.
//!
//! Layout of an envelope:
//!   [ version: 1 byte | 12-byte nonce | ciphertext + 16-byte auth tag ]
//!
//! The version byte is passed as associated data, so changing it breaks
//! authentication like any other tampering would.

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::{Zeroize, Zeroizing};

use super::keys::SymmetricKey;
use crate::errors::{CredVaultError, Result};

/// Current envelope version.
const ENVELOPE_VERSION: u8 = 1;

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
const TAG_LEN: usize = 16;

/// Encryption handle bound to one `SymmetricKey`.
pub struct Cipher {
    inner: Aes256Gcm,
}

impl Cipher {
    /// Build the cipher from the vault key.
    pub fn new(key: &SymmetricKey) -> Self {
        Self {
            inner: Aes256Gcm::new(key.as_bytes().into()),
        }
    }

    /// Encrypt `plaintext` and return the raw envelope bytes.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        // Generate a random 12-byte nonce.
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

        let aad = [ENVELOPE_VERSION];
        let ciphertext = self
            .inner
            .encrypt(
                &nonce,
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .map_err(|e| CredVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

        let mut output = Vec::with_capacity(1 + NONCE_LEN + ciphertext.len());
        output.push(ENVELOPE_VERSION);
        output.extend_from_slice(&nonce);
        output.extend_from_slice(&ciphertext);
        Ok(output)
    }

    /// Decrypt an envelope produced by `encrypt`.
    ///
    /// Any failure (truncation, unknown version, wrong key, tampering) is
    /// reported as `DecryptionFailed`.
    pub fn decrypt(&self, envelope: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        if envelope.len() < 1 + NONCE_LEN + TAG_LEN {
            return Err(CredVaultError::DecryptionFailed);
        }

        let (version, rest) = envelope.split_at(1);
        if version[0] != ENVELOPE_VERSION {
            return Err(CredVaultError::DecryptionFailed);
        }

        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);

        let plaintext = self
            .inner
            .decrypt(
                nonce,
                Payload {
                    msg: ciphertext,
                    aad: version,
                },
            )
            .map_err(|_| CredVaultError::DecryptionFailed)?;

        Ok(Zeroizing::new(plaintext))
    }

    /// Encrypt a password and encode the envelope as base64 text for storage.
    pub fn encrypt_to_text(&self, plaintext: &str) -> Result<String> {
        Ok(BASE64.encode(self.encrypt(plaintext.as_bytes())?))
    }

    /// Decode a base64 field and decrypt it back to a UTF-8 password.
    ///
    /// The field must be exactly what `encrypt_to_text` wrote; surrounding
    /// whitespace is not stripped.
    pub fn decrypt_from_text(&self, encoded: &str) -> Result<Zeroizing<String>> {
        let envelope = BASE64
            .decode(encoded)
            .map_err(|_| CredVaultError::DecryptionFailed)?;
        let mut plaintext = self.decrypt(&envelope)?;

        // Take ownership without leaving a copy behind in the Zeroizing buffer.
        let bytes = std::mem::take(&mut *plaintext);
        String::from_utf8(bytes).map(Zeroizing::new).map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            bad_bytes.zeroize();
            CredVaultError::DecryptionFailed
        })
    }
}

//! Key file management for CredVault.
//!
//! The key file holds the vault's `SymmetricKey`.  It is created on first
//! run and read on every run after that.
//!
//! Layout (current format, 36 bytes):
//!   [ `CVK1` magic: 4 bytes | raw key: 32 bytes ]
//!
//! A bare 32-byte file (no magic) is accepted as the legacy format and is
//! never rewritten.
//!
//! A 44-character urlsafe-base64 key (the Fernet key written by the older
//! Python tool) is recognized and never overwritten, whatever the
//! corrupt-key policy says.  It cannot be used with this cipher.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::Path;

use aes_gcm::aead::{KeyInit, OsRng};
use aes_gcm::Aes256Gcm;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use super::keys::{SymmetricKey, KEY_LEN};
use crate::errors::{CredVaultError, Result};

/// Magic bytes at the start of a current-format key file.
const MAGIC: &[u8; 4] = b"CVK1";

/// Length of a urlsafe-base64 encoded Fernet key.
const FERNET_KEY_TEXT_LEN: usize = 44;

/// What to do when the key file exists but cannot be parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptKeyPolicy {
    /// Log a warning, generate a fresh key and overwrite the file.
    /// Records written under the old key can no longer be decrypted.
    #[default]
    Regenerate,
    /// Refuse to continue and return `KeyFileCorrupt`.
    Fail,
}

impl std::str::FromStr for CorruptKeyPolicy {
    type Err = CredVaultError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "regenerate" => Ok(Self::Regenerate),
            "fail" => Ok(Self::Fail),
            other => Err(CredVaultError::ConfigError(format!(
                "unknown corrupt-key policy '{other}' (expected 'regenerate' or 'fail')"
            ))),
        }
    }
}

/// Load the key at `path`, or create one if the file does not exist.
///
/// A corrupt key file is replaced with a fresh key (see `CorruptKeyPolicy`).
pub fn load_or_create_key(path: &Path) -> Result<SymmetricKey> {
    load_or_create_key_with_policy(path, CorruptKeyPolicy::Regenerate)
}

/// Load the key at `path` or create one, applying `policy` to corrupt files.
///
/// Filesystem failures are always fatal and returned as `KeyFileIo`.
pub fn load_or_create_key_with_policy(
    path: &Path,
    policy: CorruptKeyPolicy,
) -> Result<SymmetricKey> {
    let data = match fs::read(path) {
        Ok(data) => Zeroizing::new(data),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            let key = generate_key();
            write_key_file(path, &key)?;
            tracing::info!(
                path = %path.display(),
                fingerprint = %key.fingerprint(),
                "generated new key"
            );
            return Ok(key);
        }
        Err(e) => return Err(CredVaultError::key_io(path, e)),
    };

    match parse_key_file(&data) {
        Ok(key) => {
            tracing::debug!(path = %path.display(), fingerprint = %key.fingerprint(), "loaded key");
            Ok(key)
        }
        Err(_) if is_fernet_key(&data) => Err(CredVaultError::KeyFileCorrupt {
            path: path.to_path_buf(),
            reason: "foreign key format (Fernet key from the original tool); \
                     refusing to overwrite it"
                .into(),
        }),
        Err(reason) => match policy {
            CorruptKeyPolicy::Fail => Err(CredVaultError::KeyFileCorrupt {
                path: path.to_path_buf(),
                reason,
            }),
            CorruptKeyPolicy::Regenerate => {
                let key = generate_key();
                write_key_file(path, &key)?;
                tracing::warn!(
                    path = %path.display(),
                    %reason,
                    fingerprint = %key.fingerprint(),
                    "key file was corrupt and has been replaced; records encrypted under the old key can no longer be decrypted"
                );
                Ok(key)
            }
        },
    }
}

/// Generate a new key from the OS CSPRNG.
pub fn generate_key() -> SymmetricKey {
    let mut generated = Aes256Gcm::generate_key(&mut OsRng);
    let mut bytes = [0u8; KEY_LEN];
    bytes.copy_from_slice(&generated);
    generated.as_mut_slice().zeroize();
    let key = SymmetricKey::new(bytes);
    bytes.zeroize();
    key
}

/// Parse the contents of a key file, accepting the current and legacy layouts.
fn parse_key_file(data: &[u8]) -> std::result::Result<SymmetricKey, String> {
    if data.is_empty() {
        return Err("file is empty".into());
    }

    if data.len() == MAGIC.len() + KEY_LEN {
        let (magic, key) = data.split_at(MAGIC.len());
        if magic != MAGIC {
            return Err("unrecognized header".into());
        }
        return SymmetricKey::from_slice(key).ok_or_else(|| "bad key length".into());
    }

    // Legacy: bare key bytes.
    SymmetricKey::from_slice(data).ok_or_else(|| {
        format!(
            "expected {} or {} bytes, got {}",
            KEY_LEN,
            MAGIC.len() + KEY_LEN,
            data.len()
        )
    })
}

/// Whether `data` is a urlsafe-base64 Fernet key, optionally followed by
/// trailing whitespace.
fn is_fernet_key(data: &[u8]) -> bool {
    let end = data
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(0, |i| i + 1);
    let text = &data[..end];
    if text.len() != FERNET_KEY_TEXT_LEN {
        return false;
    }
    match URL_SAFE.decode(text) {
        Ok(mut decoded) => {
            let is_key = decoded.len() == KEY_LEN;
            decoded.zeroize();
            is_key
        }
        Err(_) => false,
    }
}

/// Write `key` to `path` in the current format with owner-only permissions.
fn write_key_file(path: &Path, key: &SymmetricKey) -> Result<()> {
    // Ensure the parent directory exists.
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| CredVaultError::key_io(path, e))?;
        }
    }

    let mut buf = Vec::with_capacity(MAGIC.len() + KEY_LEN);
    buf.extend_from_slice(MAGIC);
    buf.extend_from_slice(key.as_bytes());

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let result = options.open(path).and_then(|mut file| {
        file.write_all(&buf)?;
        file.sync_all()
    });
    buf.zeroize();
    result.map_err(|e| CredVaultError::key_io(path, e))?;

    // `mode` only applies on creation; tighten an overwritten file too.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))
            .map_err(|e| CredVaultError::key_io(path, e))?;
    }

    Ok(())
}

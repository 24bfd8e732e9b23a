use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in CredVault.
#[derive(Debug, Error)]
pub enum CredVaultError {
    // --- Key file errors ---
    #[error("Key file at {path} is corrupt: {reason}")]
    KeyFileCorrupt { path: PathBuf, reason: String },

    #[error("Key file I/O error at {path}: {source}")]
    KeyFileIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong key or tampered record")]
    DecryptionFailed,

    // --- Record store errors ---
    #[error("Record store I/O error at {path}: {source}")]
    StoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Invalid field: {0}")]
    InvalidField(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),
}

impl CredVaultError {
    pub(crate) fn key_io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::KeyFileIo {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn store_io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::StoreIo {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Convenience type alias for CredVault results.
pub type Result<T> = std::result::Result<T, CredVaultError>;

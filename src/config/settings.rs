use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::CorruptKeyPolicy;
use crate::errors::{CredVaultError, Result};

/// Vault configuration, loaded from `.credvault.toml`.
///
/// Every field has a default so CredVault works without any config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Key file path, relative to the vault directory.
    #[serde(default = "default_key_file")]
    pub key_file: String,

    /// Record file path, relative to the vault directory.
    #[serde(default = "default_credentials_file")]
    pub credentials_file: String,

    /// What to do with an unreadable key file (`regenerate` or `fail`).
    #[serde(default)]
    pub on_corrupt_key: CorruptKeyPolicy,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_key_file() -> String {
    "secret.key".to_string()
}

fn default_credentials_file() -> String {
    "credentials.dat".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            key_file: default_key_file(),
            credentials_file: default_credentials_file(),
            on_corrupt_key: CorruptKeyPolicy::default(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the vault directory.
    const FILE_NAME: &'static str = ".credvault.toml";

    /// Load settings from `<dir>/.credvault.toml`.
    ///
    /// If the file does not exist, defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            CredVaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// Full path to the key file.
    pub fn key_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.key_file)
    }

    /// Full path to the record file.
    pub fn credentials_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.credentials_file)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_match_legacy_file_names() {
        let s = Settings::default();
        assert_eq!(s.key_file, "secret.key");
        assert_eq!(s.credentials_file, "credentials.dat");
        assert_eq!(s.on_corrupt_key, CorruptKeyPolicy::Regenerate);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.key_file, "secret.key");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
key_file = "keys/vault.key"
credentials_file = "store.dat"
on_corrupt_key = "fail"
"#;
        fs::write(tmp.path().join(".credvault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.key_file, "keys/vault.key");
        assert_eq!(settings.credentials_file, "store.dat");
        assert_eq!(settings.on_corrupt_key, CorruptKeyPolicy::Fail);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".credvault.toml"), "key_file = \"k\"\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.key_file, "k");
        assert_eq!(settings.credentials_file, "credentials.dat");
        assert_eq!(settings.on_corrupt_key, CorruptKeyPolicy::Regenerate);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".credvault.toml"), "not valid {{toml").unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn load_errors_on_unknown_policy() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join(".credvault.toml"),
            "on_corrupt_key = \"ignore\"\n",
        )
        .unwrap();
        assert!(Settings::load(tmp.path()).is_err());
    }

    #[test]
    fn paths_are_joined_onto_dir() {
        let s = Settings::default();
        let dir = Path::new("/home/user/vault");
        assert_eq!(s.key_path(dir), PathBuf::from("/home/user/vault/secret.key"));
        assert_eq!(
            s.credentials_path(dir),
            PathBuf::from("/home/user/vault/credentials.dat")
        );
    }
}

//! CLI module — Clap argument parser, output helpers, and command implementations.
//!
//! This layer only prompts and prints.  All storage and crypto work is
//! delegated to `crypto` and `vault`.

pub mod commands;
pub mod output;

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::config::Settings;
use crate::crypto::{load_or_create_key_with_policy, Cipher, CorruptKeyPolicy, SymmetricKey};
use crate::errors::{CredVaultError, Result};
use crate::vault::RecordStore;

/// CredVault CLI: local encrypted credential store.
#[derive(Parser)]
#[command(
    name = "credvault",
    about = "Local encrypted credential store",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault directory holding the key, record and config files (default: .)
    #[arg(long, default_value = ".", global = true, env = "CREDVAULT_DIR")]
    pub dir: String,

    /// Key file path (overrides .credvault.toml)
    #[arg(long, global = true)]
    pub key_file: Option<String>,

    /// Record file path (overrides .credvault.toml)
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// What to do if the key file is corrupt: regenerate or fail
    #[arg(long, global = true)]
    pub on_corrupt_key: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Save a credential (password read from stdin or a hidden prompt)
    Add {
        /// Service name (e.g. Netflix)
        service: String,
        /// Username or email
        username: String,
    },

    /// Look up a credential by service name (case-insensitive)
    Get {
        /// Service name
        service: String,
        /// Print the decrypted password
        #[arg(long)]
        show: bool,
    },

    /// List stored services and usernames
    List,

    /// Show the key file location and fingerprint
    KeyInfo,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolved file locations and key policy for one invocation.
pub struct VaultPaths {
    pub key_path: PathBuf,
    pub store_path: PathBuf,
    pub policy: CorruptKeyPolicy,
}

/// Merge `.credvault.toml` with command-line overrides.
pub fn resolve_paths(cli: &Cli) -> Result<VaultPaths> {
    let dir = PathBuf::from(&cli.dir);
    let settings = Settings::load(&dir)?;

    let key_path = match &cli.key_file {
        Some(p) => PathBuf::from(p),
        None => settings.key_path(&dir),
    };
    let store_path = match &cli.store {
        Some(p) => PathBuf::from(p),
        None => settings.credentials_path(&dir),
    };
    let policy = match &cli.on_corrupt_key {
        Some(p) => p.parse()?,
        None => settings.on_corrupt_key,
    };

    Ok(VaultPaths {
        key_path,
        store_path,
        policy,
    })
}

/// Resolve the vault paths once, then load (or create) the key.
pub fn open_vault(cli: &Cli) -> Result<(VaultPaths, SymmetricKey)> {
    let paths = resolve_paths(cli)?;
    let key = load_or_create_key_with_policy(&paths.key_path, paths.policy)?;
    Ok((paths, key))
}

/// Build the cipher handle and record store for a command.
pub fn open_cipher(cli: &Cli) -> Result<(Cipher, RecordStore)> {
    let (paths, key) = open_vault(cli)?;
    Ok((Cipher::new(&key), RecordStore::new(paths.store_path)))
}

/// Read the password to store, without echoing it.
///
/// Piped stdin is used as-is (trailing newline removed); otherwise a
/// hidden prompt with confirmation is shown.
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn read_password(service: &str) -> Result<Zeroizing<String>> {
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut *buf)?;
        let trimmed = buf.trim_end_matches(['\r', '\n']).len();
        buf.truncate(trimmed);
        return Ok(buf);
    }

    let pw = dialoguer::Password::new()
        .with_prompt(format!("Password for {service}"))
        .with_confirmation("Confirm password", "Passwords do not match, try again")
        .interact()
        .map_err(|e| CredVaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

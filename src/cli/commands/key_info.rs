//! `credvault key-info` — show where the key lives and its fingerprint.

use crate::cli::output;
use crate::cli::{open_vault, Cli};
use crate::errors::Result;

/// Execute the `key-info` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (paths, key) = open_vault(cli)?;

    output::info(&format!("Key file:    {}", paths.key_path.display()));
    output::info(&format!("Fingerprint: {}", key.fingerprint()));
    output::info(&format!("Record file: {}", paths.store_path.display()));

    Ok(())
}

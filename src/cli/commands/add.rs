//! `credvault add` — encrypt and append a credential.

use crate::cli::output;
use crate::cli::{open_cipher, read_password, Cli};
use crate::errors::Result;

/// Execute the `add` command.
pub fn execute(cli: &Cli, service: &str, username: &str) -> Result<()> {
    let (cipher, store) = open_cipher(cli)?;

    let password = read_password(service)?;
    if password.is_empty() {
        output::warning("Saving an empty password.");
    }

    // Duplicates are appended; lookups keep returning the first record.
    if store.contains(service)? {
        output::warning(&format!(
            "'{service}' already exists — the earlier record will still be returned by `get`."
        ));
    }

    store.save(service, username, &password, &cipher)?;
    output::success(&format!("Saved credentials for '{service}'"));

    Ok(())
}

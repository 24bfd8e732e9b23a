//! `credvault list` — display stored services in a table.

use crate::cli::output;
use crate::cli::{resolve_paths, Cli};
use crate::errors::Result;
use crate::vault::RecordStore;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    // Listing never decrypts, so the key is not needed.
    let paths = resolve_paths(cli)?;
    let store = RecordStore::new(paths.store_path);

    let entries = store.services()?;
    output::print_services_table(&entries);

    Ok(())
}

//! `credvault get` — look up a service and decrypt its password.

use console::style;

use crate::cli::output;
use crate::cli::{open_cipher, Cli};
use crate::errors::Result;

/// Execute the `get` command.
pub fn execute(cli: &Cli, service: &str, show: bool) -> Result<()> {
    let (cipher, store) = open_cipher(cli)?;

    let Some(credential) = store.find(service, &cipher)? else {
        output::info(&format!("No credentials found for '{service}'."));
        return Ok(());
    };

    output::success("Found!");
    println!("  {} {}", style("Service:").bold(), service);
    println!("  {} {}", style("Username:").bold(), credential.username);
    if show {
        println!("  {} {}", style("Password:").bold(), credential.password.as_str());
    } else {
        output::tip("Pass --show to print the password.");
    }

    Ok(())
}

//! CredVault — a local, encrypted credential store.
//!
//! Typical use from a caller:
//!
//! ```no_run
//! use credvault::crypto::{load_or_create_key, Cipher};
//! use credvault::vault::RecordStore;
//!
//! # fn main() -> credvault::errors::Result<()> {
//! let key = load_or_create_key("secret.key".as_ref())?;
//! let cipher = Cipher::new(&key);
//! let store = RecordStore::new("credentials.dat");
//!
//! store.save("Netflix", "a@b.com", "p1", &cipher)?;
//! if let Some(found) = store.find("netflix", &cipher)? {
//!     assert_eq!(found.username, "a@b.com");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod vault;

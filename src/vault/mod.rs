//! Vault module — the encrypted credential record store.
//!
//! This module provides:
//! - `CredentialRecord` and the delimited-line codec (`record`)
//! - Advisory locking of the record file (`lock`)
//! - `RecordStore` with `save`, `find` and `services` (`store`)

pub mod lock;
pub mod record;
pub mod store;

pub use record::CredentialRecord;
pub use store::{Credential, RecordStore, ServiceEntry};

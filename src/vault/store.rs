//! Append-only, encrypted-at-rest credential store.
//!
//! `RecordStore` owns nothing but a path.  Every operation opens the
//! record file, locks it, does its work and closes it again, so no handle
//! outlives a call.  Passwords are encrypted with the caller's `Cipher`
//! before they touch the disk and decrypted only for the matching record.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use super::lock::{FileLock, LockMode};
use super::record::{CredentialRecord, Entry, RecordReader};
use crate::crypto::Cipher;
use crate::errors::{CredVaultError, Result};

/// A decrypted lookup result.
pub struct Credential {
    pub username: String,
    pub password: Zeroizing<String>,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Service name and username of a stored record (no password).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEntry {
    pub service: String,
    pub username: String,
}

/// Handle to a record file on disk.
#[derive(Debug, Clone)]
pub struct RecordStore {
    path: PathBuf,
}

impl RecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the record file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Encrypt `password` and append a new record.
    ///
    /// Earlier records are never rewritten.  Saving a service that already
    /// exists adds a second record; `find` keeps returning the first one.
    pub fn save(
        &self,
        service: &str,
        username: &str,
        password: &str,
        cipher: &Cipher,
    ) -> Result<()> {
        if service.is_empty() {
            return Err(CredVaultError::InvalidField(
                "service name cannot be empty".into(),
            ));
        }

        let record = CredentialRecord {
            service: service.to_string(),
            username: username.to_string(),
            encrypted_password: cipher.encrypt_to_text(password)?,
        };
        let line = record.to_line();

        let io_err = |e| CredVaultError::store_io(&self.path, e);

        let mut options = OpenOptions::new();
        options.read(true).append(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(&self.path).map_err(io_err)?;
        let _lock = FileLock::acquire(&file, LockMode::Exclusive).map_err(io_err)?;

        // Don't glue the new record onto a hand-edited last line.
        let mut out = String::with_capacity(line.len() + 2);
        if !ends_with_newline(&file).map_err(io_err)? {
            out.push_str("\r\n");
        }
        out.push_str(&line);

        let mut writer = &file;
        writer.write_all(out.as_bytes()).map_err(io_err)?;
        writer.flush().map_err(io_err)?;

        tracing::debug!(service, path = %self.path.display(), "appended record");
        Ok(())
    }

    /// Look up the first record whose service matches `service_name`
    /// (case-insensitive) and decrypt its password.
    ///
    /// Returns `Ok(None)` when the file does not exist or nothing matches.
    /// A matching record that fails to decrypt is `DecryptionFailed`.
    pub fn find(&self, service_name: &str, cipher: &Cipher) -> Result<Option<Credential>> {
        let found = self.scan(|record| {
            if !record.matches_service(service_name) {
                return Ok(ControlFlow::Continue(()));
            }
            let password = cipher.decrypt_from_text(&record.encrypted_password)?;
            Ok(ControlFlow::Break(Credential {
                username: record.username,
                password,
            }))
        })?;

        tracing::debug!(service = service_name, found = found.is_some(), "lookup finished");
        Ok(found)
    }

    /// Whether any record is stored under `service_name` (case-insensitive).
    /// Nothing is decrypted.
    pub fn contains(&self, service_name: &str) -> Result<bool> {
        let hit = self.scan(|record| {
            Ok(if record.matches_service(service_name) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            })
        })?;
        Ok(hit.is_some())
    }

    /// List every stored `(service, username)` in file order, without
    /// decrypting anything.
    pub fn services(&self) -> Result<Vec<ServiceEntry>> {
        let mut list = Vec::new();
        self.scan::<()>(|record| {
            list.push(ServiceEntry {
                service: record.service,
                username: record.username,
            });
            Ok(ControlFlow::Continue(()))
        })?;
        Ok(list)
    }

    /// Walk well-formed records in file order until `visit` breaks.
    ///
    /// Malformed records are logged and skipped.  If the file holds records
    /// but none of them parse, the first parse failure is returned.
    fn scan<T>(
        &self,
        mut visit: impl FnMut(CredentialRecord) -> Result<ControlFlow<T>>,
    ) -> Result<Option<T>> {
        let io_err = |e| CredVaultError::store_io(&self.path, e);

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_err(e)),
        };
        let _lock = FileLock::acquire(&file, LockMode::Shared).map_err(io_err)?;

        let mut parsed = 0usize;
        let mut first_malformed = None;

        for entry in RecordReader::new(BufReader::new(&file)) {
            match entry.map_err(io_err)? {
                Entry::Record { record, .. } => {
                    parsed += 1;
                    if let ControlFlow::Break(value) = visit(record)? {
                        return Ok(Some(value));
                    }
                }
                Entry::Malformed { line, reason } => {
                    tracing::debug!(line, %reason, "skipping malformed record");
                    if first_malformed.is_none() {
                        first_malformed = Some(CredVaultError::MalformedRecord { line, reason });
                    }
                }
            }
        }

        match first_malformed {
            Some(err) if parsed == 0 => Err(err),
            _ => Ok(None),
        }
    }
}

/// Whether `file` is empty or its last byte is a line feed.
fn ends_with_newline(file: &File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(true);
    }
    let mut reader = file;
    reader.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    reader.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SymmetricKey;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RecordStore, Cipher) {
        let dir = TempDir::new().unwrap();
        let store = RecordStore::new(dir.path().join("credentials.dat"));
        let cipher = Cipher::new(&SymmetricKey::new([0x5Au8; 32]));
        (dir, store, cipher)
    }

    #[test]
    fn save_appends_one_line_per_record() {
        let (_dir, store, cipher) = setup();
        store.save("a", "u1", "p1", &cipher).unwrap();
        store.save("b", "u2", "p2", &cipher).unwrap();

        let contents = fs::read_to_string(store.path()).unwrap();
        assert_eq!(contents.matches("\r\n").count(), 2);
        assert!(contents.starts_with("a,u1,"));
    }

    #[test]
    fn save_rejects_empty_service() {
        let (_dir, store, cipher) = setup();
        let err = store.save("", "u", "p", &cipher).unwrap_err();
        assert!(matches!(err, CredVaultError::InvalidField(_)));
        assert!(!store.path().exists());
    }

    #[test]
    fn save_after_unterminated_line_starts_new_record() {
        let (_dir, store, cipher) = setup();
        fs::write(store.path(), "junk-without-newline").unwrap();
        store.save("svc", "user", "pw", &cipher).unwrap();

        let found = store.find("svc", &cipher).unwrap().unwrap();
        assert_eq!(found.username, "user");
    }

    #[test]
    fn all_malformed_file_is_an_error() {
        let (_dir, store, cipher) = setup();
        fs::write(store.path(), "one-field\nstill,two\n").unwrap();

        let err = store.find("x", &cipher).unwrap_err();
        assert!(matches!(err, CredVaultError::MalformedRecord { line: 1, .. }));
    }

    #[test]
    fn blank_file_is_empty_vault() {
        let (_dir, store, cipher) = setup();
        fs::write(store.path(), "\r\n\n").unwrap();
        assert!(store.find("x", &cipher).unwrap().is_none());
        assert!(store.services().unwrap().is_empty());
    }

    #[test]
    fn services_lists_in_file_order() {
        let (_dir, store, cipher) = setup();
        store.save("Zeta", "z", "1", &cipher).unwrap();
        store.save("Alpha", "a", "2", &cipher).unwrap();

        let names: Vec<_> = store
            .services()
            .unwrap()
            .into_iter()
            .map(|s| s.service)
            .collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn credential_debug_redacts_password() {
        let (_dir, store, cipher) = setup();
        store.save("svc", "user", "s3cret-value", &cipher).unwrap();
        let found = store.find("svc", &cipher).unwrap().unwrap();
        let shown = format!("{found:?}");
        assert!(!shown.contains("s3cret-value"));
        assert!(shown.contains("user"));
    }

    #[cfg(unix)]
    #[test]
    fn record_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store, cipher) = setup();
        store.save("svc", "user", "pw", &cipher).unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

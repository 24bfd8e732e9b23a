//! Advisory file locks for the record file.
//!
//! Appends take an exclusive lock and scans take a shared one, so two
//! processes using the same store never see a half-written record.  The
//! lock is released when the guard is dropped (or the file is closed).
//! On non-Unix targets locking is a no-op.

use std::fs::File;
use std::io;

/// Lock mode requested on a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// RAII guard holding an advisory lock on a file.
pub struct FileLock<'a> {
    #[cfg_attr(not(unix), allow(dead_code))]
    file: &'a File,
}

impl<'a> FileLock<'a> {
    /// Block until the requested lock is acquired.
    pub fn acquire(file: &'a File, mode: LockMode) -> io::Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;

            let op = match mode {
                LockMode::Shared => libc::LOCK_SH,
                LockMode::Exclusive => libc::LOCK_EX,
            };
            loop {
                // SAFETY: the descriptor is owned by `file`, which outlives the guard.
                let rc = unsafe { libc::flock(file.as_raw_fd(), op) };
                if rc == 0 {
                    break;
                }
                let err = io::Error::last_os_error();
                if err.kind() != io::ErrorKind::Interrupted {
                    return Err(err);
                }
            }
        }
        #[cfg(not(unix))]
        let _ = mode;

        Ok(Self { file })
    }
}

impl Drop for FileLock<'_> {
    fn drop(&mut self) {
        #[cfg(unix)]
        {
            use std::os::unix::io::AsRawFd;
            // SAFETY: see `acquire`.  Closing the file would release it anyway.
            unsafe {
                libc::flock(self.file.as_raw_fd(), libc::LOCK_UN);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn shared_locks_can_coexist() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.dat");
        std::fs::write(&path, b"").unwrap();

        let a = File::open(&path).unwrap();
        let b = File::open(&path).unwrap();
        let _ga = FileLock::acquire(&a, LockMode::Shared).unwrap();
        let _gb = FileLock::acquire(&b, LockMode::Shared).unwrap();
    }

    #[test]
    fn exclusive_lock_is_reacquirable_after_drop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("credentials.dat");
        std::fs::write(&path, b"").unwrap();

        let a = File::open(&path).unwrap();
        drop(FileLock::acquire(&a, LockMode::Exclusive).unwrap());

        let b = File::open(&path).unwrap();
        let _gb = FileLock::acquire(&b, LockMode::Exclusive).unwrap();
    }
}

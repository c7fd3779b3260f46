use crate::error::StoreError;
use fs2::FileExt;
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// A held OS advisory lock guaranteeing exactly one writer per `(db_path,
/// account_key)`. Acquisition is non-blocking; a held lock is released
/// unconditionally (including on panic-unwind) when this value drops.
pub struct ProcessLock {
    path: PathBuf,
    file: File,
}

impl ProcessLock {
    /// Attempt to acquire the lock non-blocking. Returns
    /// `StoreError::Locked` with the lock path if another holder exists.
    pub fn acquire(db_path: &Path, account_key: &str) -> Result<Self, StoreError> {
        let lock_path = lock_file_path(db_path, account_key);
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&lock_path)?;

        file.try_lock_exclusive().map_err(|_| StoreError::Locked(lock_path.display().to_string()))?;

        write_pid_sidecar(&lock_path, std::process::id())?;

        Ok(Self { path: lock_path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
        let _ = std::fs::remove_file(pid_sidecar_path(&self.path));
    }
}

fn lock_file_path(db_path: &Path, account_key: &str) -> PathBuf {
    let key = format!("{}|{}", db_path.display(), account_key);
    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    std::env::temp_dir().join(format!("b4-{}.lock", &digest[..16]))
}

fn pid_sidecar_path(lock_path: &Path) -> PathBuf {
    lock_path.with_extension("lock.pid")
}

fn write_pid_sidecar(lock_path: &Path, pid: u32) -> Result<(), StoreError> {
    std::fs::write(pid_sidecar_path(lock_path), pid.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn second_acquisition_for_same_key_fails_fast() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("b4-live.db");
        let _first = ProcessLock::acquire(&db_path, "acct").unwrap();
        let second = ProcessLock::acquire(&db_path, "acct");
        assert!(matches!(second, Err(StoreError::Locked(_))));
    }

    #[test]
    fn lock_is_released_on_drop() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("b4-live.db");
        {
            let _first = ProcessLock::acquire(&db_path, "acct").unwrap();
        }
        let second = ProcessLock::acquire(&db_path, "acct");
        assert!(second.is_ok());
    }

    #[test]
    fn different_account_keys_do_not_contend() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("b4-live.db");
        let _a = ProcessLock::acquire(&db_path, "acct-a").unwrap();
        let b = ProcessLock::acquire(&db_path, "acct-b");
        assert!(b.is_ok());
    }
}

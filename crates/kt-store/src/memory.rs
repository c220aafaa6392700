//! In-memory storage for tests and dry runs.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::StoreError;
use crate::storage::{Storage, is_under};

#[derive(Debug, Default)]
struct Inner {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    folders: Mutex<BTreeSet<String>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

/// Storage held in memory. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent write fail until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.inner.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.inner.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of every stored file path.
    pub fn paths(&self) -> Vec<String> {
        self.files().keys().cloned().collect()
    }

    /// Stored file contents as UTF-8, for assertions.
    pub fn read_string(&self, path: &str) -> Option<String> {
        self.files()
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<String, Vec<u8>>> {
        self.inner.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn folders(&self) -> MutexGuard<'_, BTreeSet<String>> {
        self.inner.folders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add_folder_chain(&self, path: &str) {
        let mut folders = self.folders();
        let mut prefix = String::new();
        for part in path.split('/').filter(|p| !p.is_empty()) {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(part);
            folders.insert(prefix.clone());
        }
    }
}

impl Storage for MemoryStorage {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.files().get(path).cloned())
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if self.inner.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!("write to {path} refused")));
        }
        if let Some((parent, _)) = path.rsplit_once('/') {
            self.add_folder_chain(parent);
        }
        self.files().insert(path.to_string(), bytes.to_vec());
        self.inner.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.files().contains_key(path) || self.folders().contains(path))
    }

    fn ensure_folder(&self, path: &str) -> Result<(), StoreError> {
        self.add_folder_chain(path);
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.files().remove(path);
        Ok(())
    }

    fn list_under(&self, path: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .files()
            .keys()
            .filter(|file| is_under(file, path))
            .cloned()
            .collect())
    }

    fn remove_empty_folders(&self, path: &str) -> Result<usize, StoreError> {
        let files = self.files();
        let mut folders = self.folders();
        let before = folders.len();
        folders.retain(|folder| {
            !is_under(folder, path)
                || files.keys().any(|file| is_under(file, folder))
        });
        Ok(before - folders.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_contents() {
        let storage = MemoryStorage::new();
        let handle = storage.clone();
        storage.write("2025/year-2025.md", b"# 2025").unwrap();

        assert_eq!(handle.read_string("2025/year-2025.md").as_deref(), Some("# 2025"));
        assert!(handle.exists("2025").unwrap());
        assert_eq!(handle.write_count(), 1);
    }

    #[test]
    fn failing_writes_leave_contents_untouched() {
        let storage = MemoryStorage::new();
        storage.write("current.json", b"old").unwrap();
        storage.fail_writes(true);
        assert!(matches!(
            storage.write("current.json", b"new"),
            Err(StoreError::Unavailable(_))
        ));
        storage.fail_writes(false);
        assert_eq!(storage.read_string("current.json").as_deref(), Some("old"));
    }

    #[test]
    fn prunes_folders_without_files() {
        let storage = MemoryStorage::new();
        storage.write("2025/01-January/days/a.json", b"").unwrap();
        storage.ensure_folder("2026/02-February").unwrap();

        assert_eq!(storage.remove_empty_folders("").unwrap(), 2);
        assert!(storage.exists("2025/01-January/days").unwrap());
        assert!(!storage.exists("2026").unwrap());
    }
}

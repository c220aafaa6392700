//! Filesystem-backed storage.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use crate::StoreError;
use crate::storage::{Storage, join};

/// Stores files below a root directory.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves a logical path, rejecting anything that could leave the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(relative))
    }

    fn collect_files(&self, dir: &Path, logical: &str, out: &mut Vec<String>) -> Result<(), StoreError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(StoreError::io(logical, err)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(logical, e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let child = join(logical, &name);
            let file_type = entry.file_type().map_err(|e| StoreError::io(&child, e))?;
            if file_type.is_dir() {
                self.collect_files(&entry.path(), &child, out)?;
            } else {
                out.push(child);
            }
        }
        Ok(())
    }

    /// Removes empty folders below `dir` (not `dir` itself).
    fn prune(dir: &Path, logical: &str) -> Result<usize, StoreError> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(err) => return Err(StoreError::io(logical, err)),
        };
        let mut removed = 0;
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(logical, e))?;
            if !entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            let child = join(logical, &entry.file_name().to_string_lossy());
            let path = entry.path();
            removed += Self::prune(&path, &child)?;
            let is_empty = fs::read_dir(&path)
                .map_err(|e| StoreError::io(&child, e))?
                .next()
                .is_none();
            if is_empty {
                fs::remove_dir(&path).map_err(|e| StoreError::io(&child, e))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl Storage for FsStorage {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.resolve(path)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::io(path, err)),
        }
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let target = self.resolve(path)?;
        let Some(parent) = target.parent() else {
            return Err(StoreError::InvalidPath(path.to_string()));
        };
        fs::create_dir_all(parent).map_err(|e| StoreError::io(path, e))?;

        // Write beside the target and rename so readers never see a torn file.
        let file_name = target
            .file_name()
            .ok_or_else(|| StoreError::InvalidPath(path.to_string()))?;
        let staging = parent.join(format!(".{}.tmp", file_name.to_string_lossy()));
        fs::write(&staging, bytes).map_err(|e| StoreError::io(path, e))?;
        fs::rename(&staging, &target).map_err(|e| StoreError::io(path, e))?;
        tracing::trace!(path, bytes = bytes.len(), "wrote file");
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(self.resolve(path)?.exists())
    }

    fn ensure_folder(&self, path: &str) -> Result<(), StoreError> {
        // create_dir_all tolerates the folder appearing concurrently.
        fs::create_dir_all(self.resolve(path)?).map_err(|e| StoreError::io(path, e))
    }

    fn delete(&self, path: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.resolve(path)?) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::io(path, err)),
        }
    }

    fn list_under(&self, path: &str) -> Result<Vec<String>, StoreError> {
        let dir = self.resolve(path)?;
        let mut files = Vec::new();
        self.collect_files(&dir, path.trim_end_matches('/'), &mut files)?;
        files.sort();
        Ok(files)
    }

    fn remove_empty_folders(&self, path: &str) -> Result<usize, StoreError> {
        let dir = self.resolve(path)?;
        Self::prune(&dir, path.trim_end_matches('/'))
    }
}

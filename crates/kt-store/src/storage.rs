use crate::StoreError;

/// Byte storage addressed by logical paths.
///
/// Paths use `/` separators and are relative to the backend's root. The empty
/// path names the root itself.
pub trait Storage: Send + Sync {
    /// Reads a file, or `None` when it does not exist.
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Creates or overwrites a file. Missing parent folders are created.
    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError>;

    fn exists(&self, path: &str) -> Result<bool, StoreError>;

    /// Creates a folder and its parents. An existing folder is not an error.
    fn ensure_folder(&self, path: &str) -> Result<(), StoreError>;

    /// Deletes a file. A missing file is not an error.
    fn delete(&self, path: &str) -> Result<(), StoreError>;

    /// Every file below `path`, recursively, in lexicographic order.
    fn list_under(&self, path: &str) -> Result<Vec<String>, StoreError>;

    /// Removes empty folders below `path`, deepest first. Returns how many
    /// were removed.
    fn remove_empty_folders(&self, path: &str) -> Result<usize, StoreError>;
}

impl<T: Storage + ?Sized> Storage for &T {
    fn read(&self, path: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).read(path)
    }

    fn write(&self, path: &str, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).write(path, bytes)
    }

    fn exists(&self, path: &str) -> Result<bool, StoreError> {
        (**self).exists(path)
    }

    fn ensure_folder(&self, path: &str) -> Result<(), StoreError> {
        (**self).ensure_folder(path)
    }

    fn delete(&self, path: &str) -> Result<(), StoreError> {
        (**self).delete(path)
    }

    fn list_under(&self, path: &str) -> Result<Vec<String>, StoreError> {
        (**self).list_under(path)
    }

    fn remove_empty_folders(&self, path: &str) -> Result<usize, StoreError> {
        (**self).remove_empty_folders(path)
    }
}

/// Joins a folder and a relative name into a logical path.
pub(crate) fn join(folder: &str, name: &str) -> String {
    if folder.is_empty() {
        name.to_string()
    } else {
        format!("{}/{name}", folder.trim_end_matches('/'))
    }
}

/// Whether `path` lies below `folder` (the empty folder contains everything).
pub(crate) fn is_under(path: &str, folder: &str) -> bool {
    let folder = folder.trim_end_matches('/');
    folder.is_empty()
        || path
            .strip_prefix(folder)
            .is_some_and(|rest| rest.starts_with('/'))
}

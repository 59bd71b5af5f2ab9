//! File-backed [`KeyValueStore`].

use crate::environment::KeyValueStore;
use crate::error::StorageError;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Stores each key as one file inside a directory.
///
/// Keys are mapped to file names by replacing every character outside
/// `[A-Za-z0-9._-]` with `_`. Writes go to a temporary sibling file that is
/// then renamed over the target, so a reader never sees a partial value.
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Store rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the files
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    #[must_use]
    pub fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }

    fn write_atomic(&self, path: &Path, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        let tmp = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp, path)
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::Read {
                key: key.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        self.write_atomic(&path, value)
            .map_err(|e| StorageError::Write {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        tracing::trace!(path = %path.display(), bytes = value.len(), "Persisted value");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn key_is_sanitized() {
        let store = FileKeyValueStore::new("/data");
        assert_eq!(
            store.path_for("@rocket-cart:cart"),
            PathBuf::from("/data/_rocket-cart_cart.json")
        );
    }

    #[test]
    fn missing_key_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path());

        assert_eq!(store.get("@rocket-cart:cart").unwrap(), None);
    }

    #[test]
    fn set_creates_directory_and_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKeyValueStore::new(dir.path().join("nested"));

        store.set("cart", "[1]").unwrap();
        store.set("cart", "[1,2]").unwrap();

        assert_eq!(store.get("cart").unwrap().as_deref(), Some("[1,2]"));
        assert!(!store.path_for("cart").with_extension("json.tmp").exists());
    }

    #[test]
    fn write_into_a_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let store = FileKeyValueStore::new(&blocker);

        let err = store.set("cart", "[]").unwrap_err();

        assert!(matches!(err, StorageError::Write { ref key, .. } if key == "cart"));
    }
}

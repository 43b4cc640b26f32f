//! File-backed store: one JSON object per profile.
//!
//! Used by the command-line driver so a cart survives between invocations.
//! Every write rewrites the whole file through a temporary sibling and a
//! rename, so a crash mid-write leaves the previous contents intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::warn;

use super::LocalStore;

/// Store persisted to a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    /// Store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Store at `<dir>/<profile>.json`.
    #[must_use]
    pub fn in_dir(dir: &Path, profile: &str) -> Self {
        Self::new(dir.join(format!("{profile}.json")))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> BTreeMap<String, String> {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return BTreeMap::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(
                path = %self.path.display(),
                error = %e,
                "Local store file unreadable, starting empty"
            );
            BTreeMap::new()
        })
    }

    fn write_all(&self, entries: &BTreeMap<String, String>) {
        let body = match serde_json::to_string_pretty(entries) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Failed to encode local store");
                return;
            }
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(path = %parent.display(), error = %e, "Failed to create local store directory");
            return;
        }

        let tmp = self.path.with_extension("json.tmp");
        let result = std::fs::write(&tmp, body).and_then(|()| std::fs::rename(&tmp, &self.path));
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "Failed to persist local store");
        }
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.read_all().remove(key)
    }

    fn set(&self, key: &str, value: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_all();
        entries.insert(key.to_owned(), value.to_owned());
        self.write_all(&entries);
    }

    fn remove(&self, key: &str) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut entries = self.read_all();
        if entries.remove(key).is_some() {
            self.write_all(&entries);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "np-commerce-{name}-{}.json",
            std::process::id()
        ))
    }

    #[test]
    fn test_file_store_persists_between_instances() {
        let path = temp_path("persist");
        let _ = std::fs::remove_file(&path);

        FileStore::new(&path).set("np:cart", "[]");
        assert_eq!(FileStore::new(&path).get("np:cart").as_deref(), Some("[]"));

        FileStore::new(&path).remove("np:cart");
        assert_eq!(FileStore::new(&path).get("np:cart"), None);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_corrupt_file_reads_as_empty() {
        let path = temp_path("corrupt");
        std::fs::write(&path, "{not json").ok();

        let store = FileStore::new(&path);
        assert_eq!(store.get("np:cart"), None);

        store.set("np:cart", "[]");
        assert_eq!(store.get("np:cart").as_deref(), Some("[]"));

        let _ = std::fs::remove_file(&path);
    }
}

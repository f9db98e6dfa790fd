//! Blob store: one file per event id under a configured root.
//!
//! Writes go through a temp file and rename. A blob is only written
//! after the authoritative row exists, so blob presence implies the row.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use engram_core::{EngramError, EngramResult};

fn to_blob_err(message: impl Into<String>) -> EngramError {
    EngramError::StoreUnavailable {
        store: "blob store".to_string(),
        reason: message.into(),
    }
}

/// Filesystem-backed large-content store.
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create the store, making the root directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> EngramResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| to_blob_err(format!("create {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    fn path_for(&self, id: &str) -> EngramResult<PathBuf> {
        // Ids are uuids; refuse anything that could escape the root.
        if id.is_empty() || id.contains(['/', '\\', '.']) {
            return Err(EngramError::validation("id", format!("unsafe blob id '{id}'")));
        }
        Ok(self.root.join(id))
    }

    /// Write a blob atomically.
    pub fn write(&self, id: &str, bytes: &[u8]) -> EngramResult<()> {
        let path = self.path_for(id)?;
        let tmp = self.root.join(format!("{id}.tmp"));
        {
            let mut file = fs::File::create(&tmp)
                .map_err(|e| to_blob_err(format!("create {}: {e}", tmp.display())))?;
            file.write_all(bytes)
                .map_err(|e| to_blob_err(format!("write {}: {e}", tmp.display())))?;
            file.sync_all()
                .map_err(|e| to_blob_err(format!("sync {}: {e}", tmp.display())))?;
        }
        fs::rename(&tmp, &path).map_err(|e| to_blob_err(format!("rename blob {id}: {e}")))?;
        Ok(())
    }

    /// Read a blob. `None` when absent.
    pub fn read(&self, id: &str) -> EngramResult<Option<Vec<u8>>> {
        let path = self.path_for(id)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(to_blob_err(format!("read blob {id}: {e}"))),
        }
    }

    /// Delete a blob. Returns whether it existed.
    pub fn delete(&self, id: &str) -> EngramResult<bool> {
        let path = self.path_for(id)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(to_blob_err(format!("delete blob {id}: {e}"))),
        }
    }

    pub fn exists(&self, id: &str) -> bool {
        self.path_for(id).map(|p| p.exists()).unwrap_or(false)
    }

    /// Total bytes across all blobs.
    pub fn total_size(&self) -> EngramResult<u64> {
        let mut total = 0;
        let entries =
            fs::read_dir(&self.root).map_err(|e| to_blob_err(format!("list blobs: {e}")))?;
        for entry in entries {
            let entry = entry.map_err(|e| to_blob_err(e.to_string()))?;
            if let Ok(meta) = entry.metadata() {
                if meta.is_file() {
                    total += meta.len();
                }
            }
        }
        Ok(total)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

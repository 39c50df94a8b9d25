use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

use crate::normalize::CanonicalText;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot store I/O failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One snapshot file per source, named by the SHA-256 of the source URL.
pub struct SnapshotStore {
    root: PathBuf,
}

impl SnapshotStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    pub fn key_for(source: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn snapshot_path(&self, source: &str) -> PathBuf {
        self.root.join(format!("{}.txt", Self::key_for(source)))
    }

    pub fn load(&self, source: &str) -> Result<Option<CanonicalText>, StoreError> {
        let path = self.snapshot_path(source);
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(Some(CanonicalText::from_stored(&raw))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Persists `text` as the new snapshot for `source`, overwriting any
    /// prior one. Empty text is never persisted.
    pub fn save(&self, source: &str, text: &CanonicalText) -> Result<(), StoreError> {
        if text.is_empty() {
            debug!("skipping empty snapshot for {source}");
            return Ok(());
        }
        fs::create_dir_all(&self.root).map_err(|source| StoreError::Io {
            path: self.root.clone(),
            source,
        })?;
        write_atomic(&self.snapshot_path(source), &text.to_string())
    }
}

/// Writes through a sibling temp file and renames into place.
pub fn write_atomic(path: &Path, contents: &str) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents).map_err(|source| StoreError::Io {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

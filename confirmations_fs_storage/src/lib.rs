//! Filesystem-based storage for the confirmations ledger.
//!
//! This crate provides [`FsStorage`], which implements the [`LedgerStorage`]
//! trait from `confirmations_core` by keeping one file per ledger key.
//!
//! # Storage Layout
//!
//! ```text
//! root/
//! ├── confirmations.json       ← ledger document
//! └── confirmations.json.tmp   ← in-flight write, renamed over the document
//! ```
//!
//! # Example
//!
//! ```no_run
//! use confirmations_fs_storage::FsStorage;
//! use std::path::PathBuf;
//!
//! let storage = FsStorage::new(PathBuf::from("./data")).expect("failed to create storage");
//! ```

#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};

use confirmations_core::storage::{LedgerKey, LedgerStorage};
use future_form::{FutureForm, Sendable};
use thiserror::Error;

/// Errors that can occur during filesystem storage operations.
#[derive(Debug, Error)]
pub enum FsStorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key cannot be used as a file name.
    #[error("ledger key {0:?} is not a plain file name")]
    InvalidKey(String),
}

/// Filesystem-based storage backend.
///
/// Writes go to a temporary sibling file which is then renamed over the
/// document, so a crash mid-write leaves the previous document intact.
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    /// Create a new filesystem storage backend at the given root directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(root: PathBuf) -> Result<Self, FsStorageError> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Returns the root directory of the storage.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The path a key's document is stored at.
    ///
    /// # Errors
    ///
    /// Returns [`FsStorageError::InvalidKey`] if the key is empty, a
    /// relative path component, or contains a path separator.
    pub fn document_path(&self, key: &LedgerKey) -> Result<PathBuf, FsStorageError> {
        let name = key.as_str();
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(FsStorageError::InvalidKey(name.to_owned()));
        }
        Ok(self.root.join(name))
    }

    fn temp_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl LedgerStorage<Sendable> for FsStorage {
    type Error = FsStorageError;

    fn load(
        &self,
        key: LedgerKey,
    ) -> <Sendable as FutureForm>::Future<'_, Result<Option<Vec<u8>>, Self::Error>> {
        Sendable::from_future(async move {
            tracing::debug!(%key, "FsStorage::load");

            let path = self.document_path(&key)?;
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(Some(data)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
    }

    fn save(
        &self,
        key: LedgerKey,
        bytes: Vec<u8>,
    ) -> <Sendable as FutureForm>::Future<'_, Result<(), Self::Error>> {
        Sendable::from_future(async move {
            tracing::debug!(%key, len = bytes.len(), "FsStorage::save");

            let path = self.document_path(&key)?;
            let temp_path = Self::temp_path(&path);
            tokio::fs::write(&temp_path, &bytes).await?;
            tokio::fs::rename(&temp_path, &path).await?;

            Ok(())
        })
    }

    fn delete(
        &self,
        key: LedgerKey,
    ) -> <Sendable as FutureForm>::Future<'_, Result<(), Self::Error>> {
        Sendable::from_future(async move {
            tracing::debug!(%key, "FsStorage::delete");

            let path = self.document_path(&key)?;
            if let Err(e) = tokio::fs::remove_file(&path).await
                && e.kind() != std::io::ErrorKind::NotFound
            {
                return Err(e.into());
            }

            Ok(())
        })
    }
}

use std::path::{Path, PathBuf};

use crate::storage::StorageError;

/// Uploaded files on local disk, one directory per family.
#[derive(Clone, Debug)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes `bytes` under a fresh name and returns the key relative to the
    /// root, e.g. `<family_id>/<uuid>.png`.
    pub async fn put(
        &self,
        family_id: &str,
        extension: &str,
        bytes: &[u8],
    ) -> Result<String, StorageError> {
        if family_id.is_empty() || family_id.contains(['/', '\\', '.']) {
            return Err(StorageError::InvalidInput("invalid family id".into()));
        }
        let dir = self.root.join(family_id);
        tokio::fs::create_dir_all(&dir).await?;
        let file = format!("{}.{extension}", uuid::Uuid::new_v4());
        tokio::fs::write(dir.join(&file), bytes).await?;
        Ok(format!("{family_id}/{file}"))
    }

    /// Removes one stored file by the key returned from [`BlobStore::put`].
    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let Some((family_id, file)) = key.split_once('/') else {
            return Err(StorageError::InvalidInput("invalid blob key".into()));
        };
        if family_id.is_empty()
            || family_id.contains(['/', '\\', '.'])
            || file.is_empty()
            || file.contains(['/', '\\'])
            || file.starts_with('.')
        {
            return Err(StorageError::InvalidInput("invalid blob key".into()));
        }
        match tokio::fs::remove_file(self.root.join(family_id).join(file)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes every file stored for the family. Missing directories are fine.
    pub async fn remove_family(&self, family_id: &str) -> Result<(), StorageError> {
        if family_id.is_empty() || family_id.contains(['/', '\\', '.']) {
            return Ok(());
        }
        match tokio::fs::remove_dir_all(self.root.join(family_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// File extension for an accepted image content type.
pub fn image_extension(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

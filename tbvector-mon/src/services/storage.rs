//! Audio blob storage
//!
//! Persists uploaded recordings under `<root>/uploads/` with generated
//! filenames. Paths stored on records are relative to the root folder.

use std::path::{Path, PathBuf};

use tbvector_common::Result;
use uuid::Uuid;

const UPLOADS_DIR: &str = "uploads";

/// Filesystem storage for uploaded audio blobs
#[derive(Debug, Clone)]
pub struct AudioStorage {
    root: PathBuf,
}

impl AudioStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the uploads directory if missing
    pub async fn ensure_dirs(&self) -> Result<()> {
        tokio::fs::create_dir_all(self.root.join(UPLOADS_DIR)).await?;
        Ok(())
    }

    /// Persist a blob; returns the relative path stored on the record.
    ///
    /// The original filename only contributes its extension; the stored name
    /// is a fresh UUID so uploads can never collide or traverse paths.
    pub async fn save(&self, original_name: Option<&str>, bytes: &[u8]) -> Result<String> {
        let ext = original_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .unwrap_or("wav");
        let relative = format!("{}/{}.{}", UPLOADS_DIR, Uuid::new_v4(), ext);
        tokio::fs::write(self.root.join(&relative), bytes).await?;
        Ok(relative)
    }

    /// Remove a stored blob; a missing file is not an error
    pub async fn delete(&self, relative: &str) -> Result<()> {
        match tokio::fs::remove_file(self.absolute(relative)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Absolute path of a stored blob
    pub fn absolute(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_and_delete_roundtrip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = AudioStorage::new(tmp.path());
        storage.ensure_dirs().await.unwrap();

        let relative = storage.save(Some("cough.ogg"), b"audio-bytes").await.unwrap();
        assert!(relative.starts_with("uploads/"));
        assert!(relative.ends_with(".ogg"));
        assert!(storage.absolute(&relative).exists());

        storage.delete(&relative).await.unwrap();
        assert!(!storage.absolute(&relative).exists());

        // Deleting again is not an error
        storage.delete(&relative).await.unwrap();
    }

    #[tokio::test]
    async fn save_defaults_extension_when_name_missing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let storage = AudioStorage::new(tmp.path());
        storage.ensure_dirs().await.unwrap();

        let relative = storage.save(None, b"audio-bytes").await.unwrap();
        assert!(relative.ends_with(".wav"));
    }
}

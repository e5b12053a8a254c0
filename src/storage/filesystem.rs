//! Tokio-based filesystem storage (portable, works on all platforms)

use super::backend::{OpenMode, StorageBackend, StorageObject};
use super::error::StorageError;
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Storage that keeps every object as a file directly under `root`
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an object name to its path, rejecting names that would escape `root`
    fn path_for(&self, name: &str) -> Result<PathBuf, StorageError> {
        let invalid = name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0']);
        if invalid {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl StorageBackend for FileSystemStorage {
    async fn open(&self, name: &str, mode: OpenMode) -> Result<Box<dyn StorageObject>, StorageError> {
        let path = self.path_for(name)?;
        let file = match mode {
            OpenMode::Read => tokio::fs::File::open(&path).await,
            // No `create`: writers stream into a placeholder saved beforehand
            OpenMode::Write => {
                tokio::fs::OpenOptions::new()
                    .write(true)
                    .truncate(true)
                    .open(&path)
                    .await
            }
        };

        let file = file.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(name.to_string()),
            _ => StorageError::Io(e),
        })?;

        Ok(Box::new(FileObject {
            name: name.to_string(),
            mode,
            file: Some(file),
        }))
    }

    async fn save(&self, name: &str, content: Bytes) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        tokio::fs::create_dir_all(&self.root).await?;

        // Write to temp file
        let temp_path = self.root.join(format!(".{}.tmp", name));
        tokio::fs::write(&temp_path, &content).await?;

        // Atomically rename
        tokio::fs::rename(&temp_path, &path).await?;

        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StorageError> {
        let path = self.path_for(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        let path = self.path_for(name)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn size(&self, name: &str) -> Result<u64, StorageError> {
        let path = self.path_for(name)?;
        let metadata = tokio::fs::metadata(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(name.to_string()),
            _ => StorageError::Io(e),
        })?;
        Ok(metadata.len())
    }
}

/// An open file under a [`FileSystemStorage`] root
struct FileObject {
    name: String,
    mode: OpenMode,
    file: Option<tokio::fs::File>,
}

impl FileObject {
    fn file_mut(&mut self) -> Result<&mut tokio::fs::File, StorageError> {
        let name = &self.name;
        self.file
            .as_mut()
            .ok_or_else(|| StorageError::Closed(name.clone()))
    }
}

#[async_trait]
impl StorageObject for FileObject {
    async fn read_to_end(&mut self) -> Result<Bytes, StorageError> {
        if self.mode != OpenMode::Read {
            return Err(StorageError::InvalidMode(self.name.clone(), "read"));
        }
        let mut data = Vec::new();
        self.file_mut()?.read_to_end(&mut data).await?;
        Ok(Bytes::from(data))
    }

    async fn write(&mut self, data: &[u8]) -> Result<(), StorageError> {
        if self.mode != OpenMode::Write {
            return Err(StorageError::InvalidMode(self.name.clone(), "write"));
        }
        self.file_mut()?.write_all(data).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        if let Some(mut file) = self.file.take() {
            if self.mode == OpenMode::Write {
                file.flush().await?;
                file.sync_all().await?;
            }
        }
        Ok(())
    }
}

//! Write handle returned by [`Partition::create_file`](super::Partition::create_file)

use super::file::CacheFile;
use super::LockPolicy;
use crate::error::CacheError;
use crate::lock::Lock;

/// A new cache file being written under its file lock.
///
/// The file only counts as created after [`commit`](Self::commit) succeeds.
/// A writer that fails, is aborted or is dropped uncommitted removes the
/// file's record and stored bytes and releases the lock.
pub struct FileWriter {
    full_filename: String,
    lock: Option<Lock>,
    file: Option<CacheFile>,
}

impl FileWriter {
    pub(crate) fn new(lock: Lock, file: CacheFile) -> Self {
        Self {
            full_filename: file.full_filename(),
            lock: Some(lock),
            file: Some(file),
        }
    }

    /// The file being written, `None` once the writer has failed
    pub fn file(&self) -> Option<&CacheFile> {
        self.file.as_ref()
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<(), CacheError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CacheError::WriterClosed(self.full_filename.clone()))?;

        let result = match file.object_mut() {
            Some(object) => object.write(data).await.map_err(CacheError::from),
            None => Err(CacheError::WriterClosed(file.full_filename())),
        };

        if let Err(err) = result {
            tracing::error!(
                file = %file.full_filename(),
                error = %err,
                "Unexpected exception while trying to save new cache file"
            );
            if let Some(file) = self.file.take() {
                Self::discard(file).await;
            }
            self.lock.take();
            return Err(err);
        }
        Ok(())
    }

    /// Close the object, record its size and release the lock
    pub async fn commit(mut self) -> Result<CacheFile, CacheError> {
        let mut file = self
            .file
            .take()
            .ok_or_else(|| CacheError::WriterClosed(self.full_filename.clone()))?;
        let lock = self.lock.take();

        let result = match file.close_with(LockPolicy::AlreadyHeld).await {
            Ok(()) => file.update_size_with(LockPolicy::AlreadyHeld).await,
            Err(err) => Err(err),
        };

        if let Err(err) = result {
            tracing::error!(
                file = %file.full_filename(),
                error = %err,
                "Unexpected exception while trying to save new cache file"
            );
            Self::discard(file).await;
            drop(lock);
            return Err(err);
        }

        tracing::debug!(file = %file.full_filename(), size = file.file_size(), "Created cache file");
        drop(lock);
        Ok(file)
    }

    /// Give up on the file: remove it and release the lock
    pub async fn abort(mut self) {
        if let Some(file) = self.file.take() {
            Self::discard(file).await;
        }
        self.lock.take();
    }

    /// Remove a half-created file while its lock is held by the caller
    pub(crate) async fn discard(file: CacheFile) {
        let name = file.full_filename();
        if let Err(err) = file.delete_with(LockPolicy::AlreadyHeld).await {
            tracing::error!(file = %name, error = %err, "Failed to remove incomplete cache file");
        }
    }
}

impl Drop for FileWriter {
    fn drop(&mut self) {
        let Some(file) = self.file.take() else {
            return;
        };
        let lock = self.lock.take();

        // Cleanup is async; keep the lock until it is done
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    Self::discard(file).await;
                    drop(lock);
                });
            }
            Err(_) => {
                tracing::warn!(
                    file = %file.full_filename(),
                    "Cache file writer dropped outside a runtime, incomplete file left behind"
                );
            }
        }
    }
}

impl std::fmt::Debug for FileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWriter")
            .field("file", &self.full_filename)
            .field("open", &self.file.is_some())
            .field("locked", &self.lock.is_some())
            .finish()
    }
}

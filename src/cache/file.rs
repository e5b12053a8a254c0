//! A cached file: one stored blob plus its metadata record

use super::partition::Partition;
use super::LockPolicy;
use crate::error::CacheError;
use crate::lock::Lock;
use crate::storage::{OpenMode, StorageObject};
use crate::store::FileRecord;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::fmt;

pub struct CacheFile {
    partition: Partition,
    record: FileRecord,
    /// Handle kept between `open` and `close`
    object: Option<Box<dyn StorageObject>>,
}

impl CacheFile {
    pub(crate) fn new(partition: Partition, record: FileRecord) -> Self {
        Self {
            partition,
            record,
            object: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.record.id
    }

    pub fn filename(&self) -> &str {
        &self.record.filename
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.record.created_at
    }

    /// Size as of the last [`update_size`](Self::update_size)
    pub fn file_size(&self) -> u64 {
        self.record.file_size
    }

    pub fn record(&self) -> &FileRecord {
        &self.record
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Key of the bytes in the storage backend
    pub fn full_filename(&self) -> String {
        self.partition.full_filename(&self.record.filename)
    }

    pub fn lock_name(&self) -> String {
        self.partition.file_lock_name(&self.record.filename)
    }

    pub fn is_open(&self) -> bool {
        self.object.is_some()
    }

    async fn lock(&self, policy: LockPolicy) -> Result<Option<Lock>, CacheError> {
        match policy {
            LockPolicy::AlreadyHeld => Ok(None),
            LockPolicy::Acquire => {
                let lock = self.partition.context().locks.acquire(&self.lock_name()).await?;
                Ok(Some(lock))
            }
        }
    }

    /// Open the stored object. After writing, call [`close`](Self::close) and
    /// [`update_size`](Self::update_size).
    pub async fn open(&mut self, mode: OpenMode) -> Result<&mut dyn StorageObject, CacheError> {
        self.open_with(mode, LockPolicy::Acquire).await
    }

    pub(crate) async fn open_with(
        &mut self,
        mode: OpenMode,
        policy: LockPolicy,
    ) -> Result<&mut dyn StorageObject, CacheError> {
        let _lock = self.lock(policy).await?;
        let storage = self.partition.cache().storage()?;

        let object = match storage.open(&self.full_filename(), mode).await {
            Ok(object) => object,
            Err(err) => {
                tracing::error!(
                    file = %self.full_filename(),
                    mode = %mode,
                    error = %err,
                    "Unexpected exception opening the cache file"
                );
                return Err(err.into());
            }
        };

        let object: &mut dyn StorageObject = &mut **self.object.insert(object);
        Ok(object)
    }

    /// The handle opened by [`open`](Self::open), if any
    pub fn object_mut(&mut self) -> Option<&mut dyn StorageObject> {
        self.object
            .as_mut()
            .map(|object| &mut **object as &mut dyn StorageObject)
    }

    pub async fn close(&mut self) -> Result<(), CacheError> {
        self.close_with(LockPolicy::Acquire).await
    }

    pub(crate) async fn close_with(&mut self, policy: LockPolicy) -> Result<(), CacheError> {
        let _lock = self.lock(policy).await?;
        if let Some(mut object) = self.object.take() {
            object.close().await?;
        }
        Ok(())
    }

    pub async fn exists(&self) -> Result<bool, CacheError> {
        let _lock = self.lock(LockPolicy::Acquire).await?;
        let storage = self.partition.cache().storage()?;
        Ok(storage.exists(&self.full_filename()).await?)
    }

    /// Refresh `file_size` from the storage backend and persist it
    pub async fn update_size(&mut self) -> Result<(), CacheError> {
        self.update_size_with(LockPolicy::Acquire).await
    }

    pub(crate) async fn update_size_with(&mut self, policy: LockPolicy) -> Result<(), CacheError> {
        let _lock = self.lock(policy).await?;
        let storage = self.partition.cache().storage()?;

        let file_size = storage.size(&self.full_filename()).await?;
        self.partition
            .context()
            .store
            .update_file_size(self.record.id, file_size)
            .await?;
        self.record.file_size = file_size;
        Ok(())
    }

    /// Delete the stored bytes, then the record. The record is kept when the
    /// storage delete fails.
    pub async fn delete(self) -> Result<(), CacheError> {
        self.delete_with(LockPolicy::Acquire).await
    }

    pub(crate) async fn delete_with(mut self, policy: LockPolicy) -> Result<(), CacheError> {
        let _lock = self.lock(policy).await?;
        let storage = self.partition.cache().storage()?;

        if let Some(mut object) = self.object.take() {
            if let Err(err) = object.close().await {
                tracing::debug!(file = %self.full_filename(), error = %err, "Ignoring close error before delete");
            }
        }

        storage.delete(&self.full_filename()).await?;
        self.partition.context().store.delete_file(self.record.id).await?;
        tracing::debug!(file = %self.full_filename(), "Deleted cache file");
        Ok(())
    }

    /// Read the whole file under one lock acquisition
    pub async fn read_all(&mut self) -> Result<Bytes, CacheError> {
        let _lock = self.lock(LockPolicy::Acquire).await?;

        let data = self
            .open_with(OpenMode::Read, LockPolicy::AlreadyHeld)
            .await?
            .read_to_end()
            .await;
        let closed = self.close_with(LockPolicy::AlreadyHeld).await;

        let data = data?;
        closed?;
        Ok(data)
    }
}

impl fmt::Debug for CacheFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheFile")
            .field("record", &self.record)
            .field("partition", &self.partition.name())
            .field("open", &self.object.is_some())
            .finish()
    }
}

impl fmt::Display for CacheFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_filename())
    }
}

//! Ledger storage accessors
//!
//! The ledger lives on an external resource that only supports plain reads
//! and whole-blob writes. Implementations:
//!
//! - [`MemoryStorage`] - in-process map, used by tests and embedders
//! - [`FileStorage`] - one file per resource under a data directory
//!
//! # Layout (FileStorage)
//!
//! - `channels/<id>.txt` - line-oriented ledger blobs
//! - `members/<id>.txt` - member display labels

use crate::error::StorageError;
use crate::types::ResourceHandle;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// Read/write access to the resource holding an encoded ledger
///
/// A missing resource reads as the empty string.
#[async_trait]
pub trait LedgerStorage: Send + Sync {
    /// Read the current blob
    async fn read_blob(&self, resource: &ResourceHandle) -> Result<String, StorageError>;

    /// Replace the blob
    async fn write_blob(&self, resource: &ResourceHandle, blob: &str) -> Result<(), StorageError>;
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: RwLock<HashMap<ResourceHandle, String>>,
    latency: Option<Duration>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a resource
    pub fn with_blob(self, resource: ResourceHandle, blob: impl Into<String>) -> Self {
        self.blobs.write().insert(resource, blob.into());
        self
    }

    /// Delay every read and write, simulating a slow remote resource
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Current blob (empty when absent)
    pub fn blob(&self, resource: &ResourceHandle) -> String {
        self.blobs.read().get(resource).cloned().unwrap_or_default()
    }

    /// Make subsequent reads fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of reads served
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of writes applied
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl LedgerStorage for MemoryStorage {
    async fn read_blob(&self, resource: &ResourceHandle) -> Result<String, StorageError> {
        self.simulate_latency().await;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::new(resource.to_string(), "read unavailable"));
        }
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.blob(resource))
    }

    async fn write_blob(&self, resource: &ResourceHandle, blob: &str) -> Result<(), StorageError> {
        self.simulate_latency().await;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::new(resource.to_string(), "write rejected"));
        }
        self.blobs.write().insert(resource.clone(), blob.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// File-backed storage, one file per resource
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Open storage rooted at `data_dir`, creating it if needed
    pub async fn open(data_dir: impl AsRef<Path>) -> crate::Result<Self> {
        let root = data_dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(root.join("channels")).await?;
        tokio::fs::create_dir_all(root.join("members")).await?;

        tracing::info!("Opened award storage at {:?}", root);
        Ok(Self { root })
    }

    /// Path backing a resource
    pub fn path_for(&self, resource: &ResourceHandle) -> PathBuf {
        let (dir, id) = match resource {
            ResourceHandle::Channel(id) => ("channels", id.as_str()),
            ResourceHandle::Member(id) => ("members", id.as_str()),
        };
        self.root.join(dir).join(format!("{}.txt", escape_id(id)))
    }
}

/// File-name form of a resource id
///
/// ASCII alphanumerics and `-` pass through; every other byte, `_` included,
/// becomes `_XX` (uppercase hex). `_` only ever starts an escape, so distinct
/// ids never share a file.
fn escape_id(id: &str) -> String {
    let mut escaped = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            escaped.push(char::from(byte));
        } else {
            escaped.push_str(&format!("_{:02X}", byte));
        }
    }
    escaped
}

#[async_trait]
impl LedgerStorage for FileStorage {
    async fn read_blob(&self, resource: &ResourceHandle) -> Result<String, StorageError> {
        let path = self.path_for(resource);
        match tokio::fs::read_to_string(&path).await {
            Ok(blob) => Ok(blob),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(StorageError::new(resource.to_string(), e.to_string())),
        }
    }

    async fn write_blob(&self, resource: &ResourceHandle, blob: &str) -> Result<(), StorageError> {
        let path = self.path_for(resource);
        let tmp = path.with_extension("txt.tmp");
        let to_err = |e: std::io::Error| StorageError::new(resource.to_string(), e.to_string());

        tokio::fs::write(&tmp, blob).await.map_err(to_err)?;
        tokio::fs::rename(&tmp, &path).await.map_err(to_err)?;

        tracing::debug!(resource = %resource, bytes = blob.len(), "Wrote ledger blob");
        Ok(())
    }
}

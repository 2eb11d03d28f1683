//! Versioned key/value storage seam.
//!
//! The binding store only needs single-key operations. The one correctness-critical primitive is
//! [`Storage::put`] with a [`Precondition`], which backends must evaluate and apply atomically.

use async_trait::async_trait;

mod memory;

pub use self::memory::MemoryStorage;

pub type StorageResult<T> = Result<T, StorageError>;

/// Failures reported by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The backend could not be reached. Retryable by the caller.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected a write.
    #[error("write rejected: {0}")]
    Write(String),
}

/// A stored value together with the version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub value: Vec<u8>,

    /// Changes on every successful write to the key.
    pub version: u64,
}

/// Condition a write must satisfy to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Write unconditionally.
    None,

    /// Write only if the key does not exist.
    Absent,

    /// Write only if the key exists at exactly this version.
    Version(u64),
}

/// Opaque, versioned key/value backend.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Reads a key.
    async fn get(&self, key: &str) -> StorageResult<Option<Entry>>;

    /// Writes a key if `precondition` holds.
    ///
    /// Returns `Ok(false)` without writing when the precondition does not hold. Evaluating the
    /// precondition and applying the write must be atomic with respect to other writers.
    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        precondition: Precondition,
    ) -> StorageResult<bool>;

    /// Removes a key. Returns whether the key existed.
    async fn delete(&self, key: &str) -> StorageResult<bool>;

    /// Lists all keys starting with `prefix`, in backend order.
    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>>;
}

#[async_trait]
impl<S: Storage + ?Sized> Storage for std::sync::Arc<S> {
    async fn get(&self, key: &str) -> StorageResult<Option<Entry>> {
        (**self).get(key).await
    }

    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        precondition: Precondition,
    ) -> StorageResult<bool> {
        (**self).put(key, value, precondition).await
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        (**self).delete(key).await
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        (**self).list(prefix).await
    }
}

use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{Entry, Precondition, Storage, StorageError, StorageResult};

/// In-memory [`Storage`] backed by a [`BTreeMap`].
///
/// Clones share the same data. Intended for tests and single-process deployments.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, Entry>,
    last_version: u64,
    offline: bool,
    read_only: bool,
}

impl Inner {
    fn check_online(&self) -> StorageResult<()> {
        if self.offline {
            Err(StorageError::Unavailable("memory storage is offline".to_owned()))
        } else {
            Ok(())
        }
    }

    fn check_writable(&self) -> StorageResult<()> {
        self.check_online()?;

        if self.read_only {
            Err(StorageError::Write("memory storage is read-only".to_owned()))
        } else {
            Ok(())
        }
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable backend; every call fails with [`StorageError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.inner.lock().offline = offline;
    }

    /// Reject writes; `put` and `delete` fail with [`StorageError::Write`] while reads succeed.
    pub fn set_read_only(&self, read_only: bool) {
        self.inner.lock().read_only = read_only;
    }

    /// Number of stored keys, including retired-ID markers.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<Entry>> {
        let inner = self.inner.lock();
        inner.check_online()?;
        Ok(inner.entries.get(key).cloned())
    }

    async fn put(
        &self,
        key: &str,
        value: Vec<u8>,
        precondition: Precondition,
    ) -> StorageResult<bool> {
        let mut inner = self.inner.lock();
        inner.check_writable()?;

        let current = inner.entries.get(key).map(|entry| entry.version);
        let holds = match precondition {
            Precondition::None => true,
            Precondition::Absent => current.is_none(),
            Precondition::Version(version) => current == Some(version),
        };

        if !holds {
            log::trace!("Precondition {precondition:?} failed for {key}");
            return Ok(false);
        }

        inner.last_version += 1;
        let version = inner.last_version;
        inner
            .entries
            .insert(key.to_owned(), Entry { value, version });

        Ok(true)
    }

    async fn delete(&self, key: &str) -> StorageResult<bool> {
        let mut inner = self.inner.lock();
        inner.check_writable()?;
        Ok(inner.entries.remove(key).is_some())
    }

    async fn list(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let inner = self.inner.lock();
        inner.check_online()?;

        Ok(inner
            .entries
            .range(prefix.to_owned()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_basic_operations() {
        let storage = MemoryStorage::new();

        assert!(storage.get("a").await.unwrap().is_none());
        assert!(storage
            .put("a", b"one".to_vec(), Precondition::None)
            .await
            .unwrap());

        let entry = storage.get("a").await.unwrap().unwrap();
        assert_eq!(entry.value, b"one");

        assert!(storage.delete("a").await.unwrap());
        assert!(!storage.delete("a").await.unwrap());
        assert!(storage.is_empty());
    }

    #[tokio::test]
    async fn test_preconditions() {
        let storage = MemoryStorage::new();

        assert!(storage
            .put("k", b"v1".to_vec(), Precondition::Absent)
            .await
            .unwrap());
        assert!(!storage
            .put("k", b"v2".to_vec(), Precondition::Absent)
            .await
            .unwrap());

        let v1 = storage.get("k").await.unwrap().unwrap();
        assert!(storage
            .put("k", b"v2".to_vec(), Precondition::Version(v1.version))
            .await
            .unwrap());

        // stale version loses
        assert!(!storage
            .put("k", b"v3".to_vec(), Precondition::Version(v1.version))
            .await
            .unwrap());
        assert_eq!(storage.get("k").await.unwrap().unwrap().value, b"v2");

        // version preconditions never create keys
        assert!(!storage
            .put("missing", b"x".to_vec(), Precondition::Version(v1.version))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_list_prefix() {
        let storage = MemoryStorage::new();
        for key in ["eab/a/1", "eab/a/2", "eab/b/1", "other"] {
            storage.put(key, vec![], Precondition::None).await.unwrap();
        }

        let keys = storage.list("eab/a/").await.unwrap();
        assert_eq!(keys, vec!["eab/a/1".to_owned(), "eab/a/2".to_owned()]);
        assert!(storage.list("nothing/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline() {
        let storage = MemoryStorage::new();
        storage.set_offline(true);

        assert!(matches!(
            storage.get("a").await,
            Err(StorageError::Unavailable(_))
        ));
        assert!(storage.put("a", vec![], Precondition::None).await.is_err());

        storage.set_offline(false);
        assert!(storage.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_only() {
        let storage = MemoryStorage::new();
        storage.put("a", b"v".to_vec(), Precondition::None).await.unwrap();
        storage.set_read_only(true);

        assert!(matches!(
            storage.put("b", vec![], Precondition::Absent).await,
            Err(StorageError::Write(_))
        ));
        assert!(matches!(
            storage.delete("a").await,
            Err(StorageError::Write(_))
        ));

        // reads still work and nothing changed
        assert_eq!(storage.get("a").await.unwrap().unwrap().value, b"v");
        assert_eq!(storage.list("").await.unwrap(), vec!["a".to_owned()]);

        storage.set_read_only(false);
        assert!(storage.delete("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_clone_shares_data() {
        let storage = MemoryStorage::new();
        let clone = storage.clone();

        storage.put("k", b"v".to_vec(), Precondition::None).await.unwrap();
        assert_eq!(clone.get("k").await.unwrap().unwrap().value, b"v");
    }
}

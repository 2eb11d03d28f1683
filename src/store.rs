use std::{fmt, sync::Arc};

use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    config::EabConfig,
    error::{EabError, Result},
    jws::{FlattenedJsonJws, Jwk},
    key::{EcKeyGenerator, KeyConfig, KeyGenerator},
    record::{EabRecord, NewBinding, StoredRecord},
    storage::{Precondition, Storage},
    util::base64url,
    verify::BindingVerifier,
};

const RECORD_ROOT: &str = "eab";
const RETIRED_ROOT: &str = "eab-retired";

/// Attempts at the compare-and-set that marks a binding consumed.
///
/// A lost race always leaves the record consumed or deleted, so the second pass settles it.
const MAX_CONSUME_ATTEMPTS: usize = 4;

type IdGenerator = dyn Fn() -> String + Send + Sync;

/// Outcome of [`EabStore::delete()`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The binding existed and was removed.
    Deleted,

    /// No binding with the ID existed. Not an error; callers surface it as a warning.
    AlreadyAbsent,
}

impl DeleteOutcome {
    /// Warnings to attach to a successful delete response.
    pub fn warnings(&self, id: &str) -> Vec<String> {
        match self {
            DeleteOutcome::Deleted => Vec::new(),
            DeleteOutcome::AlreadyAbsent => {
                vec![format!("external account binding {id} did not exist")]
            }
        }
    }
}

/// External account binding store for one directory scope.
///
/// Records live under `eab/<scope>/<id>`; IDs of deleted records are kept under
/// `eab-retired/<scope>/<id>` so they are never handed out again.
pub struct EabStore<S> {
    storage: S,
    config: EabConfig,
    key_generator: Arc<dyn KeyGenerator>,
    id_generator: Arc<IdGenerator>,
}

impl<S: Storage> EabStore<S> {
    /// Create a store over a storage backend.
    pub fn new(storage: S, config: EabConfig) -> Self {
        EabStore {
            storage,
            config,
            key_generator: Arc::new(EcKeyGenerator),
            id_generator: Arc::new(|| Uuid::new_v4().to_string()),
        }
    }

    /// Replace the key material source.
    pub fn with_key_generator(mut self, key_generator: impl KeyGenerator + 'static) -> Self {
        self.key_generator = Arc::new(key_generator);
        self
    }

    /// Replace the ID source. IDs are still collision-checked.
    pub fn with_id_generator(
        mut self,
        id_generator: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.id_generator = Arc::new(id_generator);
        self
    }

    pub fn config(&self) -> &EabConfig {
        &self.config
    }

    pub fn acme_directory(&self) -> &str {
        &self.config.acme_directory
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Verifier redeeming bindings of this store against the configured newAccount URL.
    pub fn verifier(&self) -> BindingVerifier<'_, S> {
        BindingVerifier::new(self, &self.config.new_account_url)
    }

    /// Create a binding using the configured key type and size.
    ///
    /// The returned [`NewBinding`] is the only place the private key is ever exposed.
    pub async fn create(&self) -> Result<NewBinding> {
        self.create_with(self.config.key_config()).await
    }

    /// Create a binding with an explicit key configuration.
    pub async fn create_with(&self, key_config: KeyConfig) -> Result<NewBinding> {
        key_config.ensure_supported()?;
        let pair = self.key_generator.generate(key_config)?;

        let max_attempts = self.config.id_attempts();

        for attempt in 1..=max_attempts {
            let id = (self.id_generator)();

            if self.is_retired(&id).await? {
                log::debug!("Binding id {id} was used before, attempt {attempt}");
                continue;
            }

            let stored = StoredRecord::new(
                id.clone(),
                &self.config.acme_directory,
                key_config,
                &pair,
                OffsetDateTime::now_utc(),
            );

            let written = self
                .storage
                .put(&self.record_key(&id), stored.encode()?, Precondition::Absent)
                .await?;

            if !written {
                log::debug!("Binding id {id} collides, attempt {attempt}");
                continue;
            }

            log::debug!(
                "Created binding {id} ({key_config}) in {}",
                self.config.acme_directory
            );

            let record = stored.to_record()?;
            return Ok(NewBinding::new(record, pair.private_key));
        }

        Err(EabError::IdAllocationExhausted {
            attempts: max_attempts,
        })
    }

    /// All bindings of this scope, without private material. Order is unspecified.
    pub async fn list(&self) -> Result<Vec<EabRecord>> {
        let prefix = self.scope_prefix(RECORD_ROOT);
        let keys = self.storage.list(&prefix).await?;

        let mut records = Vec::with_capacity(keys.len());

        for key in keys {
            let id = &key[prefix.len()..];

            // deleted between list and get
            let Some(entry) = self.storage.get(&key).await? else {
                log::trace!("Binding {id} vanished during list");
                continue;
            };

            records.push(StoredRecord::decode(id, &entry.value)?.to_record()?);
        }

        Ok(records)
    }

    /// A single binding, without private material.
    pub async fn get(&self, id: &str) -> Result<EabRecord> {
        match self.load(id).await? {
            Some((stored, _version)) => stored.to_record(),
            None => Err(EabError::NotFound(id.to_owned())),
        }
    }

    /// Remove a binding. Removing an absent binding succeeds with [`DeleteOutcome::AlreadyAbsent`].
    ///
    /// The ID is retired before the record is removed, so a failed delete leaves the record in
    /// place and a retry completes it.
    pub async fn delete(&self, id: &str) -> Result<DeleteOutcome> {
        let record_key = self.record_key(id);

        if self.storage.get(&record_key).await?.is_none() {
            log::debug!("Binding {id} already absent on delete");
            return Ok(DeleteOutcome::AlreadyAbsent);
        }

        self.storage
            .put(&self.retired_key(id), Vec::new(), Precondition::None)
            .await?;

        if !self.storage.delete(&record_key).await? {
            log::debug!("Binding {id} removed concurrently");
            return Ok(DeleteOutcome::AlreadyAbsent);
        }

        log::debug!("Deleted binding {id}");
        Ok(DeleteOutcome::Deleted)
    }

    /// Redeem a binding with a client proof. See [`BindingVerifier::verify()`].
    pub async fn consume(
        &self,
        id: &str,
        binding: &FlattenedJsonJws,
        account_jwk: &Jwk,
    ) -> Result<EabRecord> {
        self.verifier().verify(id, binding, account_jwk).await
    }

    /// Atomically mark a binding consumed if `check` accepts it.
    ///
    /// Load, consumed check, `check`, and the write form one compare-and-set on the record's
    /// version. Of any number of concurrent callers at most one returns `Ok`; the others observe the
    /// committed state and fail with [`EabError::AlreadyConsumed`].
    pub(crate) async fn consume_with<F>(&self, id: &str, check: F) -> Result<EabRecord>
    where
        F: Fn(&EabRecord) -> Result<()>,
    {
        let key = self.record_key(id);

        for attempt in 1..=MAX_CONSUME_ATTEMPTS {
            let Some((mut stored, version)) = self.load(id).await? else {
                return Err(EabError::NotFound(id.to_owned()));
            };

            if stored.consumed {
                return Err(EabError::AlreadyConsumed(id.to_owned()));
            }

            let record = stored.to_record()?;
            check(&record)?;

            stored.consume(
                OffsetDateTime::now_utc(),
                self.config.wipe_private_key_on_consume,
            );

            let written = self
                .storage
                .put(&key, stored.encode()?, Precondition::Version(version))
                .await?;

            if written {
                log::debug!("Consumed binding {id}");
                return stored.to_record();
            }

            log::trace!("Lost consume race for {id}, attempt {attempt}");
        }

        Err(EabError::StorageWrite(format!(
            "binding {id} kept changing during consumption"
        )))
    }

    async fn load(&self, id: &str) -> Result<Option<(StoredRecord, u64)>> {
        let Some(entry) = self.storage.get(&self.record_key(id)).await? else {
            return Ok(None);
        };

        let stored = StoredRecord::decode(id, &entry.value)?;
        Ok(Some((stored, entry.version)))
    }

    async fn is_retired(&self, id: &str) -> Result<bool> {
        Ok(self.storage.get(&self.retired_key(id)).await?.is_some())
    }

    fn scope_prefix(&self, root: &str) -> String {
        // encoded so that one scope can never be a prefix of another
        format!("{root}/{}/", base64url(&self.config.acme_directory))
    }

    fn record_key(&self, id: &str) -> String {
        format!("{}{id}", self.scope_prefix(RECORD_ROOT))
    }

    fn retired_key(&self, id: &str) -> String {
        format!("{}{id}", self.scope_prefix(RETIRED_ROOT))
    }
}

impl<S> fmt::Debug for EabStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EabStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

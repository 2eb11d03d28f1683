use crate::{key::KeyConfig, storage::StorageError};

pub(crate) type Result<T> = std::result::Result<T, EabError>;

/// Errors produced by the binding store and verifier.
///
/// Operator-facing calls surface these as-is. The ACME-facing redemption path collapses
/// [`NotFound`](EabError::NotFound), [`AlreadyConsumed`](EabError::AlreadyConsumed) and
/// [`InvalidProof`](EabError::InvalidProof) into one [`Problem`](crate::api::Problem).
#[derive(Debug, thiserror::Error)]
pub enum EabError {
    /// Requested key family/size is not implemented.
    #[error("unsupported key configuration: {0}")]
    UnsupportedKeyConfig(KeyConfig),

    /// Generated key material could not be encoded.
    #[error("failed to encode key material: {0}")]
    KeyEncoding(String),

    /// No free identifier was found within the configured number of attempts.
    #[error("could not allocate a unique binding id after {attempts} attempts")]
    IdAllocationExhausted { attempts: usize },

    /// Backend rejected or failed a write.
    #[error("storage write failed: {0}")]
    StorageWrite(String),

    /// Backend could not be reached.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// No binding with this identifier exists in the directory scope.
    #[error("binding {0} not found")]
    NotFound(String),

    /// Binding was already redeemed by an earlier account creation.
    #[error("binding {0} has already been consumed")]
    AlreadyConsumed(String),

    /// Client proof does not match the stored binding.
    #[error("invalid binding proof for {id}: {reason}")]
    InvalidProof { id: String, reason: &'static str },

    /// Stored bytes could not be decoded into a binding record.
    #[error("stored binding {id} is malformed")]
    MalformedRecord {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}

impl EabError {
    pub(crate) fn invalid_proof(id: &str, reason: &'static str) -> Self {
        EabError::InvalidProof {
            id: id.to_owned(),
            reason,
        }
    }

    /// Returns true for failures that the ACME client must not be able to tell apart.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EabError::NotFound(_) | EabError::AlreadyConsumed(_) | EabError::InvalidProof { .. }
        )
    }

    /// Returns true if retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EabError::StorageWrite(_) | EabError::StorageUnavailable(_)
        )
    }
}

impl From<StorageError> for EabError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(msg) => EabError::StorageUnavailable(msg),
            StorageError::Write(msg) => EabError::StorageWrite(msg),
        }
    }
}

use ecdsa::signature::Verifier as _;

use crate::{
    error::{EabError, Result},
    jws::{FlattenedJsonJws, Jwk, ES256},
    key::{verifying_key_from_sec1, KeyConfig},
    record::EabRecord,
    storage::Storage,
    store::EabStore,
};

/// Redeems external account bindings presented with ACME newAccount requests.
///
/// A binding proof is a flattened JWS whose protected header names the binding (`kid`) and the
/// newAccount URL, whose payload is the account's public JWK, and whose ES256 signature was made
/// with the binding's private key.
///
/// Errors are precise so they can be logged. Callers answering unauthenticated ACME clients must
/// not forward them; see [`EabService::redeem()`](crate::EabService::redeem()).
#[derive(Debug)]
pub struct BindingVerifier<'a, S> {
    store: &'a EabStore<S>,
    new_account_url: &'a str,
}

impl<'a, S: Storage> BindingVerifier<'a, S> {
    pub fn new(store: &'a EabStore<S>, new_account_url: &'a str) -> Self {
        BindingVerifier {
            store,
            new_account_url,
        }
    }

    /// Verify `binding` for binding `id` and the outer account key, then consume the binding.
    ///
    /// Fails with [`EabError::NotFound`], [`EabError::AlreadyConsumed`], or
    /// [`EabError::InvalidProof`]. On success, returns the consumed record.
    pub async fn verify(
        &self,
        id: &str,
        binding: &FlattenedJsonJws,
        account_jwk: &Jwk,
    ) -> Result<EabRecord> {
        let account_thumbprint = account_jwk
            .thumbprint()
            .map_err(|_| EabError::invalid_proof(id, "account key is not serializable"))?;

        self.store
            .consume_with(id, |record| {
                self.check_proof(record, binding, &account_thumbprint)
            })
            .await
    }

    fn check_proof(
        &self,
        record: &EabRecord,
        binding: &FlattenedJsonJws,
        account_thumbprint: &str,
    ) -> Result<()> {
        let id = record.id.as_str();

        if record.key_config() != KeyConfig::EC_P256 {
            return Err(EabError::invalid_proof(id, "binding key type cannot verify"));
        }

        let header = binding
            .protected_header()
            .ok_or_else(|| EabError::invalid_proof(id, "malformed protected header"))?;

        if header.alg != ES256 {
            return Err(EabError::invalid_proof(id, "unexpected algorithm"));
        }

        if header.kid != id {
            return Err(EabError::invalid_proof(id, "key id mismatch"));
        }

        if header.url != self.new_account_url {
            return Err(EabError::invalid_proof(id, "url mismatch"));
        }

        let payload = binding
            .payload_jwk()
            .ok_or_else(|| EabError::invalid_proof(id, "payload is not a JWK"))?;

        let bound_thumbprint = payload
            .thumbprint()
            .map_err(|_| EabError::invalid_proof(id, "payload is not a JWK"))?;

        if bound_thumbprint != account_thumbprint {
            return Err(EabError::invalid_proof(id, "payload is not the account key"));
        }

        let verifying_key = verifying_key_from_sec1(&record.public_key)
            .ok_or_else(|| EabError::invalid_proof(id, "stored public key is unusable"))?;

        let signature = binding
            .signature_bytes()
            .and_then(|bytes| p256::ecdsa::Signature::from_slice(&bytes).ok())
            .ok_or_else(|| EabError::invalid_proof(id, "malformed signature"))?;

        verifying_key
            .verify(binding.signing_input().as_bytes(), &signature)
            .map_err(|_| EabError::invalid_proof(id, "signature mismatch"))
    }
}

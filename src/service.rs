use std::sync::Arc;

use eyre::WrapErr as _;

use crate::{
    api::{
        CreateBindingResponse, DeleteBindingResponse, KeyInfo, ListBindingsResponse, NewAccount,
        Problem,
    },
    jws::Jwk,
    record::EabRecord,
    storage::Storage,
    store::EabStore,
};

/// Entry point for the binding endpoints of one ACME directory.
///
/// Operator calls (`create`, `list`, `read`, `delete`) are authenticated by the caller and report
/// precise errors. [`redeem()`](Self::redeem()) answers unauthenticated ACME clients and only ever
/// returns generic problem documents.
pub struct EabService<S> {
    store: Arc<EabStore<S>>,
}

impl<S> Clone for EabService<S> {
    fn clone(&self) -> Self {
        EabService {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: Storage> EabService<S> {
    pub fn new(store: EabStore<S>) -> Self {
        EabService {
            store: Arc::new(store),
        }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &EabStore<S> {
        &self.store
    }

    /// Create a binding. The response holds the private key; it cannot be retrieved again.
    pub async fn create_binding(&self) -> eyre::Result<CreateBindingResponse> {
        let binding = self
            .store
            .create()
            .await
            .context("failed generating external account binding")?;

        CreateBindingResponse::from_binding(&binding)
    }

    pub async fn list_bindings(&self) -> eyre::Result<ListBindingsResponse> {
        let records = self
            .store
            .list()
            .await
            .context("failed listing external account bindings")?;

        ListBindingsResponse::from_records(&records)
    }

    pub async fn read_binding(&self, id: &str) -> eyre::Result<KeyInfo> {
        let record = self.store.get(id).await?;
        KeyInfo::from_record(&record)
    }

    /// Delete a binding. Deleting an unknown ID succeeds with one warning.
    pub async fn delete_binding(&self, id: &str) -> eyre::Result<DeleteBindingResponse> {
        let outcome = self
            .store
            .delete(id)
            .await
            .with_context(|| format!("failed deleting external account binding {id}"))?;

        Ok(DeleteBindingResponse {
            warnings: outcome.warnings(id),
        })
    }

    /// Redeem the binding carried by a newAccount payload.
    ///
    /// `account_jwk` is the `jwk` header of the already verified outer request. Unknown,
    /// consumed, and mismatched bindings all produce [`Problem::binding_rejected()`]; the precise
    /// cause is only logged.
    pub async fn redeem(
        &self,
        new_account: &NewAccount,
        account_jwk: &Jwk,
    ) -> Result<EabRecord, Problem> {
        let Some(binding) = &new_account.external_account_binding else {
            log::debug!("newAccount request without external account binding");
            return Err(Problem::external_account_required());
        };

        let Some(header) = binding.protected_header() else {
            log::warn!("Rejected external account binding: malformed protected header");
            return Err(Problem::binding_rejected());
        };

        match self.store.consume(&header.kid, binding, account_jwk).await {
            Ok(record) => Ok(record),

            Err(err) if err.is_rejection() => {
                log::warn!("Rejected external account binding: {err}");
                Err(Problem::binding_rejected())
            }

            Err(err) => {
                log::warn!("Could not redeem external account binding: {err}");
                Err(Problem::server_internal())
            }
        }
    }
}

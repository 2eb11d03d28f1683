//! Shared fixtures for unit tests.

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use parking_lot::Mutex;

use crate::{
    jws::{FlattenedJsonJws, Jwk},
    storage::MemoryStorage,
    EabConfig, EabService, EabStore, NewBinding,
};

pub const NEW_ACCOUNT_URL: &str = "https://ca.test/acme/new-acct";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn test_config() -> EabConfig {
    EabConfig::for_directory("default", NEW_ACCOUNT_URL)
}

pub fn test_store() -> EabStore<MemoryStorage> {
    EabStore::new(MemoryStorage::new(), test_config())
}

pub fn test_service() -> EabService<MemoryStorage> {
    EabService::new(test_store())
}

/// Hands out `ids` in order, then fresh UUIDs.
pub fn sequential_ids(ids: &[&str]) -> impl Fn() -> String + Send + Sync + 'static {
    let queue = Arc::new(Mutex::new(
        ids.iter().map(|id| (*id).to_owned()).collect::<VecDeque<_>>(),
    ));

    move || {
        queue
            .lock()
            .pop_front()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }
}

/// Public JWK of a fresh ACME account key.
pub fn account_jwk() -> Jwk {
    let key = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
    Jwk::from_verifying_key(key.verifying_key())
}

/// Proof a client holding `binding` would send.
pub fn sign_for(binding: &NewBinding, url: &str, account: &Jwk) -> FlattenedJsonJws {
    FlattenedJsonJws::sign_binding(binding.id(), &binding.private_key_base64url(), url, account)
        .unwrap()
}

/// Operator lifecycle: create, list, delete, repeated delete.
#[tokio::test]
async fn test_eab_operator_lifecycle() {
    init_logger();
    let service = test_service();

    let a = service.create_binding().await.unwrap();
    let b = service.create_binding().await.unwrap();
    let ids = [a.id.clone(), b.id.clone()];

    let list = service.list_bindings().await.unwrap();
    assert_eq!(
        list.keys.iter().cloned().collect::<HashSet<_>>(),
        ids.iter().cloned().collect::<HashSet<_>>()
    );
    for (id, created) in ids.iter().zip([&a, &b]) {
        let info = &list.key_info[id];
        assert_eq!(info.key_type, "ec");
        assert_eq!(info.key_bits, "256");
        assert_eq!(info.created_on, created.created_on);
    }

    let res = service.delete_binding(&a.id).await.unwrap();
    assert!(res.warnings.is_empty(), "no warnings should be set on delete");

    let list = service.list_bindings().await.unwrap();
    assert_eq!(list.keys, vec![b.id.clone()]);

    let res = service.delete_binding(&a.id).await.unwrap();
    assert_eq!(
        res.warnings.len(),
        1,
        "expected a warning to be set on repeated delete call"
    );
    assert_eq!(service.list_bindings().await.unwrap().keys, vec![b.id.clone()]);

    let res = service.delete_binding(&b.id).await.unwrap();
    assert!(res.warnings.is_empty());
    assert!(service.list_bindings().await.unwrap().keys.is_empty());
}

/// Full flow: operator creates, client redeems once, operator deletes after consumption.
#[tokio::test]
async fn test_eab_redeem_lifecycle() {
    init_logger();
    let service = test_service();
    let created = service.create_binding().await.unwrap();

    let account = account_jwk();
    let eab = FlattenedJsonJws::sign_binding(
        &created.id,
        &created.private_key,
        NEW_ACCOUNT_URL,
        &account,
    )
    .unwrap();
    let new_account = crate::api::NewAccount {
        external_account_binding: Some(eab),
        ..Default::default()
    };

    service.redeem(&new_account, &account).await.unwrap();
    assert!(service.redeem(&new_account, &account).await.is_err());

    let info = service.read_binding(&created.id).await.unwrap();
    assert!(info.consumed);

    let res = service.delete_binding(&created.id).await.unwrap();
    assert!(res.warnings.is_empty());
    assert!(service.list_bindings().await.unwrap().keys.is_empty());
}

//! External Account Binding (EAB) key store for ACME certificate issuers.
//!
//! An operator pre-registers a binding; an ACME client must present it when creating a new
//! account, tying that account to the operator's out-of-band decision. See
//! [RFC 8555 §7.3.4](https://datatracker.ietf.org/doc/html/rfc8555#section-7.3.4).
//!
//! # Usage
//!
//! ```no_run
//! # async fn run() -> eyre::Result<()> {
//! use eab::{storage::MemoryStorage, EabConfig, EabService, EabStore};
//!
//! let config = EabConfig::for_directory("default", "https://ca.example.com/acme/new-account");
//! let service = EabService::new(EabStore::new(MemoryStorage::new(), config));
//!
//! // operator side; the private key is shown exactly once
//! let binding = service.create_binding().await?;
//! println!("id: {}, key: {}", binding.id, binding.private_key);
//! # Ok(())
//! # }
//! ```
//!
//! # Life Cycle
//!
//! 1. [`EabStore::create()`] generates a P-256 key pair and returns the private key once.
//! 2. [`EabStore::list()`] and [`EabStore::get()`] never return private material.
//! 3. A client signs its account key with the binding key, see
//!    [`FlattenedJsonJws::sign_binding()`](jws::FlattenedJsonJws::sign_binding()).
//! 4. [`BindingVerifier::verify()`] checks that proof and consumes the binding exactly once, even
//!    under concurrent redemption.
//! 5. [`EabStore::delete()`] is idempotent; deleting an absent binding yields a warning.
//!
//! # Storage
//!
//! Any backend implementing [`storage::Storage`] works, provided conditional writes are atomic per
//! key. [`storage::MemoryStorage`] is included.

#![deny(rust_2018_idioms, nonstandard_style, future_incompatible)]

mod config;
mod error;
mod key;
mod record;
mod service;
mod store;
mod util;
mod verify;

pub mod api;
pub mod jws;
pub mod storage;

#[cfg(test)]
mod test;

pub use crate::{
    config::EabConfig,
    error::EabError,
    key::{EcKeyGenerator, KeyConfig, KeyGenerator, KeyPair, KeyType},
    record::{EabRecord, NewBinding},
    service::EabService,
    store::{DeleteOutcome, EabStore},
    verify::BindingVerifier,
};

use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use zeroize::Zeroizing;

use crate::{
    error::{EabError, Result},
    key::{KeyConfig, KeyPair, KeyType},
    util::{base64url, base64url_decode},
};

/// A binding as seen by list and read operations.
///
/// Carries no private key material. The private key is only ever handed out once, inside the
/// [`NewBinding`] returned by [`EabStore::create()`](crate::EabStore::create()).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EabRecord {
    pub id: String,
    pub key_type: KeyType,
    pub key_bits: u32,

    /// SEC1 encoded public point of the binding key.
    pub public_key: Vec<u8>,

    pub created_on: OffsetDateTime,
    pub consumed: bool,
    pub consumed_on: Option<OffsetDateTime>,

    /// Directory scope the binding belongs to.
    pub acme_directory: String,
}

impl EabRecord {
    pub fn key_config(&self) -> KeyConfig {
        KeyConfig::new(self.key_type, self.key_bits)
    }
}

/// Result of creating a binding; the only type holding the binding's private key.
#[derive(Clone)]
pub struct NewBinding {
    pub record: EabRecord,

    /// SEC1 DER encoded private key.
    private_key: Zeroizing<Vec<u8>>,
}

impl NewBinding {
    pub(crate) fn new(record: EabRecord, private_key: Zeroizing<Vec<u8>>) -> Self {
        NewBinding {
            record,
            private_key,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// The private key in SEC1 DER encoding.
    pub fn private_key_der(&self) -> &[u8] {
        &self.private_key
    }

    /// The private key as unpadded base64url of its SEC1 DER encoding.
    pub fn private_key_base64url(&self) -> Zeroizing<String> {
        Zeroizing::new(base64url(self.private_key.as_slice()))
    }
}

impl fmt::Debug for NewBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewBinding")
            .field("record", &self.record)
            .finish_non_exhaustive()
    }
}

/// Persisted shape of a binding.
#[derive(Clone, Serialize, Deserialize)]
pub(crate) struct StoredRecord {
    pub id: String,
    pub key_type: KeyType,
    pub key_bits: u32,
    pub public_key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<Zeroizing<String>>,

    #[serde(with = "time::serde::rfc3339")]
    pub created_on: OffsetDateTime,

    pub consumed: bool,

    #[serde(default, with = "time::serde::rfc3339::option")]
    pub consumed_on: Option<OffsetDateTime>,

    pub acme_directory: String,
}

impl fmt::Debug for StoredRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoredRecord")
            .field("id", &self.id)
            .field("acme_directory", &self.acme_directory)
            .field("consumed", &self.consumed)
            .finish_non_exhaustive()
    }
}

impl StoredRecord {
    pub(crate) fn new(
        id: String,
        acme_directory: &str,
        config: KeyConfig,
        pair: &KeyPair,
        created_on: OffsetDateTime,
    ) -> Self {
        StoredRecord {
            id,
            key_type: config.key_type,
            key_bits: config.key_bits,
            public_key: base64url(&pair.public_key),
            private_key: Some(Zeroizing::new(base64url(pair.private_key.as_slice()))),
            created_on,
            consumed: false,
            consumed_on: None,
            acme_directory: acme_directory.to_owned(),
        }
    }

    pub(crate) fn decode(id: &str, bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(|source| EabError::MalformedRecord {
            id: id.to_owned(),
            source,
        })
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|source| EabError::MalformedRecord {
            id: self.id.clone(),
            source,
        })
    }

    /// Mark as redeemed, optionally dropping the private key.
    pub(crate) fn consume(&mut self, at: OffsetDateTime, wipe_private_key: bool) {
        self.consumed = true;
        self.consumed_on = Some(at);

        if wipe_private_key {
            self.private_key = None;
        }
    }

    /// Public view of this record. Drops the private key.
    pub(crate) fn to_record(&self) -> Result<EabRecord> {
        let public_key = base64url_decode(&self.public_key).ok_or_else(|| {
            EabError::MalformedRecord {
                id: self.id.clone(),
                source: <serde_json::Error as serde::de::Error>::custom(
                    "public key is not base64url",
                ),
            }
        })?;

        Ok(EabRecord {
            id: self.id.clone(),
            key_type: self.key_type,
            key_bits: self.key_bits,
            public_key,
            created_on: self.created_on,
            consumed: self.consumed,
            consumed_on: self.consumed_on,
            acme_directory: self.acme_directory.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{EcKeyGenerator, KeyGenerator as _};

    fn stored() -> (StoredRecord, KeyPair) {
        let pair = EcKeyGenerator.generate(KeyConfig::EC_P256).unwrap();
        let record = StoredRecord::new(
            "9a3f2c1e-0000-4000-8000-000000000001".to_owned(),
            "default",
            KeyConfig::EC_P256,
            &pair,
            OffsetDateTime::now_utc(),
        );
        (record, pair)
    }

    #[test]
    fn test_stored_json_shape() {
        let (record, _) = stored();
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["key_type"], "ec");
        assert_eq!(json["key_bits"], 256);
        assert_eq!(json["consumed"], false);
        assert!(json["private_key"].is_string());
        assert!(json["created_on"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_encode_decode() {
        let (record, pair) = stored();
        let bytes = record.encode().unwrap();
        let decoded = StoredRecord::decode(&record.id, &bytes).unwrap();

        let public = decoded.to_record().unwrap();
        assert_eq!(public.public_key, pair.public_key);
        assert_eq!(public.created_on, record.created_on);
        assert!(!public.consumed);
    }

    #[test]
    fn test_consume_wipes_private_key() {
        let (mut record, _) = stored();
        record.consume(OffsetDateTime::now_utc(), true);

        assert!(record.consumed);
        assert!(record.consumed_on.is_some());
        assert!(record.private_key.is_none());

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("private_key").is_none());
    }

    #[test]
    fn test_consume_can_retain_private_key() {
        let (mut record, _) = stored();
        record.consume(OffsetDateTime::now_utc(), false);
        assert!(record.private_key.is_some());
    }

    #[test]
    fn test_decode_garbage() {
        let err = StoredRecord::decode("x", b"not json").unwrap_err();
        assert!(matches!(err, EabError::MalformedRecord { .. }));
    }
}

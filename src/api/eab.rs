use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;

use crate::record::{EabRecord, NewBinding};

fn rfc3339(at: time::OffsetDateTime) -> eyre::Result<String> {
    Ok(at.format(&Rfc3339)?)
}

/// Response to creating a binding. The only response carrying `private_key`.
///
/// # Example JSON
///
/// ```json
/// {
///   "id": "bc8088d9-3816-5177-ae8e-d8393265f7dd",
///   "key_type": "ec",
///   "key_bits": "256",
///   "private_key": "MHcCAQEEIP1xlvpk0Y_F7cxOa5kzeELGH...",
///   "created_on": "2023-05-10T14:32:11.413512Z",
///   "acme_directory": "default"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBindingResponse {
    pub id: String,
    pub key_type: String,
    pub key_bits: String,

    /// Unpadded base64url of the SEC1 DER private key.
    pub private_key: String,

    pub created_on: String,
    pub acme_directory: String,
}

impl CreateBindingResponse {
    pub fn from_binding(binding: &NewBinding) -> eyre::Result<Self> {
        let record = &binding.record;

        Ok(CreateBindingResponse {
            id: record.id.clone(),
            key_type: record.key_type.to_string(),
            key_bits: record.key_bits.to_string(),
            private_key: binding.private_key_base64url().to_string(),
            created_on: rfc3339(record.created_on)?,
            acme_directory: record.acme_directory.clone(),
        })
    }
}

/// Public metadata of one binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInfo {
    pub key_type: String,
    pub key_bits: String,
    pub created_on: String,
    pub acme_directory: String,
    pub consumed: bool,
}

impl KeyInfo {
    pub fn from_record(record: &EabRecord) -> eyre::Result<Self> {
        Ok(KeyInfo {
            key_type: record.key_type.to_string(),
            key_bits: record.key_bits.to_string(),
            created_on: rfc3339(record.created_on)?,
            acme_directory: record.acme_directory.clone(),
            consumed: record.consumed,
        })
    }
}

/// Response to listing bindings.
///
/// # Example JSON
///
/// ```json
/// {
///   "keys": ["bc8088d9-3816-5177-ae8e-d8393265f7dd"],
///   "key_info": {
///     "bc8088d9-3816-5177-ae8e-d8393265f7dd": {
///       "key_type": "ec",
///       "key_bits": "256",
///       "created_on": "2023-05-10T14:32:11.413512Z",
///       "acme_directory": "default",
///       "consumed": false
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListBindingsResponse {
    pub keys: Vec<String>,
    pub key_info: BTreeMap<String, KeyInfo>,
}

impl ListBindingsResponse {
    pub fn from_records(records: &[EabRecord]) -> eyre::Result<Self> {
        let mut res = ListBindingsResponse::default();

        for record in records {
            res.keys.push(record.id.clone());
            res.key_info
                .insert(record.id.clone(), KeyInfo::from_record(record)?);
        }

        Ok(res)
    }
}

/// Response to deleting a binding. Always a success; `warnings` is non-empty when the binding
/// was already gone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteBindingResponse {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

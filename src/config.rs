use serde::{Deserialize, Serialize};

use crate::key::{KeyConfig, KeyType};

const DEFAULT_DIRECTORY: &str = "default";
const DEFAULT_MAX_ID_ATTEMPTS: usize = 3;

/// Settings for one binding store.
///
/// Every field has a default, so an empty JSON object is a valid configuration.
///
/// # Example JSON
///
/// ```json
/// {
///   "acme_directory": "issuer-a",
///   "new_account_url": "https://ca.example.com/acme/issuer-a/new-account",
///   "key_type": "ec",
///   "key_bits": 256
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EabConfig {
    /// Directory scope. Binding IDs are unique per scope and never shared between scopes.
    pub acme_directory: String,

    /// The newAccount URL clients must put in the binding's protected header.
    pub new_account_url: String,

    /// Key family used by [`EabStore::create()`](crate::EabStore::create()).
    pub key_type: KeyType,

    /// Key size used by [`EabStore::create()`](crate::EabStore::create()).
    pub key_bits: u32,

    /// Bound on ID generation attempts when a candidate collides. Values below 1 count as 1.
    pub max_id_attempts: usize,

    /// Drop the private key from storage in the same write that marks a binding consumed.
    pub wipe_private_key_on_consume: bool,
}

impl EabConfig {
    /// Configuration for a named directory scope.
    pub fn for_directory(acme_directory: &str, new_account_url: &str) -> Self {
        EabConfig {
            acme_directory: acme_directory.to_owned(),
            new_account_url: new_account_url.to_owned(),
            ..Default::default()
        }
    }

    pub fn key_config(&self) -> KeyConfig {
        KeyConfig::new(self.key_type, self.key_bits)
    }

    /// Effective number of ID generation attempts.
    pub fn id_attempts(&self) -> usize {
        self.max_id_attempts.max(1)
    }
}

impl Default for EabConfig {
    fn default() -> Self {
        EabConfig {
            acme_directory: DEFAULT_DIRECTORY.to_owned(),
            new_account_url: String::new(),
            key_type: KeyConfig::EC_P256.key_type,
            key_bits: KeyConfig::EC_P256.key_bits,
            max_id_attempts: DEFAULT_MAX_ID_ATTEMPTS,
            wipe_private_key_on_consume: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = serde_json::from_str::<EabConfig>("{}").unwrap();
        assert_eq!(config, EabConfig::default());
        assert_eq!(config.acme_directory, "default");
        assert_eq!(config.key_config(), KeyConfig::EC_P256);
        assert_eq!(config.max_id_attempts, 3);
        assert!(config.wipe_private_key_on_consume);
    }

    #[test]
    fn test_partial_config() {
        let config = serde_json::from_str::<EabConfig>(
            r#"{ "acme_directory": "issuer-a", "key_type": "rsa", "key_bits": 2048 }"#,
        )
        .unwrap();

        assert_eq!(config.acme_directory, "issuer-a");
        assert_eq!(config.key_config(), KeyConfig::new(KeyType::Rsa, 2048));
        assert!(config.key_config().ensure_supported().is_err());
    }

    #[test]
    fn test_zero_id_attempts_clamped() {
        let config = serde_json::from_str::<EabConfig>(r#"{ "max_id_attempts": 0 }"#).unwrap();
        assert_eq!(config.id_attempts(), 1);
        assert_eq!(EabConfig::default().id_attempts(), 3);
    }
}

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{EabError, Result};

/// Key families an operator may ask for.
///
/// Only [`KeyType::Ec`] with 256 bits is implemented today; the other names are recognised so that
/// requests for them fail with [`EabError::UnsupportedKeyConfig`] instead of a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Ec,
    Rsa,
    Ed25519,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Ec => "ec",
            KeyType::Rsa => "rsa",
            KeyType::Ed25519 => "ed25519",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ec" => Ok(KeyType::Ec),
            "rsa" => Ok(KeyType::Rsa),
            "ed25519" => Ok(KeyType::Ed25519),
            other => Err(format!("unknown key type: {other}")),
        }
    }
}

/// Key family and size of a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyConfig {
    pub key_type: KeyType,
    pub key_bits: u32,
}

impl KeyConfig {
    /// NIST P-256, the only configuration currently implemented.
    pub const EC_P256: KeyConfig = KeyConfig {
        key_type: KeyType::Ec,
        key_bits: 256,
    };

    pub fn new(key_type: KeyType, key_bits: u32) -> Self {
        KeyConfig { key_type, key_bits }
    }

    /// Fails with [`EabError::UnsupportedKeyConfig`] unless this configuration can be generated.
    pub fn ensure_supported(&self) -> Result<()> {
        if *self == KeyConfig::EC_P256 {
            Ok(())
        } else {
            Err(EabError::UnsupportedKeyConfig(*self))
        }
    }
}

impl Default for KeyConfig {
    fn default() -> Self {
        KeyConfig::EC_P256
    }
}

impl fmt::Display for KeyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.key_type, self.key_bits)
    }
}

/// Freshly generated binding key material.
#[derive(Clone)]
pub struct KeyPair {
    /// SEC1 encoded public point (uncompressed).
    pub public_key: Vec<u8>,

    /// SEC1 DER encoded private key.
    pub private_key: Zeroizing<Vec<u8>>,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Source of binding key material.
///
/// All randomness used by the store is confined to implementations of this trait.
pub trait KeyGenerator: Send + Sync {
    fn generate(&self, config: KeyConfig) -> Result<KeyPair>;
}

/// Generates P-256 key pairs from the thread-local CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcKeyGenerator;

impl KeyGenerator for EcKeyGenerator {
    fn generate(&self, config: KeyConfig) -> Result<KeyPair> {
        config.ensure_supported()?;

        let csprng = &mut rand::thread_rng();
        let secret = p256::SecretKey::random(csprng);
        key_pair_from_secret(&secret)
    }
}

pub(crate) fn key_pair_from_secret(secret: &p256::SecretKey) -> Result<KeyPair> {
    let signing_key = p256::ecdsa::SigningKey::from(secret);

    let public_key = signing_key
        .verifying_key()
        .to_encoded_point(false)
        .as_bytes()
        .to_vec();

    let private_key = secret
        .to_sec1_der()
        .map_err(|err| EabError::KeyEncoding(err.to_string()))?;

    Ok(KeyPair {
        public_key,
        private_key,
    })
}

/// Parse a SEC1 DER private key into a signing key.
pub(crate) fn signing_key_from_der(der: &[u8]) -> Option<p256::ecdsa::SigningKey> {
    p256::SecretKey::from_sec1_der(der)
        .ok()
        .map(|secret| p256::ecdsa::SigningKey::from(&secret))
}

/// Parse a stored SEC1 public point into a verifying key.
pub(crate) fn verifying_key_from_sec1(public_key: &[u8]) -> Option<p256::ecdsa::VerifyingKey> {
    p256::ecdsa::VerifyingKey::from_sec1_bytes(public_key).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_p256() {
        let pair = EcKeyGenerator.generate(KeyConfig::EC_P256).unwrap();

        // uncompressed point: 0x04 || x || y
        assert_eq!(pair.public_key.len(), 65);
        assert_eq!(pair.public_key[0], 0x04);

        let signing_key = signing_key_from_der(&pair.private_key).unwrap();
        let public = signing_key.verifying_key().to_encoded_point(false);
        assert_eq!(public.as_bytes(), pair.public_key.as_slice());
    }

    #[test]
    fn test_generate_is_fresh() {
        let a = EcKeyGenerator.generate(KeyConfig::EC_P256).unwrap();
        let b = EcKeyGenerator.generate(KeyConfig::EC_P256).unwrap();
        assert_ne!(a.public_key, b.public_key);
    }

    #[test]
    fn test_unsupported_configs() {
        for config in [
            KeyConfig::new(KeyType::Ec, 384),
            KeyConfig::new(KeyType::Ec, 128),
            KeyConfig::new(KeyType::Rsa, 2048),
            KeyConfig::new(KeyType::Ed25519, 256),
        ] {
            let err = EcKeyGenerator.generate(config).unwrap_err();
            assert!(
                matches!(err, EabError::UnsupportedKeyConfig(c) if c == config),
                "{config} should be rejected"
            );
        }
    }

    #[test]
    fn test_key_type_names() {
        assert_eq!("EC".parse::<KeyType>().unwrap(), KeyType::Ec);
        assert_eq!(KeyType::Ec.to_string(), "ec");
        assert!("dsa".parse::<KeyType>().is_err());
        assert_eq!(KeyConfig::default().to_string(), "ec/256");
    }
}

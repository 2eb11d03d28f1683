//! External account binding JWS, see [RFC 8555 §7.3.4].
//!
//! [RFC 8555 §7.3.4]: https://datatracker.ietf.org/doc/html/rfc8555#section-7.3.4

use ecdsa::signature::Signer as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};

use crate::{
    key::signing_key_from_der,
    util::{base64url, base64url_decode},
};

pub(crate) const ES256: &str = "ES256";

/// Protected header of an external account binding.
///
/// > The JWS's protected header MUST indicate a MAC-based algorithm in the "alg" field, a key
/// identifier in the "kid" field, and the URL of the newAccount resource in the "url" field.
/// > It MUST NOT contain a "nonce" field.
///
/// Bindings issued by this store are asymmetric, so `alg` is "ES256" instead of a MAC algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EabProtectedHeader {
    pub alg: String,

    /// Binding ID handed out by the operator.
    pub kid: String,

    /// newAccount URL the binding is presented to.
    pub url: String,
}

impl EabProtectedHeader {
    pub fn new(kid: &str, url: &str) -> Self {
        EabProtectedHeader {
            alg: ES256.to_owned(),
            kid: kid.to_owned(),
            url: url.to_owned(),
        }
    }
}

/// JSON Web Key of an ACME account, see [RFC 7517].
///
/// [RFC 7517]: https://datatracker.ietf.org/doc/html/rfc7517
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Jwk {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    pub crv: String,
    pub kty: String,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub _use: Option<String>,
    pub x: String,
    pub y: String,
}

impl Jwk {
    /// Public JWK of a P-256 key.
    pub fn from_verifying_key(key: &p256::ecdsa::VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);

        // uncompressed points always carry both coordinates
        let x = point.x().map(base64url).unwrap_or_default();
        let y = point.y().map(base64url).unwrap_or_default();

        Jwk {
            alg: Some(ES256.to_owned()),
            kty: "EC".to_owned(),
            crv: "P-256".to_owned(),
            _use: Some("sig".to_owned()),
            x,
            y,
        }
    }

    /// RFC 7638 thumbprint: base64url SHA-256 of the canonical required members.
    pub fn thumbprint(&self) -> eyre::Result<String> {
        let canonical = serde_json::to_string(&JwkThumb::from(self))?;
        Ok(base64url(&Sha256::digest(canonical)))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
// LEXICAL ORDER OF FIELDS MATTER!
pub(crate) struct JwkThumb {
    crv: String,
    kty: String,
    x: String,
    y: String,
}

impl From<&Jwk> for JwkThumb {
    fn from(a: &Jwk) -> Self {
        JwkThumb {
            crv: a.crv.clone(),
            kty: a.kty.clone(),
            x: a.x.clone(),
            y: a.y.clone(),
        }
    }
}

/// <https://datatracker.ietf.org/doc/html/rfc7515#section-7.2.2>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenedJsonJws {
    pub protected: String,
    pub payload: String,
    pub signature: String,
}

impl FlattenedJsonJws {
    pub fn new(protected: String, payload: String, signature: String) -> Self {
        FlattenedJsonJws {
            protected,
            payload,
            signature,
        }
    }

    /// Sign an external account binding for a new account.
    ///
    /// `private_key` is the unpadded base64url SEC1 DER key returned once when the binding was
    /// created. This is what an ACME client does with the credentials relayed by the operator.
    pub fn sign_binding(
        binding_id: &str,
        private_key: &str,
        new_account_url: &str,
        account_jwk: &Jwk,
    ) -> eyre::Result<Self> {
        let der = base64url_decode(private_key)
            .ok_or_else(|| eyre::eyre!("binding private key is not base64url"))?;
        let key = signing_key_from_der(&der)
            .ok_or_else(|| eyre::eyre!("binding private key is not a P-256 SEC1 key"))?;

        let header = {
            let protected = EabProtectedHeader::new(binding_id, new_account_url);
            base64url(&serde_json::to_string(&protected)?)
        };

        let payload = base64url(&serde_json::to_string(account_jwk)?);

        let to_sign = format!("{header}.{payload}");
        let signature: p256::ecdsa::Signature = key.sign(to_sign.as_bytes());

        Ok(FlattenedJsonJws::new(
            header,
            payload,
            base64url(&signature.to_bytes()),
        ))
    }

    /// Decode the protected header. `None` if it is not base64url JSON of the expected shape.
    pub fn protected_header(&self) -> Option<EabProtectedHeader> {
        let bytes = base64url_decode(&self.protected)?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Decode the payload as a JWK.
    pub(crate) fn payload_jwk(&self) -> Option<Jwk> {
        let bytes = base64url_decode(&self.payload)?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Bytes covered by the signature.
    pub(crate) fn signing_input(&self) -> String {
        format!("{}.{}", self.protected, self.payload)
    }

    pub(crate) fn signature_bytes(&self) -> Option<Vec<u8>> {
        base64url_decode(&self.signature)
    }
}

use serde::{Deserialize, Serialize};

use crate::jws::FlattenedJsonJws;

/// Payload of an ACME newAccount request.
///
/// Only the fields this crate looks at are modelled; the outer JWS and its `jwk` header are
/// verified by the ACME front end before the payload reaches [`EabService::redeem()`].
///
/// See [RFC 8555 §7.3].
///
/// # Example JSON
///
/// ```json
/// {
///   "termsOfServiceAgreed": true,
///   "contact": ["mailto:cert-admin@example.org"],
///   "externalAccountBinding": {
///     "protected": "eyJhbGciOiJFUzI1NiIsImtpZCI6Ii...",
///     "payload": "eyJjcnYiOiJQLTI1NiIsImt0eSI6Ik...",
///     "signature": "5TWiqIYQfIDfALQv..."
///   }
/// }
/// ```
///
/// [RFC 8555 §7.3]: https://datatracker.ietf.org/doc/html/rfc8555#section-7.3
/// [`EabService::redeem()`]: crate::EabService::redeem()
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub terms_of_service_agreed: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_return_existing: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_account_binding: Option<FlattenedJsonJws>,
}

impl NewAccount {
    pub fn terms_of_service_agreed(&self) -> bool {
        self.terms_of_service_agreed.unwrap_or(false)
    }
}

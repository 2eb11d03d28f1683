//! JSON API payloads.
//!
//! Request and response shapes of the operator endpoints and the ACME problem documents returned
//! to clients.

use std::fmt;

use serde::{Deserialize, Serialize};

mod account;
mod eab;

pub use self::{
    account::NewAccount,
    eab::{CreateBindingResponse, DeleteBindingResponse, KeyInfo, ListBindingsResponse},
};

const ERROR_PREFIX: &str = "urn:ietf:params:acme:error:";

/// ACME problem document, see [RFC 8555 §6.7].
///
/// [RFC 8555 §6.7]: https://datatracker.ietf.org/doc/html/rfc8555#section-6.7
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub _type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subproblems: Option<Vec<Subproblem>>,
}

impl Problem {
    fn acme(kind: &str, detail: &str) -> Self {
        Problem {
            _type: format!("{ERROR_PREFIX}{kind}"),
            detail: Some(detail.to_owned()),
            subproblems: None,
        }
    }

    /// The one rejection returned for any unusable binding.
    pub fn binding_rejected() -> Self {
        Problem::acme("unauthorized", "external account binding is invalid")
    }

    /// The newAccount request carried no binding although the directory requires one.
    pub fn external_account_required() -> Self {
        Problem::acme(
            "externalAccountRequired",
            "this directory requires an external account binding",
        )
    }

    pub fn server_internal() -> Self {
        Problem::acme("serverInternal", "external account binding could not be checked")
    }

    /// Returns true if problem type is "unauthorized".
    pub fn is_unauthorized(&self) -> bool {
        self.is_kind("unauthorized")
    }

    /// Returns true if problem type is "externalAccountRequired".
    pub fn is_external_account_required(&self) -> bool {
        self.is_kind("externalAccountRequired")
    }

    /// Returns true if problem type is "serverInternal".
    pub fn is_server_internal(&self) -> bool {
        self.is_kind("serverInternal")
    }

    fn is_kind(&self, kind: &str) -> bool {
        self._type
            .strip_prefix(ERROR_PREFIX)
            .is_some_and(|rest| rest == kind)
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {detail}", self._type),
            _ => write!(f, "{}", self._type),
        }
    }
}

impl std::error::Error for Problem {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subproblem {
    #[serde(rename = "type")]
    pub _type: String,
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_kinds() {
        assert!(Problem::binding_rejected().is_unauthorized());
        assert!(Problem::external_account_required().is_external_account_required());
        assert!(Problem::server_internal().is_server_internal());
        assert!(!Problem::server_internal().is_unauthorized());
    }

    #[test]
    fn test_problem_json() {
        let json = serde_json::to_value(Problem::binding_rejected()).unwrap();
        assert_eq!(json["type"], "urn:ietf:params:acme:error:unauthorized");
        assert!(json.get("subproblems").is_none());
    }

    #[test]
    fn test_problem_display() {
        let problem = Problem {
            _type: "badNonce".to_owned(),
            ..Default::default()
        };
        assert_eq!(problem.to_string(), "badNonce");
    }
}

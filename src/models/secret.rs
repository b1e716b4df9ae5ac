//! Secret access and secret type identifiers.

use serde::{Deserialize, Serialize};

/// How a secret is used to reach its owner.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AccessType {
    /// Any access method.
    Generic,
    /// HTTP(S), e.g. cloning a git repository.
    Http,
    /// SSH sessions.
    Ssh,
    /// Console access.
    Console,
    /// REST management APIs.
    Rest,
}

/// Kind of secret value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SecretType {
    /// Login name.
    Username,
    /// Login password.
    Password,
    /// Privileged-mode secret.
    Secret,
    /// API or HTTP token.
    Token,
    /// Private key material.
    Key,
}

impl std::fmt::Display for AccessType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Generic => "generic",
            Self::Http => "http",
            Self::Ssh => "ssh",
            Self::Console => "console",
            Self::Rest => "rest",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for SecretType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Username => "username",
            Self::Password => "password",
            Self::Secret => "secret",
            Self::Token => "token",
            Self::Key => "key",
        };
        write!(f, "{s}")
    }
}

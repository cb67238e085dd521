//! Token issuers.

use serde::{Deserialize, Serialize};

/// A party whose public key validates the tokens it signed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Issuer {
    /// Human readable issuer name.
    pub name: String,

    /// Base64 public key, as published in the ad catalog.
    pub public_key: String,
}

/// The issuer set the ledger passes through to token consumers.
///
/// Persisted as the `issuers` section of the ledger document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuers {
    /// Catalog-level public key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    /// Individual issuers.
    #[serde(default)]
    pub issuers: Vec<Issuer>,
}

impl Issuers {
    /// Create an issuer set.
    #[must_use]
    pub const fn new(public_key: Option<String>, issuers: Vec<Issuer>) -> Self {
        Self {
            public_key,
            issuers,
        }
    }

    /// Whether any issuer publishes `public_key`.
    #[must_use]
    pub fn is_valid_public_key(&self, public_key: &str) -> bool {
        self.issuers.iter().any(|i| i.public_key == public_key)
    }

    /// Look up an issuer by public key.
    #[must_use]
    pub fn get(&self, public_key: &str) -> Option<&Issuer> {
        self.issuers.iter().find(|i| i.public_key == public_key)
    }

    /// Number of issuers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.issuers.len()
    }

    /// Whether there are no issuers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issuers.is_empty()
    }
}

//! Certificate references and thumbprints.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::CertificateError;

/// SHA-1 certificate thumbprint, stored as uppercase hex.
///
/// App Service identifies certificates by this form; Key Vault reports the same
/// digest as base64url in the `x5t` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Thumbprint(String);

const SHA1_LEN: usize = 20;

impl Thumbprint {
    /// Wrap a raw SHA-1 digest.
    pub fn from_digest(digest: &[u8]) -> Result<Self, CertificateError> {
        if digest.len() != SHA1_LEN {
            return Err(CertificateError::InvalidThumbprint {
                value: hex::encode(digest),
                reason: format!("expected {} bytes, got {}", SHA1_LEN, digest.len()),
            });
        }
        Ok(Self(hex::encode_upper(digest)))
    }

    /// Decode the base64url `x5t` value reported by Key Vault.
    pub fn from_x5t(x5t: &str) -> Result<Self, CertificateError> {
        let digest = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(x5t.trim_end_matches('='))
            .map_err(|e| CertificateError::InvalidThumbprint {
                value: x5t.to_string(),
                reason: e.to_string(),
            })?;
        Self::from_digest(&digest)
    }

    /// Parse a hex thumbprint, tolerating lowercase and `:` separators.
    pub fn from_hex(value: &str) -> Result<Self, CertificateError> {
        let cleaned: String = value.chars().filter(|c| *c != ':' && !c.is_whitespace()).collect();
        let digest = hex::decode(&cleaned).map_err(|e| CertificateError::InvalidThumbprint {
            value: value.to_string(),
            reason: e.to_string(),
        })?;
        Self::from_digest(&digest)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Thumbprint {
    type Error = CertificateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Thumbprint> for String {
    fn from(value: Thumbprint) -> Self {
        value.0
    }
}

/// The certificate object in the source vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateRef {
    pub id: Option<String>,
    pub name: String,
    pub thumbprint: Thumbprint,
}

/// Response of a certificate import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportResult {
    pub id: Option<String>,
    pub name: String,
    pub vault: String,
    pub version: Option<String>,
    pub thumbprint: Option<Thumbprint>,
}

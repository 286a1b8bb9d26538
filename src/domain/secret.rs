//! Vault secret entities.
//!
//! Secret values are carried in [`SecretString`] so they never reach logs,
//! debug output or serialized reports.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Naming convention for the companion password secret
pub const PASSWORD_SECRET_SUFFIX: &str = "-password";

/// Content type Key Vault assigns to PEM-backed certificate secrets
pub const PEM_CONTENT_TYPE: &str = "application/x-pem-file";

/// Content type Key Vault assigns to PKCS#12-backed certificate secrets
pub const PKCS12_CONTENT_TYPE: &str = "application/x-pkcs12";

/// Name of the password secret belonging to `certificate_name`.
pub fn password_secret_name(certificate_name: &str) -> String {
    format!("{}{}", certificate_name, PASSWORD_SECRET_SUFFIX)
}

/// A string wrapper that redacts its contents in Debug, Display, and serialization.
///
/// - Debug output shows `SecretString([REDACTED])`
/// - Display output shows `[REDACTED]`
/// - Serialization outputs `"[REDACTED]"`
/// - Deserialization accepts actual values
/// - Memory is zeroed when dropped
///
/// The value is only reachable through [`SecretString::expose_secret`].
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl Serialize for SecretString {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str("[REDACTED]")
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(SecretString(value))
    }
}

impl SecretString {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Exposes the underlying secret value. Never log the result.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for SecretString {}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A secret fetched from a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretBundle {
    /// Versioned secret identifier as returned by the vault
    pub id: Option<String>,
    pub name: String,
    pub value: SecretString,
    pub content_type: Option<String>,
}

impl SecretBundle {
    /// Whether the vault stored this certificate secret as PEM rather than PKCS#12.
    pub fn is_pem(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|content_type| content_type.eq_ignore_ascii_case(PEM_CONTENT_TYPE))
    }
}

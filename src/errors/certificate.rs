use thiserror::Error;

/// Failures while rebuilding a certificate secret into a PKCS#12 container.
#[derive(Debug, Error)]
pub enum CertificateError {
    /// The secret value is not valid base64.
    #[error("Certificate secret '{name}' is not valid base64: {source}")]
    InvalidBase64 {
        name: String,
        #[source]
        source: base64::DecodeError,
    },

    /// The decoded bytes could not be read as a PKCS#12 container.
    #[error("Certificate secret '{name}' is not a readable PKCS#12 container: {reason}")]
    InvalidPkcs12 { name: String, reason: String },

    /// The PKCS#12 container is encrypted with a scheme that cannot be decoded.
    #[error("Certificate secret '{name}' uses unsupported PKCS#12 encryption ({algorithm})")]
    UnsupportedPkcs12Encryption { name: String, algorithm: &'static str },

    /// The decoded bytes could not be read as PEM.
    #[error("Certificate secret '{name}' is not valid PEM: {reason}")]
    InvalidPem { name: String, reason: String },

    /// No certificates were found in the secret.
    #[error("Certificate secret '{name}' does not contain any certificates")]
    EmptyCertificateChain { name: String },

    /// The secret carries no private key.
    #[error("Certificate secret '{name}' does not contain a private key")]
    MissingPrivateKey { name: String },

    /// The secret carries more than one private key.
    #[error("Certificate secret '{name}' contains {count} private keys, expected one")]
    MultiplePrivateKeys { name: String, count: usize },

    /// The private key is not PKCS#8 encoded.
    #[error("Private key in '{name}' uses an unsupported encoding ({encoding}), PKCS#8 is required")]
    UnsupportedKeyEncoding { name: String, encoding: &'static str },

    /// Building the password-protected container failed.
    #[error("Failed to export '{name}' as PKCS#12")]
    ExportFailed { name: String },

    /// Metadata extraction from the leaf certificate failed.
    #[error("Failed to read certificate metadata from '{name}': {reason}")]
    Metadata { name: String, reason: String },

    /// A thumbprint could not be decoded.
    #[error("Invalid certificate thumbprint '{value}': {reason}")]
    InvalidThumbprint { value: String, reason: String },
}

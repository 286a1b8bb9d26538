//! # Error Types
//!
//! Error taxonomy for the binding workflow using `thiserror`.

use super::certificate::CertificateError;

/// Custom result type for certbind operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for certbind
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No web app with the given name exists in the subscription
    #[error("Application '{name}' was not found")]
    ApplicationNotFound { name: String },

    /// The app name matched more than one web app
    #[error("Application name '{name}' is ambiguous: {count} web apps match")]
    AmbiguousApplication { name: String, count: usize },

    /// The app has no system-assigned managed identity
    #[error("Application '{app}' has no managed identity principal id")]
    ManagedIdentityMissing { app: String },

    /// The app's resource group could not be resolved
    #[error("Resource group '{resource_group}' of application '{app}' could not be found")]
    ResourceGroupNotFound { app: String, resource_group: String },

    /// The certificate secret or certificate object is absent from the source vault
    #[error("Certificate '{name}' was not found in vault '{vault}'")]
    CertificateNotFound { vault: String, name: String },

    /// The `<certificate>-password` secret is absent from the source vault
    #[error("Password secret '{name}' was not found in vault '{vault}'")]
    PasswordNotFound { vault: String, name: String },

    /// No vault in the resource group grants the app's identity an access policy
    #[error(
        "No vault in resource group '{resource_group}' has an access policy for principal '{principal_id}'"
    )]
    NoAccessibleVaultFound { resource_group: String, principal_id: String },

    /// Certificate repackaging errors
    #[error(transparent)]
    Certificate(#[from] CertificateError),

    /// Token acquisition or authorization errors
    #[error("Authentication error: {message}")]
    Auth { message: String },

    /// Non-success responses from a provider API
    #[error("HTTP error: {message} (status: {status})")]
    Http { status: u16, message: String },

    /// Network transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors with additional context
    #[error("I/O error: {context}")]
    Io {
        #[source]
        source: std::io::Error,
        context: String,
    },

    /// Serialization/deserialization errors
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: serde_json::Error,
        context: String,
    },
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create an authentication error
    pub fn auth<S: Into<String>>(message: S) -> Self {
        Self::Auth { message: message.into() }
    }

    /// Create an HTTP error
    pub fn http<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Http { status, message: message.into() }
    }

    /// Create an I/O error with context
    pub fn io<S: Into<String>>(source: std::io::Error, context: S) -> Self {
        Self::Io { source, context: context.into() }
    }

    /// Create a serialization error with context
    pub fn serialization<S: Into<String>>(source: serde_json::Error, context: S) -> Self {
        Self::Serialization { source, context: context.into() }
    }

    /// Whether this error ended the workflow because a lookup came back empty
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::ApplicationNotFound { .. }
                | Error::ResourceGroupNotFound { .. }
                | Error::CertificateNotFound { .. }
                | Error::PasswordNotFound { .. }
                | Error::NoAccessibleVaultFound { .. }
        )
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io { source: error, context: "I/O operation failed".to_string() }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization { source: error, context: "JSON serialization failed".to_string() }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let message = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        Self::validation(format!("Validation failed: {}", message))
    }
}

//! # Error Handling
//!
//! Error types for certbind. Library code returns [`Result`]; the CLI wraps
//! these in `anyhow` for reporting.

pub mod certificate;
pub mod types;

pub use certificate::CertificateError;
pub use types::{Error, Result};

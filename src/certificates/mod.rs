//! # Certificate Handling
//!
//! Rebuilds a certificate secret fetched from one vault into a
//! password-protected PKCS#12 container another vault will accept, and stages
//! that container on disk for the import call.

pub mod bundle;
pub mod scratch;

pub use bundle::{leaf_thumbprint, repackage, CertificateBundle, CertificateInfo};
pub use scratch::{ScratchFile, ScratchSpace};

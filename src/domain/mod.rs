//! Domain layer
//!
//! Transient, single-invocation entities of the binding workflow. Nothing here
//! talks to the network; the `azure` module maps provider payloads onto these
//! types and the orchestrator only ever sees them.
//!
//! ## Module Organization
//!
//! - `resource`: web apps, resource-group listings and vault descriptors
//! - `secret`: vault secrets and the redacting [`SecretString`]
//! - `certificate`: thumbprints, certificate references and import results
//! - `binding`: the SSL binding request, its result and the run report

pub mod binding;
pub mod certificate;
pub mod resource;
pub mod secret;

pub use binding::{BindingReport, BindingResult, SslBindingRequest, SslState};
pub use certificate::{CertificateRef, ImportResult, Thumbprint};
pub use resource::{
    resource_group_from_id, ResourceSummary, VaultAccessPolicy, VaultDescriptor, WebApp,
    VAULT_RESOURCE_TYPE, WEB_APP_RESOURCE_TYPE,
};
pub use secret::{password_secret_name, SecretBundle, SecretString, PASSWORD_SECRET_SUFFIX};

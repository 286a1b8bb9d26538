//! # Azure Collaborators
//!
//! REST clients for the three provider APIs the binding workflow talks to,
//! each behind an async trait so the orchestrator can be driven by test
//! doubles:
//!
//! - [`ResourceApi`]: resource manager lookups (web apps, resource groups, vaults)
//! - [`VaultApi`]: Key Vault secrets and certificates
//! - [`WebApi`]: App Service hostname bindings
//!
//! All three share one [`AzureHttpClient`] and one cached [`TokenCredential`].

pub mod auth;
pub mod client;
pub mod key_vault;
pub mod resources;
pub mod web;

pub use auth::{
    build_credential, AccessToken, AzureCliCredential, CachedCredential, ClientSecretCredential,
    CredentialKind, CredentialOptions, ManagedIdentityCredential, StaticCredential,
    TokenCredential, MANAGEMENT_SCOPE, VAULT_SCOPE,
};
pub use client::{build_http_client, AzureHttpClient};
pub use key_vault::{KeyVaultClient, VaultApi, DEFAULT_VAULT_URL_TEMPLATE};
pub use resources::{ArmResourceClient, ResourceApi};
pub use web::{AppServiceClient, WebApi};

use std::sync::Arc;

use crate::config::AzureSettings;
use crate::errors::Result;

/// The three collaborator clients, wired to one credential.
#[derive(Debug, Clone)]
pub struct AzureClients {
    pub resources: Arc<dyn ResourceApi>,
    pub vaults: Arc<dyn VaultApi>,
    pub web: Arc<dyn WebApi>,
}

impl AzureClients {
    /// Build clients from validated settings.
    pub fn from_settings(settings: &AzureSettings, verbose: bool) -> Result<Self> {
        let http = build_http_client(settings.timeout())?;
        let credential = build_credential(&settings.credential_options(), http.clone())?;
        Ok(Self::with_credential(settings, http, credential, verbose))
    }

    /// Build clients around an existing credential.
    pub fn with_credential(
        settings: &AzureSettings,
        http: reqwest::Client,
        credential: Arc<dyn TokenCredential>,
        verbose: bool,
    ) -> Self {
        let client = AzureHttpClient::new(http, credential, verbose);
        Self {
            resources: Arc::new(ArmResourceClient::new(
                client.clone(),
                settings.management_endpoint.clone(),
                settings.subscription_id.clone(),
            )),
            vaults: Arc::new(KeyVaultClient::new(
                client.clone(),
                settings.vault_url_template.clone(),
            )),
            web: Arc::new(AppServiceClient::new(
                client,
                settings.management_endpoint.clone(),
                settings.subscription_id.clone(),
            )),
        }
    }
}

//! # Runtime Settings
//!
//! Resolved, validated settings for one binding run.

use std::path::PathBuf;
use std::time::Duration;
use url::Url;
use validator::Validate;

use crate::azure::auth::{CredentialKind, CredentialOptions, DEFAULT_AUTHORITY_HOST};
use crate::azure::key_vault::DEFAULT_VAULT_URL_TEMPLATE;
use crate::domain::SecretString;
use crate::errors::{Error, Result};

/// Public cloud resource manager endpoint
pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// Per-request timeout when none is configured
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Settings used to build the Azure clients and the orchestrator.
#[derive(Debug, Clone, Validate)]
pub struct AzureSettings {
    /// Subscription that holds the web app
    #[validate(length(min = 1, message = "Subscription id cannot be empty"))]
    pub subscription_id: String,

    pub tenant_id: Option<String>,

    /// Service principal, or user-assigned identity, client id
    pub client_id: Option<String>,

    pub client_secret: Option<SecretString>,

    pub credential: CredentialKind,

    /// Request timeout in seconds
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,

    /// Directory for the repackaged certificate container
    pub scratch_dir: PathBuf,

    #[validate(length(min = 1, message = "Management endpoint cannot be empty"))]
    pub management_endpoint: String,

    #[validate(length(min = 1, message = "Authority host cannot be empty"))]
    pub authority_host: String,

    /// Vault base URL with a `{vault}` placeholder
    #[validate(length(min = 1, message = "Vault URL template cannot be empty"))]
    pub vault_url_template: String,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            tenant_id: None,
            client_id: None,
            client_secret: None,
            credential: CredentialKind::default(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            scratch_dir: std::env::temp_dir(),
            management_endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
            vault_url_template: DEFAULT_VAULT_URL_TEMPLATE.to_string(),
        }
    }
}

impl AzureSettings {
    /// Validate field ranges, then the cross-field and URL rules.
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(Error::from)?;
        self.validate_custom()
    }

    fn validate_custom(&self) -> Result<()> {
        validate_http_url("management_endpoint", &self.management_endpoint)?;
        validate_http_url("authority_host", &self.authority_host)?;

        if !self.vault_url_template.contains("{vault}") {
            return Err(Error::validation("vault_url_template must contain a {vault} placeholder"));
        }
        validate_http_url("vault_url_template", &self.vault_url_template.replace("{vault}", "vault"))?;

        if self.credential == CredentialKind::ClientSecret
            && (self.tenant_id.is_none() || self.client_id.is_none() || self.client_secret.is_none())
        {
            return Err(Error::validation(
                "client-secret credential requires tenant_id, client_id and AZURE_CLIENT_SECRET",
            ));
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn credential_options(&self) -> CredentialOptions {
        CredentialOptions {
            kind: self.credential,
            tenant_id: self.tenant_id.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            authority_host: self.authority_host.clone(),
        }
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| Error::validation(format!("{} is not a valid URL: {}", field, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::validation(format!("{} must use http or https, not {}", field, other))),
    }
}

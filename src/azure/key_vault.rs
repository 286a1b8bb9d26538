//! Key Vault data plane client.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info, instrument};
use url::Url;

use super::auth::VAULT_SCOPE;
use super::client::AzureHttpClient;
use crate::domain::secret::PKCS12_CONTENT_TYPE;
use crate::domain::{CertificateRef, ImportResult, SecretBundle, SecretString, Thumbprint};
use crate::errors::{Error, Result};

const KEY_VAULT_API_VERSION: &str = "7.4";

/// Public cloud vault URL; `{vault}` is replaced with the vault name
pub const DEFAULT_VAULT_URL_TEMPLATE: &str = "https://{vault}.vault.azure.net";

/// Key Vault operations the binding workflow needs.
#[async_trait]
pub trait VaultApi: Send + Sync + fmt::Debug {
    /// Latest version of a secret. `None` when the secret does not exist.
    async fn get_secret(&self, vault: &str, name: &str) -> Result<Option<SecretBundle>>;

    /// Latest version of a certificate object. `None` when it does not exist.
    async fn get_certificate(&self, vault: &str, name: &str) -> Result<Option<CertificateRef>>;

    /// Import a password-protected PKCS#12 file as certificate `name`.
    async fn import_certificate(
        &self,
        vault: &str,
        name: &str,
        file: &Path,
        password: &SecretString,
    ) -> Result<ImportResult>;

    /// Delete certificate `name`. Deleting a missing certificate succeeds.
    async fn delete_certificate(&self, vault: &str, name: &str) -> Result<()>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretResponse {
    #[serde(default)]
    id: Option<String>,
    value: SecretString,
    #[serde(default)]
    content_type: Option<String>,
}

#[derive(Deserialize)]
struct CertificateResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    x5t: Option<String>,
}

#[derive(Serialize)]
struct ImportRequest<'a> {
    value: String,
    pwd: &'a str,
    policy: ImportPolicy<'a>,
}

#[derive(Serialize)]
struct ImportPolicy<'a> {
    secret_props: SecretProps<'a>,
}

#[derive(Serialize)]
struct SecretProps<'a> {
    #[serde(rename = "contentType")]
    content_type: &'a str,
}

/// [`VaultApi`] backed by the Key Vault REST API.
#[derive(Debug, Clone)]
pub struct KeyVaultClient {
    client: AzureHttpClient,
    vault_url_template: String,
}

impl KeyVaultClient {
    pub fn new(client: AzureHttpClient, vault_url_template: impl Into<String>) -> Self {
        Self { client, vault_url_template: vault_url_template.into() }
    }

    /// Vault URL with `segments` appended as percent-encoded path segments.
    fn url(&self, vault: &str, segments: &[&str]) -> Result<String> {
        let base = self.vault_url_template.replace("{vault}", vault);
        let mut url = Url::parse(&base)
            .map_err(|e| Error::config(format!("Invalid vault URL '{}': {}", base, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::config(format!("Vault URL '{}' cannot carry a path", base)))?
            .pop_if_empty()
            .extend(segments);
        url.query_pairs_mut().append_pair("api-version", KEY_VAULT_API_VERSION);
        Ok(url.into())
    }
}

/// Version segment of `https://{vault}/certificates/{name}/{version}`.
fn version_from_id(id: &str) -> Option<String> {
    let mut segments = id.trim_end_matches('/').rsplit('/');
    let version = segments.next()?;
    let _name = segments.next()?;
    (segments.next()? == "certificates").then(|| version.to_string())
}

#[async_trait]
impl VaultApi for KeyVaultClient {
    #[instrument(skip(self))]
    async fn get_secret(&self, vault: &str, name: &str) -> Result<Option<SecretBundle>> {
        let url = self.url(vault, &["secrets", name])?;
        let Some(secret) = self.client.get_json_opt::<SecretResponse>(&url, VAULT_SCOPE).await?
        else {
            return Ok(None);
        };

        debug!(id = ?secret.id, content_type = ?secret.content_type, "Fetched secret");
        Ok(Some(SecretBundle {
            id: secret.id,
            name: name.to_string(),
            value: secret.value,
            content_type: secret.content_type,
        }))
    }

    #[instrument(skip(self))]
    async fn get_certificate(&self, vault: &str, name: &str) -> Result<Option<CertificateRef>> {
        let url = self.url(vault, &["certificates", name])?;
        let Some(certificate) =
            self.client.get_json_opt::<CertificateResponse>(&url, VAULT_SCOPE).await?
        else {
            return Ok(None);
        };

        let x5t = certificate.x5t.ok_or_else(|| {
            Error::validation(format!("Certificate '{}' in vault '{}' has no x5t thumbprint", name, vault))
        })?;
        let thumbprint = Thumbprint::from_x5t(&x5t)?;

        debug!(id = ?certificate.id, %thumbprint, "Fetched certificate");
        Ok(Some(CertificateRef { id: certificate.id, name: name.to_string(), thumbprint }))
    }

    #[instrument(skip(self, password), fields(file = %file.display()))]
    async fn import_certificate(
        &self,
        vault: &str,
        name: &str,
        file: &Path,
        password: &SecretString,
    ) -> Result<ImportResult> {
        let bytes = tokio::fs::read(file)
            .await
            .map_err(|e| Error::io(e, format!("Failed to read {}", file.display())))?;

        let request = ImportRequest {
            value: base64::engine::general_purpose::STANDARD.encode(&bytes),
            pwd: password.expose_secret(),
            policy: ImportPolicy { secret_props: SecretProps { content_type: PKCS12_CONTENT_TYPE } },
        };

        let url = self.url(vault, &["certificates", name, "import"])?;
        let response: CertificateResponse = self.client.post_json(&url, VAULT_SCOPE, &request).await?;

        let thumbprint = response.x5t.as_deref().map(Thumbprint::from_x5t).transpose()?;
        let version = response.id.as_deref().and_then(version_from_id);

        info!(vault = %vault, certificate = %name, version = ?version, "Imported certificate");
        Ok(ImportResult {
            id: response.id,
            name: name.to_string(),
            vault: vault.to_string(),
            version,
            thumbprint,
        })
    }

    #[instrument(skip(self))]
    async fn delete_certificate(&self, vault: &str, name: &str) -> Result<()> {
        let url = self.url(vault, &["certificates", name])?;
        self.client.delete(&url, VAULT_SCOPE).await?;
        info!(vault = %vault, certificate = %name, "Deleted certificate");
        Ok(())
    }
}

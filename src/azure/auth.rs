//! Azure AD token acquisition.
//!
//! Three credential sources are supported, selected by [`CredentialKind`]:
//!
//! - a service principal with a client secret (OAuth2 client-credentials grant)
//! - the managed identity of the host, through the instance metadata endpoint
//! - the signed-in Azure CLI user, through `az account get-access-token`
//!
//! Every credential handed to the REST clients is wrapped in a
//! [`CachedCredential`] so one invocation requests at most one token per scope.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::process::Command;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::domain::SecretString;
use crate::errors::{Error, Result};

/// OAuth2 scope of the resource manager (and the App Service control plane)
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

/// OAuth2 scope of the Key Vault data plane
pub const VAULT_SCOPE: &str = "https://vault.azure.net/.default";

/// Public cloud login endpoint
pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Instance metadata token endpoint
pub const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

const IMDS_API_VERSION: &str = "2018-02-01";

/// Tokens are refreshed this long before they expire.
const EXPIRY_MARGIN_SECONDS: i64 = 60;

/// A bearer token and its expiry.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: SecretString,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self { token: SecretString::new(token), expires_at }
    }

    fn is_fresh(&self) -> bool {
        self.expires_at - Duration::seconds(EXPIRY_MARGIN_SECONDS) > Utc::now()
    }
}

/// Source of bearer tokens for Azure APIs.
#[async_trait]
pub trait TokenCredential: Send + Sync + fmt::Debug {
    /// Acquire a token for an OAuth2 `.default` scope.
    async fn get_token(&self, scope: &str) -> Result<AccessToken>;
}

/// Resource URI for APIs that take a resource instead of a scope.
fn resource_for_scope(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}

/// Which credential to build from the resolved settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialKind {
    ClientSecret,
    ManagedIdentity,
    #[default]
    AzureCli,
}

impl CredentialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClientSecret => "client-secret",
            Self::ManagedIdentity => "managed-identity",
            Self::AzureCli => "azure-cli",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CredentialKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "client-secret" => Ok(Self::ClientSecret),
            "managed-identity" => Ok(Self::ManagedIdentity),
            "azure-cli" => Ok(Self::AzureCli),
            other => Err(Error::config(format!(
                "Unknown credential '{}': expected client-secret, managed-identity or azure-cli",
                other
            ))),
        }
    }
}

#[derive(Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Format a token endpoint failure from its JSON error body, if it has one.
fn token_endpoint_error(status: reqwest::StatusCode, body: &str) -> Error {
    match serde_json::from_str::<OAuthErrorResponse>(body) {
        Ok(err) => Error::auth(format!(
            "token request failed ({}): {}{}",
            status,
            err.error,
            err.error_description.map(|d| format!(": {}", d)).unwrap_or_default()
        )),
        Err(_) => Error::auth(format!("token request failed ({}): {}", status, body)),
    }
}

/// Service principal authenticated with a client secret.
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority_host: String,
    tenant_id: String,
    client_id: String,
    client_secret: SecretString,
}

impl ClientSecretCredential {
    pub fn new(
        http: reqwest::Client,
        authority_host: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: SecretString,
    ) -> Self {
        Self {
            http,
            authority_host: authority_host.into().trim_end_matches('/').to_string(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret,
        }
    }

    fn token_url(&self) -> String {
        format!("{}/{}/oauth2/v2.0/token", self.authority_host, self.tenant_id)
    }
}

impl fmt::Debug for ClientSecretCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecretCredential")
            .field("authority_host", &self.authority_host)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    #[instrument(skip(self), fields(tenant_id = %self.tenant_id, client_id = %self.client_id))]
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let form = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.expose_secret()),
            ("scope", scope),
            ("grant_type", "client_credentials"),
        ];

        let response = self.http.post(self.token_url()).form(&form).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(token_endpoint_error(status, &body));
        }

        let token: OAuthTokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::serialization(e, "Failed to parse token response"))?;

        debug!(expires_in = token.expires_in, "Acquired client-secret token");
        Ok(AccessToken::new(
            token.access_token,
            Utc::now() + Duration::seconds(token.expires_in as i64),
        ))
    }
}

/// Instance metadata returns numbers as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum Seconds {
    Number(i64),
    Text(String),
}

impl Seconds {
    fn value(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize)]
struct ImdsTokenResponse {
    access_token: String,
    expires_on: Seconds,
}

/// Managed identity of the machine the tool runs on.
#[derive(Debug)]
pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    endpoint: String,
    /// Client id of a user-assigned identity; `None` selects the system identity
    client_id: Option<String>,
}

impl ManagedIdentityCredential {
    pub fn new(http: reqwest::Client, client_id: Option<String>) -> Self {
        Self::with_endpoint(http, DEFAULT_IMDS_ENDPOINT, client_id)
    }

    pub fn with_endpoint(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        client_id: Option<String>,
    ) -> Self {
        Self { http, endpoint: endpoint.into(), client_id }
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    #[instrument(skip(self), fields(client_id = ?self.client_id))]
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let mut query =
            vec![("api-version", IMDS_API_VERSION), ("resource", resource_for_scope(scope))];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        let response =
            self.http.get(&self.endpoint).header("Metadata", "true").query(&query).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(token_endpoint_error(status, &body));
        }

        let token: ImdsTokenResponse = serde_json::from_str(&body)
            .map_err(|e| Error::serialization(e, "Failed to parse managed identity token"))?;

        let expires_at = token
            .expires_on
            .value()
            .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single())
            .ok_or_else(|| Error::auth("managed identity token has an unreadable expires_on"))?;

        debug!(%expires_at, "Acquired managed identity token");
        Ok(AccessToken::new(token.access_token, expires_at))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
    /// Local time, e.g. `2024-05-01 14:29:09.000000`
    expires_on: Option<String>,
    /// Epoch seconds, present in newer CLI versions
    #[serde(rename = "expires_on")]
    expires_on_epoch: Option<i64>,
}

impl CliTokenResponse {
    fn expires_at(&self) -> Option<DateTime<Utc>> {
        if let Some(epoch) = self.expires_on_epoch {
            return Utc.timestamp_opt(epoch, 0).single();
        }
        let local = self.expires_on.as_deref()?;
        let naive = NaiveDateTime::parse_from_str(local, "%Y-%m-%d %H:%M:%S%.f").ok()?;
        Local.from_local_datetime(&naive).single().map(|dt| dt.with_timezone(&Utc))
    }
}

/// The user signed in to the Azure CLI.
#[derive(Debug, Clone)]
pub struct AzureCliCredential {
    program: String,
    tenant_id: Option<String>,
}

impl AzureCliCredential {
    pub fn new(tenant_id: Option<String>) -> Self {
        let program = if cfg!(windows) { "az.cmd" } else { "az" };
        Self::with_program(program, tenant_id)
    }

    pub fn with_program(program: impl Into<String>, tenant_id: Option<String>) -> Self {
        Self { program: program.into(), tenant_id }
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    #[instrument(skip(self), fields(program = %self.program))]
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        let mut command = Command::new(&self.program);
        command.args([
            "account",
            "get-access-token",
            "--resource",
            resource_for_scope(scope),
            "--output",
            "json",
        ]);
        if let Some(tenant_id) = &self.tenant_id {
            command.args(["--tenant", tenant_id]);
        }

        let output = command.output().await.map_err(|e| {
            Error::auth(format!("failed to run '{}': {}. Is the Azure CLI installed?", self.program, e))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::auth(format!(
                "'{} account get-access-token' failed: {}. Run 'az login' first",
                self.program,
                stderr.trim()
            )));
        }

        let token: CliTokenResponse = serde_json::from_slice(&output.stdout)
            .map_err(|e| Error::serialization(e, "Failed to parse Azure CLI token output"))?;
        let expires_at = token
            .expires_at()
            .ok_or_else(|| Error::auth("Azure CLI token has an unreadable expiry"))?;

        debug!(%expires_at, "Acquired Azure CLI token");
        Ok(AccessToken::new(token.access_token, expires_at))
    }
}

/// Caches one token per scope until shortly before it expires.
#[derive(Debug)]
pub struct CachedCredential {
    inner: Arc<dyn TokenCredential>,
    cache: RwLock<HashMap<String, AccessToken>>,
}

impl CachedCredential {
    pub fn new(inner: Arc<dyn TokenCredential>) -> Self {
        Self { inner, cache: RwLock::new(HashMap::new()) }
    }
}

#[async_trait]
impl TokenCredential for CachedCredential {
    async fn get_token(&self, scope: &str) -> Result<AccessToken> {
        {
            let cache = self.cache.read().await;
            if let Some(token) = cache.get(scope).filter(|token| token.is_fresh()) {
                return Ok(token.clone());
            }
        }

        let token = self.inner.get_token(scope).await?;
        self.cache.write().await.insert(scope.to_string(), token.clone());
        debug!(scope = %scope, expires_at = %token.expires_at, "Cached access token");
        Ok(token)
    }
}

/// Inputs needed to build a credential.
#[derive(Debug, Clone, Default)]
pub struct CredentialOptions {
    pub kind: CredentialKind,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub authority_host: String,
}

/// Build the configured credential, wrapped in a cache.
pub fn build_credential(
    options: &CredentialOptions,
    http: reqwest::Client,
) -> Result<Arc<dyn TokenCredential>> {
    let inner: Arc<dyn TokenCredential> = match options.kind {
        CredentialKind::ClientSecret => {
            let tenant_id = options
                .tenant_id
                .clone()
                .ok_or_else(|| Error::config("client-secret credential requires a tenant id"))?;
            let client_id = options
                .client_id
                .clone()
                .ok_or_else(|| Error::config("client-secret credential requires a client id"))?;
            let client_secret = options.client_secret.clone().ok_or_else(|| {
                Error::config("client-secret credential requires AZURE_CLIENT_SECRET")
            })?;
            Arc::new(ClientSecretCredential::new(
                http,
                options.authority_host.clone(),
                tenant_id,
                client_id,
                client_secret,
            ))
        }
        CredentialKind::ManagedIdentity => {
            Arc::new(ManagedIdentityCredential::new(http, options.client_id.clone()))
        }
        CredentialKind::AzureCli => Arc::new(AzureCliCredential::new(options.tenant_id.clone())),
    };

    debug!(credential = %options.kind, "Built token credential");
    Ok(Arc::new(CachedCredential::new(inner)))
}

/// Fixed token source for tests and offline use.
#[derive(Debug, Clone)]
pub struct StaticCredential {
    token: String,
}

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl TokenCredential for StaticCredential {
    async fn get_token(&self, _scope: &str) -> Result<AccessToken> {
        Ok(AccessToken::new(self.token.clone(), Utc::now() + Duration::hours(1)))
    }
}

//! Configuration file handling for the certbind CLI
//!
//! Manages loading and saving CLI configuration from ~/.certbind/config.toml
//! and resolving runtime settings from flags, the file and the environment.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::azure::auth::{CredentialKind, DEFAULT_AUTHORITY_HOST};
use crate::azure::key_vault::DEFAULT_VAULT_URL_TEMPLATE;
use crate::config::{AzureSettings, DEFAULT_MANAGEMENT_ENDPOINT, DEFAULT_TIMEOUT_SECONDS};
use crate::domain::SecretString;

pub const ENV_SUBSCRIPTION_ID: &str = "AZURE_SUBSCRIPTION_ID";
pub const ENV_TENANT_ID: &str = "AZURE_TENANT_ID";
pub const ENV_CLIENT_ID: &str = "AZURE_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "AZURE_CLIENT_SECRET";
pub const ENV_CREDENTIAL: &str = "CERTBIND_CREDENTIAL";
pub const ENV_TIMEOUT: &str = "CERTBIND_TIMEOUT";
pub const ENV_SCRATCH_DIR: &str = "CERTBIND_SCRATCH_DIR";
pub const ENV_MANAGEMENT_ENDPOINT: &str = "CERTBIND_MANAGEMENT_ENDPOINT";
pub const ENV_AUTHORITY_HOST: &str = "CERTBIND_AUTHORITY_HOST";
pub const ENV_VAULT_URL_TEMPLATE: &str = "CERTBIND_VAULT_URL_TEMPLATE";

/// CLI configuration stored in ~/.certbind/config.toml
///
/// Client secrets are never written here; they come from `AZURE_CLIENT_SECRET`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// client-secret, managed-identity or azure-cli
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<CredentialKind>,

    /// Request timeout in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub management_endpoint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub authority_host: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_url_template: Option<String>,
}

impl CliConfig {
    /// Get the default configuration file path (~/.certbind/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .context("Unable to determine home directory")?;

        let mut path = PathBuf::from(home);
        path.push(".certbind");
        path.push("config.toml");

        Ok(path)
    }

    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_path()?)
    }

    /// Load configuration from a specific path; a missing file yields the defaults
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_path()?)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SettingsFlags {
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub credential: Option<CredentialKind>,
    pub timeout: Option<u64>,
    pub scratch_dir: Option<PathBuf>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Pick the first present value, logging where it came from.
fn pick<T>(key: &str, flag: Option<T>, file: Option<T>, env: Option<T>) -> Option<T> {
    if flag.is_some() {
        debug!("Using {} from command line flag", key);
        return flag;
    }
    if file.is_some() {
        debug!("Using {} from config file", key);
        return file;
    }
    if env.is_some() {
        debug!("Using {} from environment", key);
    }
    env
}

/// Resolve runtime settings from multiple sources
///
/// Each value is taken from the first source that has it:
/// 1. command line flag
/// 2. ~/.certbind/config.toml
/// 3. environment variable
/// 4. built-in default
///
/// `env` looks up an environment variable; the binary passes `std::env::var`.
pub fn resolve_settings<F>(flags: SettingsFlags, config: &CliConfig, env: F) -> Result<AzureSettings>
where
    F: Fn(&str) -> Option<String>,
{
    let env = |key: &str| non_empty(env(key));

    let subscription_id = pick(
        "subscription_id",
        non_empty(flags.subscription_id),
        non_empty(config.subscription_id.clone()),
        env(ENV_SUBSCRIPTION_ID),
    )
    .ok_or_else(|| {
        anyhow::anyhow!(
            "No subscription id found. Please provide one via:\n\
             - --subscription flag\n\
             - subscription_id in ~/.certbind/config.toml\n\
             - {} environment variable",
            ENV_SUBSCRIPTION_ID
        )
    })?;

    let credential = match pick("credential", flags.credential, config.credential, None) {
        Some(kind) => kind,
        None => match env(ENV_CREDENTIAL) {
            Some(value) => value.parse().with_context(|| format!("Invalid {}", ENV_CREDENTIAL))?,
            None => CredentialKind::default(),
        },
    };

    let timeout_seconds = match pick("timeout", flags.timeout, config.timeout, None) {
        Some(timeout) => timeout,
        None => match env(ENV_TIMEOUT) {
            Some(value) => value
                .parse()
                .with_context(|| format!("Invalid {}: must be a number of seconds", ENV_TIMEOUT))?,
            None => DEFAULT_TIMEOUT_SECONDS,
        },
    };

    let settings = AzureSettings {
        subscription_id,
        tenant_id: pick(
            "tenant_id",
            non_empty(flags.tenant_id),
            non_empty(config.tenant_id.clone()),
            env(ENV_TENANT_ID),
        ),
        client_id: pick(
            "client_id",
            non_empty(flags.client_id),
            non_empty(config.client_id.clone()),
            env(ENV_CLIENT_ID),
        ),
        client_secret: env(ENV_CLIENT_SECRET).map(SecretString::new),
        credential,
        timeout_seconds,
        scratch_dir: pick(
            "scratch_dir",
            flags.scratch_dir,
            config.scratch_dir.clone(),
            env(ENV_SCRATCH_DIR).map(PathBuf::from),
        )
        .unwrap_or_else(std::env::temp_dir),
        management_endpoint: pick(
            "management_endpoint",
            None,
            non_empty(config.management_endpoint.clone()),
            env(ENV_MANAGEMENT_ENDPOINT),
        )
        .unwrap_or_else(|| DEFAULT_MANAGEMENT_ENDPOINT.to_string()),
        authority_host: pick(
            "authority_host",
            None,
            non_empty(config.authority_host.clone()),
            env(ENV_AUTHORITY_HOST),
        )
        .unwrap_or_else(|| DEFAULT_AUTHORITY_HOST.to_string()),
        vault_url_template: pick(
            "vault_url_template",
            None,
            non_empty(config.vault_url_template.clone()),
            env(ENV_VAULT_URL_TEMPLATE),
        )
        .unwrap_or_else(|| DEFAULT_VAULT_URL_TEMPLATE.to_string()),
    };

    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

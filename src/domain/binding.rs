//! SSL binding request and the report of a binding run.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::certificate::{ImportResult, Thumbprint};

/// Hostname binding SSL mode, spelled as App Service expects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SslState {
    Disabled,
    SniEnabled,
    IpBasedEnabled,
}

impl SslState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "Disabled",
            Self::SniEnabled => "SniEnabled",
            Self::IpBasedEnabled => "IpBasedEnabled",
        }
    }
}

impl fmt::Display for SslState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to bind a certificate to a custom hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SslBindingRequest {
    pub resource_group: String,
    pub app_name: String,
    pub thumbprint: Thumbprint,
    pub hostname: String,
    pub ssl_state: SslState,
}

impl SslBindingRequest {
    /// An SNI binding. This is the only mode the workflow issues.
    pub fn sni(
        resource_group: impl Into<String>,
        app_name: impl Into<String>,
        thumbprint: Thumbprint,
        hostname: impl Into<String>,
    ) -> Self {
        Self {
            resource_group: resource_group.into(),
            app_name: app_name.into(),
            thumbprint,
            hostname: hostname.into(),
            ssl_state: SslState::SniEnabled,
        }
    }
}

/// Hostname binding as returned by App Service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingResult {
    pub id: Option<String>,
    pub name: String,
    pub ssl_state: Option<SslState>,
    pub thumbprint: Option<String>,
}

/// Everything an operator needs to see after a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct BindingReport {
    pub app_name: String,
    pub resource_group: String,
    pub hostname: String,
    pub source_vault: String,
    pub destination_vault: String,
    pub certificate_name: String,
    pub thumbprint: Thumbprint,
    pub ssl_state: SslState,
    /// Present only when the scratch container was kept on disk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_path: Option<PathBuf>,
    pub import: ImportResult,
    pub binding: BindingResult,
}

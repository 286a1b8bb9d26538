//! Resource manager entities.

use serde::{Deserialize, Serialize};

/// Resource type of App Service web apps
pub const WEB_APP_RESOURCE_TYPE: &str = "Microsoft.Web/sites";

/// Resource type of Key Vault vaults
pub const VAULT_RESOURCE_TYPE: &str = "Microsoft.KeyVault/vaults";

/// A resource as enumerated by the resource manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSummary {
    /// Fully qualified resource id
    pub id: String,
    pub name: String,
    /// Provider resource type, e.g. `Microsoft.KeyVault/vaults`
    #[serde(rename = "type")]
    pub resource_type: String,
}

impl ResourceSummary {
    /// Resource types are case-insensitive in the resource manager.
    pub fn is_type(&self, resource_type: &str) -> bool {
        self.resource_type.eq_ignore_ascii_case(resource_type)
    }

    pub fn is_vault(&self) -> bool {
        self.is_type(VAULT_RESOURCE_TYPE)
    }

    pub fn resource_group(&self) -> Option<&str> {
        resource_group_from_id(&self.id)
    }
}

/// Extract the resource group segment from a resource id.
///
/// `/subscriptions/{sub}/resourceGroups/{rg}/providers/...` yields `{rg}`.
/// Returns `None` when the id has no (or an empty) resource group segment.
pub fn resource_group_from_id(id: &str) -> Option<&str> {
    let mut segments = id.split('/');
    while let Some(segment) = segments.next() {
        if segment.eq_ignore_ascii_case("resourceGroups") {
            return segments.next().filter(|rg| !rg.is_empty());
        }
    }
    None
}

/// The web app targeted by a binding run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebApp {
    pub id: String,
    pub name: String,
    pub resource_group: String,
    /// Object id of the app's system-assigned managed identity, if enabled
    pub principal_id: Option<String>,
}

/// An access policy entry on a vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultAccessPolicy {
    /// Name of the vault the policy grants access on
    pub vault_name: String,
    /// Object id the policy applies to
    pub principal_id: String,
    pub tenant_id: Option<String>,
}

impl VaultAccessPolicy {
    /// Principal ids are GUIDs; compare without regard to case.
    pub fn applies_to(&self, principal_id: &str) -> bool {
        self.principal_id.eq_ignore_ascii_case(principal_id)
    }
}

/// A vault with its access policies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultDescriptor {
    pub id: String,
    pub name: String,
    pub vault_uri: Option<String>,
    pub access_policies: Vec<VaultAccessPolicy>,
}

//! Azure Resource Manager lookups.

use async_trait::async_trait;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, instrument};
use url::Url;

use super::auth::MANAGEMENT_SCOPE;
use super::client::AzureHttpClient;
use crate::domain::{resource_group_from_id, ResourceSummary, VaultAccessPolicy, VaultDescriptor, WebApp};
use crate::errors::{Error, Result};

const RESOURCES_API_VERSION: &str = "2021-04-01";
const WEB_API_VERSION: &str = "2022-03-01";
const VAULT_API_VERSION: &str = "2022-07-01";

/// Resource manager operations the binding workflow needs.
#[async_trait]
pub trait ResourceApi: Send + Sync + fmt::Debug {
    /// Resources in the subscription with exactly this name and type.
    async fn find_resources(&self, name: &str, resource_type: &str) -> Result<Vec<ResourceSummary>>;

    /// Web app details, including its managed identity. `None` when the app is gone.
    async fn get_web_app(&self, resource: &ResourceSummary) -> Result<Option<WebApp>>;

    /// All resources of a resource group in enumeration order. `None` when the group does not exist.
    async fn list_resource_group(&self, resource_group: &str)
        -> Result<Option<Vec<ResourceSummary>>>;

    /// Vault properties and access policies. `None` when the vault is gone.
    async fn get_vault_details(&self, resource: &ResourceSummary)
        -> Result<Option<VaultDescriptor>>;
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteResponse {
    id: String,
    name: String,
    #[serde(default)]
    identity: Option<SiteIdentity>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteIdentity {
    #[serde(default)]
    principal_id: Option<String>,
}

#[derive(Deserialize)]
struct VaultResponse {
    id: String,
    name: String,
    properties: VaultProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VaultProperties {
    #[serde(default)]
    vault_uri: Option<String>,
    /// Absent on vaults using RBAC authorization
    #[serde(default)]
    access_policies: Vec<AccessPolicyEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessPolicyEntry {
    object_id: String,
    #[serde(default)]
    tenant_id: Option<String>,
}

/// [`ResourceApi`] backed by the Azure Resource Manager REST API.
#[derive(Debug, Clone)]
pub struct ArmResourceClient {
    client: AzureHttpClient,
    endpoint: String,
    subscription_id: String,
}

impl ArmResourceClient {
    pub fn new(
        client: AzureHttpClient,
        endpoint: impl Into<String>,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            subscription_id: subscription_id.into(),
        }
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<String> {
        let mut url = Url::parse(&format!("{}{}", self.endpoint, path))
            .map_err(|e| Error::config(format!("Invalid management URL for {}: {}", path, e)))?;
        url.query_pairs_mut().extend_pairs(params);
        Ok(url.into())
    }

    fn resource_url(&self, id: &str, api_version: &str) -> Result<String> {
        self.url(id, &[("api-version", api_version)])
    }
}

/// OData string literals escape single quotes by doubling them.
fn odata_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[async_trait]
impl ResourceApi for ArmResourceClient {
    #[instrument(skip(self), fields(subscription_id = %self.subscription_id))]
    async fn find_resources(&self, name: &str, resource_type: &str) -> Result<Vec<ResourceSummary>> {
        let filter = format!(
            "resourceType eq {} and name eq {}",
            odata_literal(resource_type),
            odata_literal(name)
        );
        let url = self.url(
            &format!("/subscriptions/{}/resources", self.subscription_id),
            &[("$filter", filter.as_str()), ("api-version", RESOURCES_API_VERSION)],
        )?;

        let resources: Vec<ResourceSummary> =
            self.client.get_paged(&url, MANAGEMENT_SCOPE).await?.unwrap_or_default();

        // The filter is case-insensitive on the service side; keep exact-name hits only
        let matches: Vec<ResourceSummary> = resources
            .into_iter()
            .filter(|r| r.name.eq_ignore_ascii_case(name) && r.is_type(resource_type))
            .collect();

        debug!(count = matches.len(), "Resource lookup complete");
        Ok(matches)
    }

    #[instrument(skip(self, resource), fields(app = %resource.name))]
    async fn get_web_app(&self, resource: &ResourceSummary) -> Result<Option<WebApp>> {
        let url = self.resource_url(&resource.id, WEB_API_VERSION)?;
        let Some(site) = self.client.get_json_opt::<SiteResponse>(&url, MANAGEMENT_SCOPE).await?
        else {
            return Ok(None);
        };

        let resource_group = resource_group_from_id(&site.id).unwrap_or_default().to_string();
        let principal_id = site
            .identity
            .and_then(|identity| identity.principal_id)
            .filter(|id| !id.is_empty());

        Ok(Some(WebApp { id: site.id, name: site.name, resource_group, principal_id }))
    }

    #[instrument(skip(self), fields(subscription_id = %self.subscription_id))]
    async fn list_resource_group(
        &self,
        resource_group: &str,
    ) -> Result<Option<Vec<ResourceSummary>>> {
        let url = self.url(
            &format!("/subscriptions/{}/resourceGroups/{}/resources", self.subscription_id, resource_group),
            &[("api-version", RESOURCES_API_VERSION)],
        )?;

        let resources = self.client.get_paged(&url, MANAGEMENT_SCOPE).await?;
        if let Some(resources) = &resources {
            debug!(count = resources.len(), "Listed resource group");
        }
        Ok(resources)
    }

    #[instrument(skip(self, resource), fields(vault = %resource.name))]
    async fn get_vault_details(
        &self,
        resource: &ResourceSummary,
    ) -> Result<Option<VaultDescriptor>> {
        let url = self.resource_url(&resource.id, VAULT_API_VERSION)?;
        let Some(vault) = self.client.get_json_opt::<VaultResponse>(&url, MANAGEMENT_SCOPE).await?
        else {
            return Ok(None);
        };

        let access_policies = vault
            .properties
            .access_policies
            .into_iter()
            .map(|entry| VaultAccessPolicy {
                vault_name: vault.name.clone(),
                principal_id: entry.object_id,
                tenant_id: entry.tenant_id,
            })
            .collect::<Vec<_>>();

        debug!(policies = access_policies.len(), "Fetched vault access policies");
        Ok(Some(VaultDescriptor {
            id: vault.id,
            name: vault.name,
            vault_uri: vault.properties.vault_uri,
            access_policies,
        }))
    }
}

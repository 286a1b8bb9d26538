//! App Service hostname bindings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, instrument};
use url::Url;

use super::auth::MANAGEMENT_SCOPE;
use super::client::AzureHttpClient;
use crate::domain::{BindingResult, SslBindingRequest, SslState};
use crate::errors::{Error, Result};

const WEB_API_VERSION: &str = "2022-03-01";

/// App Service operations the binding workflow needs.
#[async_trait]
pub trait WebApi: Send + Sync + fmt::Debug {
    /// Create or replace the hostname binding described by `request`.
    async fn create_ssl_binding(&self, request: &SslBindingRequest) -> Result<BindingResult>;
}

#[derive(Serialize)]
struct BindingEnvelope<'a> {
    properties: BindingRequestProperties<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BindingRequestProperties<'a> {
    ssl_state: SslState,
    thumbprint: &'a str,
}

#[derive(Deserialize)]
struct BindingResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    properties: Option<BindingResponseProperties>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BindingResponseProperties {
    #[serde(default)]
    ssl_state: Option<SslState>,
    #[serde(default)]
    thumbprint: Option<String>,
}

/// [`WebApi`] backed by the App Service management API.
#[derive(Debug, Clone)]
pub struct AppServiceClient {
    client: AzureHttpClient,
    endpoint: String,
    subscription_id: String,
}

impl AppServiceClient {
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

    fn binding_url(&self, request: &SslBindingRequest) -> Result<String> {
        let mut url = Url::parse(&self.endpoint).map_err(|e| {
            Error::config(format!("Invalid management endpoint '{}': {}", self.endpoint, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                Error::config(format!("Management endpoint '{}' cannot carry a path", self.endpoint))
            })?
            .pop_if_empty()
            .extend([
                "subscriptions",
                self.subscription_id.as_str(),
                "resourceGroups",
                request.resource_group.as_str(),
                "providers",
                "Microsoft.Web",
                "sites",
                request.app_name.as_str(),
                "hostNameBindings",
                request.hostname.as_str(),
            ]);
        url.query_pairs_mut().append_pair("api-version", WEB_API_VERSION);
        Ok(url.into())
    }
}

#[async_trait]
impl WebApi for AppServiceClient {
    #[instrument(skip(self, request), fields(app = %request.app_name, hostname = %request.hostname))]
    async fn create_ssl_binding(&self, request: &SslBindingRequest) -> Result<BindingResult> {
        let body = BindingEnvelope {
            properties: BindingRequestProperties {
                ssl_state: request.ssl_state,
                thumbprint: request.thumbprint.as_str(),
            },
        };

        let url = self.binding_url(request)?;
        let response: BindingResponse = self.client.put_json(&url, MANAGEMENT_SCOPE, &body).await?;
        let properties = response.properties;

        let result = BindingResult {
            id: response.id,
            name: response.name.unwrap_or_else(|| request.hostname.clone()),
            ssl_state: properties.as_ref().and_then(|p| p.ssl_state),
            thumbprint: properties.and_then(|p| p.thumbprint),
        };

        info!(ssl_state = ?result.ssl_state, "Hostname binding updated");
        Ok(result)
    }
}

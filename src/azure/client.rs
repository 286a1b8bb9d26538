//! Authenticated HTTP client shared by the Azure REST clients.

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use super::auth::TokenCredential;
use crate::errors::{Error, Result};

/// JSON keys whose string values are replaced before a body is traced
const SENSITIVE_KEYS: &[&str] = &["value", "pwd", "access_token", "accessToken", "client_secret"];

/// Build the underlying `reqwest` client with the configured timeout.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder().timeout(timeout).build().map_err(Error::Transport)
}

/// Bearer-authenticated JSON client.
#[derive(Debug, Clone)]
pub struct AzureHttpClient {
    http: Client,
    credential: Arc<dyn TokenCredential>,
    verbose: bool,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(default)]
    next_link: Option<String>,
}

impl AzureHttpClient {
    pub fn new(http: Client, credential: Arc<dyn TokenCredential>, verbose: bool) -> Self {
        Self { http, credential, verbose }
    }

    async fn request(&self, method: Method, url: &str, scope: &str) -> Result<RequestBuilder> {
        let token = self.credential.get_token(scope).await?;
        debug!("{} {}", method, url);
        Ok(self.http.request(method, url).bearer_auth(token.token.expose_secret()))
    }

    /// GET a resource; 404 yields `None`.
    pub async fn get_json_opt<T: DeserializeOwned>(
        &self,
        url: &str,
        scope: &str,
    ) -> Result<Option<T>> {
        let response = self.request(Method::GET, url, scope).await?.send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            debug!(url = %url, "Resource not found");
            return Ok(None);
        }
        self.handle_response(response).await.map(Some)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str, scope: &str) -> Result<T> {
        let response = self.request(Method::GET, url, scope).await?.send().await?;
        self.handle_response(response).await
    }

    /// GET every page of a `{ value, nextLink }` collection; 404 on the first page yields `None`.
    pub async fn get_paged<T: DeserializeOwned>(
        &self,
        url: &str,
        scope: &str,
    ) -> Result<Option<Vec<T>>> {
        let Some(first) = self.get_json_opt::<Page<T>>(url, scope).await? else {
            return Ok(None);
        };

        let mut items = first.value;
        let mut next_link = first.next_link;
        while let Some(link) = next_link {
            let page: Page<T> = self.get_json(&link, scope).await?;
            items.extend(page.value);
            next_link = page.next_link;
        }

        Ok(Some(items))
    }

    pub async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        scope: &str,
        body: &B,
    ) -> Result<T> {
        self.trace_request_body(body);
        let response = self.request(Method::PUT, url, scope).await?.json(body).send().await?;
        self.handle_response(response).await
    }

    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: &str,
        scope: &str,
        body: &B,
    ) -> Result<T> {
        self.trace_request_body(body);
        let response = self.request(Method::POST, url, scope).await?.json(body).send().await?;
        self.handle_response(response).await
    }

    /// DELETE a resource; a resource that is already gone counts as deleted.
    pub async fn delete(&self, url: &str, scope: &str) -> Result<()> {
        let response = self.request(Method::DELETE, url, scope).await?.send().await?;
        let status = response.status();
        debug!("Response status: {}", status);

        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_else(|_| "<unable to read error>".to_string());
        Err(self.error_from_response(status, &body))
    }

    fn trace_request_body<B: Serialize>(&self, body: &B) {
        if self.verbose {
            let body_json = serde_json::to_value(body)
                .map(|mut value| {
                    redact(&mut value);
                    value.to_string()
                })
                .unwrap_or_else(|_| "<unable to serialize>".to_string());
            trace!("Request body:\n{}", body_json);
        }
    }

    async fn handle_response<T: DeserializeOwned>(&self, response: Response) -> Result<T> {
        let status = response.status();
        debug!("Response status: {}", status);

        let body = response.text().await?;
        if self.verbose {
            trace!("Response body:\n{}", redact_body(&body));
        }

        if !status.is_success() {
            return Err(self.error_from_response(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| Error::serialization(e, format!("Failed to deserialize {} response", status)))
    }

    fn error_from_response(&self, status: StatusCode, body: &str) -> Error {
        let message = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope { error }) => match (error.code, error.message) {
                (Some(code), Some(message)) => format!("{}: {}", code, message),
                (None, Some(message)) => message,
                (Some(code), None) => code,
                (None, None) => body.to_string(),
            },
            Err(_) if body.is_empty() => {
                status.canonical_reason().unwrap_or("request failed").to_string()
            }
            Err(_) => body.to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Error::auth(format!("{} ({})", message, status.as_u16()))
            }
            _ => Error::http(status.as_u16(), message),
        }
    }
}

/// Replace sensitive string values anywhere in a JSON document.
fn redact(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, entry) in map.iter_mut() {
                if entry.is_string() && SENSITIVE_KEYS.contains(&key.as_str()) {
                    *entry = serde_json::Value::String("[REDACTED]".to_string());
                } else {
                    redact(entry);
                }
            }
        }
        serde_json::Value::Array(items) => items.iter_mut().for_each(redact),
        _ => {}
    }
}

fn redact_body(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(mut value) => {
            redact(&mut value);
            value.to_string()
        }
        Err(_) => format!("<{} bytes of non-JSON body>", body.len()),
    }
}

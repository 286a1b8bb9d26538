use certbind::domain::{SslBindingRequest, SslState, Thumbprint};
use certbind::Error;
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{self, bearer, RESOURCE_GROUP};

const HOST_BINDING_PATH: &str =
    "/subscriptions/sub-1/resourceGroups/rg-web/providers/Microsoft.Web/sites/web-01/hostNameBindings/shop.example.com";

fn request() -> SslBindingRequest {
    SslBindingRequest::sni(
        RESOURCE_GROUP,
        "web-01",
        Thumbprint::from_hex("DA39A3EE5E6B4B0D3255BFEF95601890AFD80709").unwrap(),
        "shop.example.com",
    )
}

#[tokio::test]
async fn test_create_sni_binding() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(HOST_BINDING_PATH))
        .and(query_param("api-version", "2022-03-01"))
        .and(bearer())
        .and(body_json(json!({
            "properties": {
                "sslState": "SniEnabled",
                "thumbprint": "DA39A3EE5E6B4B0D3255BFEF95601890AFD80709"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": HOST_BINDING_PATH,
            "name": "web-01/shop.example.com",
            "type": "Microsoft.Web/sites/hostNameBindings",
            "properties": {
                "siteName": "web-01",
                "sslState": "SniEnabled",
                "thumbprint": "DA39A3EE5E6B4B0D3255BFEF95601890AFD80709"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    let result = clients.web.create_ssl_binding(&request()).await.unwrap();

    assert_eq!(result.name, "web-01/shop.example.com");
    assert_eq!(result.ssl_state, Some(SslState::SniEnabled));
    assert_eq!(result.thumbprint.as_deref(), Some("DA39A3EE5E6B4B0D3255BFEF95601890AFD80709"));
}

#[tokio::test]
async fn test_binding_conflict_is_http_error() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(HOST_BINDING_PATH))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error": {
                "code": "Conflict",
                "message": "Hostname 'shop.example.com' is not registered on site 'web-01'."
            }
        })))
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    match clients.web.create_ssl_binding(&request()).await.unwrap_err() {
        Error::Http { status, message } => {
            assert_eq!(status, 409);
            assert!(message.starts_with("Conflict: Hostname 'shop.example.com'"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

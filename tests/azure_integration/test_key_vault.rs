use base64::Engine;
use certbind::domain::{SecretString, Thumbprint};
use certbind::Error;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{self, bearer, PASSWORD};

#[tokio::test]
async fn test_get_secret() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vaults/kv-shared/secrets/shop-cert-password"))
        .and(query_param("api-version", "7.4"))
        .and(bearer())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": PASSWORD,
            "id": "https://kv-shared.vault.azure.net/secrets/shop-cert-password/0f1e2d",
            "attributes": { "enabled": true }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    let secret = clients.vaults.get_secret("kv-shared", "shop-cert-password").await.unwrap().unwrap();

    assert_eq!(secret.name, "shop-cert-password");
    assert_eq!(secret.value.expose_secret(), PASSWORD);
    assert_eq!(secret.content_type, None);
    assert!(!format!("{:?}", secret).contains(PASSWORD));
}

#[tokio::test]
async fn test_missing_secret_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vaults/kv-shared/secrets/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "SecretNotFound", "message": "A secret with (name/id) nope was not found in this key vault." }
        })))
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    assert!(clients.vaults.get_secret("kv-shared", "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn test_secret_name_stays_one_path_segment() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vaults/kv-shared/secrets/odd%3Fname%2Fpart"))
        .and(query_param("api-version", "7.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": PASSWORD })))
        .expect(1)
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    let secret = clients.vaults.get_secret("kv-shared", "odd?name/part").await.unwrap().unwrap();
    assert_eq!(secret.name, "odd?name/part");
}

#[tokio::test]
async fn test_get_certificate_decodes_x5t() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vaults/kv-shared/certificates/shop-cert"))
        .and(query_param("api-version", "7.4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "https://kv-shared.vault.azure.net/certificates/shop-cert/7c6b5a",
            "x5t": "2jmj7l5rSw0yVb_vlWAYkK_YBwk",
            "cer": "MIIB"
        })))
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    let certificate = clients.vaults.get_certificate("kv-shared", "shop-cert").await.unwrap().unwrap();

    assert_eq!(certificate.name, "shop-cert");
    assert_eq!(certificate.thumbprint.as_str(), "DA39A3EE5E6B4B0D3255BFEF95601890AFD80709");
}

#[tokio::test]
async fn test_certificate_without_x5t_is_rejected() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/vaults/kv-shared/certificates/pending-cert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "https://kv-shared.vault.azure.net/certificates/pending-cert/1"
        })))
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    let err = clients.vaults.get_certificate("kv-shared", "pending-cert").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[tokio::test]
async fn test_import_certificate_request() {
    let server = MockServer::start().await;
    let fixture = support::certificate_fixture();

    Mock::given(method("POST"))
        .and(path("/vaults/kv-app/certificates/shop-cert/import"))
        .and(query_param("api-version", "7.4"))
        .and(bearer())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "https://kv-app.vault.azure.net/certificates/shop-cert/abc123",
            "x5t": fixture.x5t,
            "policy": { "secret_props": { "contentType": "application/x-pkcs12" } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("SslCert-test.pfx");
    std::fs::write(&file, b"pfx-bytes").unwrap();

    let clients = support::clients(&server);
    let result = clients
        .vaults
        .import_certificate("kv-app", "shop-cert", &file, &SecretString::new(PASSWORD))
        .await
        .unwrap();

    assert_eq!(result.vault, "kv-app");
    assert_eq!(result.name, "shop-cert");
    assert_eq!(result.version.as_deref(), Some("abc123"));
    assert_eq!(result.thumbprint, Some(Thumbprint::from_hex(&fixture.thumbprint).unwrap()));

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["value"], base64::engine::general_purpose::STANDARD.encode(b"pfx-bytes"));
    assert_eq!(body["pwd"], PASSWORD);
    assert_eq!(body["policy"]["secret_props"]["contentType"], "application/x-pkcs12");
}

#[tokio::test]
async fn test_import_missing_file_is_io_error() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let clients = support::clients(&server);
    let err = clients
        .vaults
        .import_certificate(
            "kv-app",
            "shop-cert",
            &dir.path().join("missing.pfx"),
            &SecretString::new(PASSWORD),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Io { .. }));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_import_forbidden_is_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/vaults/kv-app/certificates/shop-cert/import"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": {
                "code": "Forbidden",
                "message": "The user, group or application does not have certificates import permission"
            }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("SslCert-test.pfx");
    std::fs::write(&file, b"pfx-bytes").unwrap();

    let clients = support::clients(&server);
    let err = clients
        .vaults
        .import_certificate("kv-app", "shop-cert", &file, &SecretString::new(PASSWORD))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Auth { .. }));
    assert!(err.to_string().contains("certificates import"));
    assert!(!err.to_string().contains(PASSWORD));
}

#[tokio::test]
async fn test_delete_certificate_tolerates_missing() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/vaults/kv-app/certificates/shop-cert"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "https://kv-app.vault.azure.net/certificates/shop-cert"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/vaults/kv-app/certificates/gone-cert"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    clients.vaults.delete_certificate("kv-app", "shop-cert").await.unwrap();
    clients.vaults.delete_certificate("kv-app", "gone-cert").await.unwrap();
}

use base64::Engine;
use certbind::domain::{SslState, Thumbprint};
use certbind::BindingOptions;
use p12::PFX;
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::scenario::{self, BINDING_PATH};
use crate::support::{self, PASSWORD};

async fn mount_binding(server: &MockServer, thumbprint: &str) {
    Mock::given(method("PUT"))
        .and(path(BINDING_PATH))
        .and(body_json(json!({
            "properties": { "sslState": "SniEnabled", "thumbprint": thumbprint }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": BINDING_PATH,
            "name": "web-01/shop.example.com",
            "properties": { "sslState": "SniEnabled", "thumbprint": thumbprint }
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_binds_certificate_end_to_end() {
    let server = MockServer::start().await;
    let fixture = support::certificate_fixture();
    scenario::mount_lookups_and_import(&server, &fixture).await;
    mount_binding(&server, &fixture.thumbprint).await;

    let scratch = tempfile::tempdir().unwrap();
    let report = scenario::orchestrator(&server, scratch.path(), BindingOptions::default())
        .bind(&scenario::inputs())
        .await
        .unwrap();

    assert_eq!(report.app_name, "web-01");
    assert_eq!(report.resource_group, "rg-web");
    assert_eq!(report.destination_vault, "kv-app");
    assert_eq!(report.thumbprint, Thumbprint::from_hex(&fixture.thumbprint).unwrap());
    assert_eq!(report.ssl_state, SslState::SniEnabled);
    assert_eq!(report.import.version.as_deref(), Some("1f2e3d"));
    assert_eq!(report.binding.ssl_state, Some(SslState::SniEnabled));
    assert!(report.scratch_path.is_none());
    assert!(scenario::dir_is_empty(scratch.path()));

    // The imported container is protected with the password secret
    let body = scenario::import_body(&server).await;
    assert_eq!(body["pwd"], PASSWORD);
    let der = base64::engine::general_purpose::STANDARD
        .decode(body["value"].as_str().unwrap())
        .unwrap();
    let pfx = PFX::parse(&der).unwrap();
    assert!(pfx.verify_mac(PASSWORD));
    assert_eq!(pfx.cert_x509_bags(PASSWORD).unwrap(), vec![fixture.cert_der.clone()]);

    // Nothing secret ends up in the operator report
    let rendered = serde_json::to_string(&report).unwrap();
    assert!(!rendered.contains(PASSWORD));
    assert!(!rendered.contains(&fixture.secret_value));
}

#[tokio::test]
async fn test_keep_scratch_leaves_protected_container() {
    let server = MockServer::start().await;
    let fixture = support::certificate_fixture();
    scenario::mount_lookups_and_import(&server, &fixture).await;
    mount_binding(&server, &fixture.thumbprint).await;

    let scratch = tempfile::tempdir().unwrap();
    let options = BindingOptions { keep_scratch: true, ..Default::default() };
    let report = scenario::orchestrator(&server, scratch.path(), options)
        .bind(&scenario::inputs())
        .await
        .unwrap();

    let kept = report.scratch_path.expect("scratch path reported");
    assert!(kept.starts_with(scratch.path()));
    assert!(kept.file_name().unwrap().to_string_lossy().starts_with("SslCert-"));

    let pfx = PFX::parse(&std::fs::read(&kept).unwrap()).unwrap();
    assert!(pfx.verify_mac(PASSWORD));
}

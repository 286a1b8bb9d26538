//! Shared fixtures for tests that stand a wiremock server in for Azure.

#![allow(dead_code)]

use std::sync::Arc;

use base64::Engine;
use certbind::azure::{AzureClients, StaticCredential};
use certbind::certificates::leaf_thumbprint;
use certbind::config::AzureSettings;
use p12::{CertBag, ContentInfo, OtherBag, SafeBag, SafeBagKind, PFX};
use serde_json::{json, Value};
use wiremock::matchers::header;
use wiremock::MockServer;
use yasna::models::ObjectIdentifier;

pub const TOKEN: &str = "test-token";
pub const SUBSCRIPTION: &str = "sub-1";
pub const RESOURCE_GROUP: &str = "rg-web";
pub const PRINCIPAL: &str = "5f3c1a2b-0000-4000-8000-00000000abcd";
pub const PASSWORD: &str = "correct horse battery staple";

/// Matcher for the bearer token every client call must carry
pub fn bearer() -> impl wiremock::Match {
    header("authorization", format!("Bearer {}", TOKEN).as_str())
}

pub fn settings(server: &MockServer) -> AzureSettings {
    AzureSettings {
        subscription_id: SUBSCRIPTION.to_string(),
        management_endpoint: server.uri(),
        vault_url_template: format!("{}/vaults/{{vault}}", server.uri()),
        ..Default::default()
    }
}

pub fn clients(server: &MockServer) -> AzureClients {
    AzureClients::with_credential(
        &settings(server),
        reqwest::Client::new(),
        Arc::new(StaticCredential::new(TOKEN)),
        false,
    )
}

pub fn site_id(resource_group: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Web/sites/{}",
        SUBSCRIPTION, resource_group, name
    )
}

pub fn vault_id(resource_group: &str, name: &str) -> String {
    format!(
        "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.KeyVault/vaults/{}",
        SUBSCRIPTION, resource_group, name
    )
}

pub fn resource_json(id: &str, name: &str, resource_type: &str) -> Value {
    json!({ "id": id, "name": name, "type": resource_type, "location": "westeurope" })
}

pub fn vault_json(id: &str, name: &str, principals: &[&str]) -> Value {
    let policies: Vec<Value> = principals
        .iter()
        .map(|p| {
            json!({
                "tenantId": "tenant-1",
                "objectId": p,
                "permissions": { "certificates": ["get", "import"], "secrets": ["get"] }
            })
        })
        .collect();

    json!({
        "id": id,
        "name": name,
        "type": "Microsoft.KeyVault/vaults",
        "properties": {
            "tenantId": "tenant-1",
            "vaultUri": format!("https://{}.vault.azure.net/", name),
            "accessPolicies": policies
        }
    })
}

/// A self-signed certificate exported the way Key Vault stores certificate secrets.
pub struct CertificateFixture {
    pub cert_der: Vec<u8>,
    /// Base64 of an unprotected PKCS#12 container with the key in a plain KeyBag
    pub secret_value: String,
    /// Uppercase hex SHA-1 of the certificate
    pub thumbprint: String,
    /// The same digest as base64url, as Key Vault reports it
    pub x5t: String,
}

pub fn certificate_fixture() -> CertificateFixture {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["shop.example.com".to_string()]).unwrap();
    let cert_der = cert.der().to_vec();
    let pfx = unencrypted_pfx(&cert_der, &key_pair.serialize_der());

    let thumbprint = leaf_thumbprint(&cert_der).unwrap().to_string();
    let x5t = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .encode(hex::decode(&thumbprint).unwrap());

    CertificateFixture {
        cert_der,
        secret_value: base64::engine::general_purpose::STANDARD.encode(pfx),
        thumbprint,
        x5t,
    }
}

/// An unencrypted PKCS#12 export: certificate and key bags in a plain
/// SafeContents, no MAC.
pub fn unencrypted_pfx(cert_der: &[u8], key_der: &[u8]) -> Vec<u8> {
    let bags = [
        SafeBagKind::CertBag(CertBag::X509(cert_der.to_vec())),
        SafeBagKind::OtherBagKind(OtherBag {
            bag_id: ObjectIdentifier::from_slice(&[1, 2, 840, 113_549, 1, 12, 10, 1, 1]),
            bag_value: key_der.to_vec(),
        }),
    ];
    let safe_contents = yasna::construct_der(|w| {
        w.write_sequence_of(|w| {
            for bag in &bags {
                SafeBag { bag: bag.clone(), attributes: vec![] }.write(w.next());
            }
        })
    });
    let auth_safe = yasna::construct_der(|w| {
        w.write_sequence_of(|w| ContentInfo::Data(safe_contents).write(w.next()))
    });

    PFX { version: 3, auth_safe: ContentInfo::Data(auth_safe), mac_data: None }.to_der()
}

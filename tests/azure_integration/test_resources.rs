use certbind::domain::{ResourceSummary, VAULT_RESOURCE_TYPE, WEB_APP_RESOURCE_TYPE};
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{self, bearer, resource_json, site_id, vault_id, vault_json, PRINCIPAL, RESOURCE_GROUP};

fn summary(id: String, name: &str, resource_type: &str) -> ResourceSummary {
    ResourceSummary { id, name: name.to_string(), resource_type: resource_type.to_string() }
}

#[tokio::test]
async fn test_find_resources_filters_by_type_and_name() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1/resources"))
        .and(query_param("$filter", "resourceType eq 'Microsoft.Web/sites' and name eq 'web-01'"))
        .and(query_param("api-version", "2021-04-01"))
        .and(bearer())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                resource_json(&site_id(RESOURCE_GROUP, "web-01"), "web-01", WEB_APP_RESOURCE_TYPE),
                // Prefix matches and other types are dropped client-side
                resource_json(&site_id(RESOURCE_GROUP, "web-01-staging"), "web-01-staging", WEB_APP_RESOURCE_TYPE),
                resource_json(&vault_id(RESOURCE_GROUP, "web-01"), "web-01", VAULT_RESOURCE_TYPE)
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    let found = clients.resources.find_resources("web-01", WEB_APP_RESOURCE_TYPE).await.unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, site_id(RESOURCE_GROUP, "web-01"));
}

#[tokio::test]
async fn test_find_resources_escapes_quotes() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1/resources"))
        .and(query_param("$filter", "resourceType eq 'Microsoft.Web/sites' and name eq 'o''brien'"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "value": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    let found = clients.resources.find_resources("o'brien", WEB_APP_RESOURCE_TYPE).await.unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_get_web_app_reads_identity() {
    let server = MockServer::start().await;
    let id = site_id(RESOURCE_GROUP, "web-01");

    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .and(query_param("api-version", "2022-03-01"))
        .and(bearer())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "name": "web-01",
            "type": WEB_APP_RESOURCE_TYPE,
            "identity": { "type": "SystemAssigned", "principalId": PRINCIPAL, "tenantId": "tenant-1" },
            "properties": { "hostNames": ["web-01.azurewebsites.net", "shop.example.com"] }
        })))
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    let app = clients
        .resources
        .get_web_app(&summary(id.clone(), "web-01", WEB_APP_RESOURCE_TYPE))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(app.name, "web-01");
    assert_eq!(app.resource_group, RESOURCE_GROUP);
    assert_eq!(app.principal_id.as_deref(), Some(PRINCIPAL));
}

#[tokio::test]
async fn test_get_web_app_without_identity() {
    let server = MockServer::start().await;
    let id = site_id(RESOURCE_GROUP, "web-02");

    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "name": "web-02",
            "type": WEB_APP_RESOURCE_TYPE
        })))
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    let app = clients
        .resources
        .get_web_app(&summary(id, "web-02", WEB_APP_RESOURCE_TYPE))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(app.principal_id, None);
}

#[tokio::test]
async fn test_list_resource_group_follows_next_link() {
    let server = MockServer::start().await;
    let group_path = format!("/subscriptions/sub-1/resourceGroups/{}/resources", RESOURCE_GROUP);
    let next_link = format!("{}{}?api-version=2021-04-01&$skiptoken=page2", server.uri(), group_path);

    Mock::given(method("GET"))
        .and(path(group_path.as_str()))
        .and(query_param_is_missing("$skiptoken"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                resource_json(&site_id(RESOURCE_GROUP, "web-01"), "web-01", WEB_APP_RESOURCE_TYPE),
                resource_json(&vault_id(RESOURCE_GROUP, "kv-other"), "kv-other", VAULT_RESOURCE_TYPE)
            ],
            "nextLink": next_link
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(group_path.as_str()))
        .and(query_param("$skiptoken", "page2"))
        .and(bearer())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                resource_json(&vault_id(RESOURCE_GROUP, "kv-app"), "kv-app", VAULT_RESOURCE_TYPE)
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    let resources = clients.resources.list_resource_group(RESOURCE_GROUP).await.unwrap().unwrap();

    let names: Vec<&str> = resources.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["web-01", "kv-other", "kv-app"]);
}

#[tokio::test]
async fn test_list_missing_resource_group_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/subscriptions/sub-1/resourceGroups/rg-gone/resources"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "ResourceGroupNotFound", "message": "Resource group 'rg-gone' could not be found." }
        })))
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    assert!(clients.resources.list_resource_group("rg-gone").await.unwrap().is_none());
}

#[tokio::test]
async fn test_get_vault_details_parses_access_policies() {
    let server = MockServer::start().await;
    let id = vault_id(RESOURCE_GROUP, "kv-app");

    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .and(query_param("api-version", "2022-07-01"))
        .and(bearer())
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(vault_json(&id, "kv-app", &["other-principal", PRINCIPAL])),
        )
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    let vault = clients
        .resources
        .get_vault_details(&summary(id, "kv-app", VAULT_RESOURCE_TYPE))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(vault.name, "kv-app");
    assert_eq!(vault.vault_uri.as_deref(), Some("https://kv-app.vault.azure.net/"));
    assert_eq!(vault.access_policies.len(), 2);
    assert!(vault.access_policies.iter().all(|p| p.vault_name == "kv-app"));
    assert!(vault.access_policies[1].applies_to(PRINCIPAL));
    assert_eq!(vault.access_policies[1].tenant_id.as_deref(), Some("tenant-1"));
}

#[tokio::test]
async fn test_rbac_vault_has_no_policies() {
    let server = MockServer::start().await;
    let id = vault_id(RESOURCE_GROUP, "kv-rbac");

    Mock::given(method("GET"))
        .and(path(id.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": id,
            "name": "kv-rbac",
            "properties": { "tenantId": "tenant-1", "enableRbacAuthorization": true }
        })))
        .mount(&server)
        .await;

    let clients = support::clients(&server);
    let vault = clients
        .resources
        .get_vault_details(&summary(id, "kv-rbac", VAULT_RESOURCE_TYPE))
        .await
        .unwrap()
        .unwrap();
    assert!(vault.access_policies.is_empty());
}

//! Integration tests for warden-graph against a live Neo4j instance.
//!
//! These tests require a reachable Neo4j (docker compose up).
//! Run with: cargo test --package warden-graph --test integration -- --ignored
//!
//! Skipped automatically if Neo4j is not available.

use chrono::{Duration, Utc};
use uuid::Uuid;

use warden_core::{
    AccessTokenType, ApiResource, Claim, Client, IdentityResource, PersistedGrant, Property, Scope,
    Secret,
};
use warden_graph::{ChildKind, GraphClient, GraphConfig, RootKind, StoreError};

async fn connect_or_skip() -> Option<GraphClient> {
    let config = GraphConfig::default();
    match GraphClient::connect(&config).await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test (Neo4j not available): {e}");
            None
        }
    }
}

fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Delete every node seeded under this test prefix, children included.
async fn cleanup(client: &GraphClient, prefix: &str) {
    let q = neo4rs::query(
        "MATCH (n)
         WHERE n.client_id STARTS WITH $p OR n.name STARTS WITH $p OR n.key STARTS WITH $p
         OPTIONAL MATCH (n)-[:HAS]->(c)
         DETACH DELETE c, n",
    )
    .param("p", prefix.to_string());
    let _ = client.run(q).await;
}

async fn count_label_prefix(client: &GraphClient, label: &str, prop: &str, prefix: &str) -> i64 {
    let q = neo4rs::query(&format!(
        "MATCH (n:{label}) WHERE n.{prop} STARTS WITH $p RETURN count(n) AS c"
    ))
    .param("p", prefix.to_string());
    let row = client.query_one(q).await.unwrap().unwrap();
    row.get::<i64>("c").unwrap()
}

fn make_client(client_id: &str) -> Client {
    Client {
        client_id: client_id.to_string(),
        client_name: "Console".to_string(),
        description: "integration test client".to_string(),
        allowed_grant_types: vec!["authorization_code".to_string()],
        redirect_uris: vec!["https://app.example/cb".to_string()],
        allowed_scopes: vec!["openid".to_string(), "api".to_string()],
        ..Client::default()
    }
}

fn make_property(name: &str, value: &str) -> Property {
    Property {
        name: name.to_string(),
        value: value.to_string(),
        ..Property::default()
    }
}

fn make_secret(description: &str) -> Secret {
    Secret {
        description: description.to_string(),
        value: "K7gNU3sdo+OL0wNhqoVWhr3g6s1xYv72ol/pe/Unols=".to_string(),
        ..Secret::default()
    }
}

fn make_claim(claim_type: &str, claim_value: &str) -> Claim {
    Claim {
        claim_type: claim_type.to_string(),
        claim_value: claim_value.to_string(),
        ..Claim::default()
    }
}

fn make_scope(name: &str) -> Scope {
    Scope {
        name: name.to_string(),
        display_name: name.to_string(),
        ..Scope::default()
    }
}

fn make_grant(key: &str, subject_id: &str, client_id: &str, grant_type: &str) -> PersistedGrant {
    PersistedGrant {
        key: key.to_string(),
        grant_type: grant_type.to_string(),
        subject_id: subject_id.to_string(),
        client_id: client_id.to_string(),
        expiration: Some(Utc::now() + Duration::hours(1)),
        data: r#"{"scopes":["openid","api"]}"#.to_string(),
        ..PersistedGrant::default()
    }
}

#[tokio::test]
#[ignore = "requires live Neo4j; run with: cargo test --package warden-graph --test integration -- --ignored"]
async fn test_create_and_load_client() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");
    cleanup(&client, &p).await;

    let mut app = make_client(&p);
    client.create_root(&mut app).await.unwrap();
    assert!(app.entity_id.is_some());

    client
        .set_children(
            RootKind::Client,
            &p,
            &[
                make_property(&format!("{p}-env"), "prod"),
                make_property(&format!("{p}-tier"), "gold"),
            ],
        )
        .await
        .unwrap();
    client
        .set_children(RootKind::Client, &p, &[make_secret(&format!("{p}-primary"))])
        .await
        .unwrap();
    client
        .set_children(
            RootKind::Client,
            &p,
            &[
                make_claim(&format!("{p}-role"), "admin"),
                make_claim(&format!("{p}-org"), "acme"),
            ],
        )
        .await
        .unwrap();

    let loaded = client.load_client(&p).await.unwrap().unwrap();
    assert_eq!(loaded.client_id, p);
    assert_eq!(loaded.client_name, "Console");
    assert_eq!(loaded.entity_id, app.entity_id);
    assert_eq!(loaded.allowed_scopes, vec!["openid", "api"]);
    assert_eq!(loaded.properties.len(), 2);
    assert_eq!(loaded.client_secrets.len(), 1);
    assert_eq!(loaded.claims.len(), 2);
    assert!(loaded.properties.iter().all(|c| c.entity_id.is_some()));

    cleanup(&client, &p).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_load_missing_client_is_none() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");

    assert!(client.load_client(&p).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_set_children_replaces_and_mints_new_ids() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");
    cleanup(&client, &p).await;

    let mut app = make_client(&p);
    client.create_root(&mut app).await.unwrap();

    let first = vec![
        make_property(&format!("{p}-b"), "1"),
        make_property(&format!("{p}-a"), "2"),
    ];
    client
        .set_children(RootKind::Client, &p, &first)
        .await
        .unwrap();
    let old_ids: Vec<i64> = client
        .load_client(&p)
        .await
        .unwrap()
        .unwrap()
        .properties
        .iter()
        .map(|c| c.entity_id.unwrap())
        .collect();
    assert_eq!(old_ids.len(), 2);

    // Replace, reusing one name. Every node is minted fresh.
    let second = vec![
        make_property(&format!("{p}-b"), "10"),
        make_property(&format!("{p}-c"), "20"),
        make_property(&format!("{p}-d"), "30"),
    ];
    let affected = client
        .set_children(RootKind::Client, &p, &second)
        .await
        .unwrap();
    assert_eq!(affected, 3);

    let reloaded = client.load_client(&p).await.unwrap().unwrap();
    assert_eq!(reloaded.properties.len(), 3);
    for child in &reloaded.properties {
        assert!(!old_ids.contains(&child.entity_id.unwrap()));
    }

    // Reload order is stable.
    let again = client.load_client(&p).await.unwrap().unwrap();
    let names_one: Vec<_> = reloaded.properties.iter().map(|c| &c.name).collect();
    let names_two: Vec<_> = again.properties.iter().map(|c| &c.name).collect();
    assert_eq!(names_one, names_two);

    cleanup(&client, &p).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_set_children_missing_root_is_zero() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");

    let affected = client
        .set_children(RootKind::Client, &p, &[make_property(&format!("{p}-x"), "1")])
        .await
        .unwrap();
    assert_eq!(affected, 0);
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_set_children_empty_rejected() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");
    cleanup(&client, &p).await;

    let mut app = make_client(&p);
    client.create_root(&mut app).await.unwrap();
    client
        .set_children(RootKind::Client, &p, &[make_property(&format!("{p}-env"), "prod")])
        .await
        .unwrap();

    let err = client
        .set_children::<Property>(RootKind::Client, &p, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));

    // The rejected call must not have touched the existing collection.
    let loaded = client.load_client(&p).await.unwrap().unwrap();
    assert_eq!(loaded.properties.len(), 1);

    cleanup(&client, &p).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_replace_child_preserves_entity_id() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");
    cleanup(&client, &p).await;

    let mut app = make_client(&p);
    client.create_root(&mut app).await.unwrap();
    client
        .set_children(RootKind::Client, &p, &[make_property(&format!("{p}-env"), "stage")])
        .await
        .unwrap();
    let before = client.load_client(&p).await.unwrap().unwrap();
    let old_id = before.properties[0].entity_id.unwrap();

    let affected = client
        .replace_child(RootKind::Client, &p, &make_property(&format!("{p}-env"), "prod"))
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let after = client.load_client(&p).await.unwrap().unwrap();
    assert_eq!(after.properties.len(), 1);
    assert_eq!(after.properties[0].value, "prod");
    assert_eq!(after.properties[0].entity_id, Some(old_id));

    cleanup(&client, &p).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_remove_child_removes_exactly_one() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");
    cleanup(&client, &p).await;

    let mut app = make_client(&p);
    client.create_root(&mut app).await.unwrap();
    client
        .set_children(
            RootKind::Client,
            &p,
            &[
                make_property(&format!("{p}-env"), "prod"),
                make_property(&format!("{p}-tier"), "gold"),
            ],
        )
        .await
        .unwrap();

    let before = client.load_client(&p).await.unwrap().unwrap();
    let sibling_id = before
        .properties
        .iter()
        .find(|c| c.name == format!("{p}-tier"))
        .unwrap()
        .entity_id;

    let affected = client
        .remove_child(RootKind::Client, &p, ChildKind::Property, &format!("{p}-env"))
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let loaded = client.load_client(&p).await.unwrap().unwrap();
    assert_eq!(loaded.properties.len(), 1);
    assert_eq!(loaded.properties[0].name, format!("{p}-tier"));
    assert_eq!(loaded.properties[0].entity_id, sibling_id);

    // Second removal of the same sub-key is a no-op.
    let again = client
        .remove_child(RootKind::Client, &p, ChildKind::Property, &format!("{p}-env"))
        .await
        .unwrap();
    assert_eq!(again, 0);

    cleanup(&client, &p).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_clear_children_scoped_to_label() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");
    cleanup(&client, &p).await;

    let mut app = make_client(&p);
    client.create_root(&mut app).await.unwrap();
    client
        .set_children(RootKind::Client, &p, &[make_property(&format!("{p}-env"), "prod")])
        .await
        .unwrap();
    client
        .set_children(
            RootKind::Client,
            &p,
            &[
                make_claim(&format!("{p}-role"), "admin"),
                make_claim(&format!("{p}-org"), "acme"),
            ],
        )
        .await
        .unwrap();

    let affected = client
        .clear_children(RootKind::Client, &p, ChildKind::Claim)
        .await
        .unwrap();
    assert_eq!(affected, 2);

    let loaded = client.load_client(&p).await.unwrap().unwrap();
    assert!(loaded.claims.is_empty());
    assert_eq!(loaded.properties.len(), 1);

    // Clearing an already-empty collection is fine.
    let again = client
        .clear_children(RootKind::Client, &p, ChildKind::Claim)
        .await
        .unwrap();
    assert_eq!(again, 0);

    cleanup(&client, &p).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_remove_root_cascades() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");
    cleanup(&client, &p).await;

    let mut app = make_client(&p);
    client.create_root(&mut app).await.unwrap();
    client
        .set_children(
            RootKind::Client,
            &p,
            &[
                make_property(&format!("{p}-env"), "prod"),
                make_property(&format!("{p}-tier"), "gold"),
            ],
        )
        .await
        .unwrap();

    let affected = client.remove_root(RootKind::Client, &p).await.unwrap();
    assert_eq!(affected, 1);

    assert!(client.load_client(&p).await.unwrap().is_none());
    // No orphaned children survive the cascade.
    assert_eq!(count_label_prefix(&client, "Property", "name", &p).await, 0);

    cleanup(&client, &p).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_update_missing_root_returns_zero() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");

    let app = make_client(&p);
    let affected = client.update_root(&app).await.unwrap();
    assert_eq!(affected, 0);
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_update_root_overwrites_scalars() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");
    cleanup(&client, &p).await;

    let mut app = make_client(&p);
    client.create_root(&mut app).await.unwrap();
    client
        .set_children(RootKind::Client, &p, &[make_property(&format!("{p}-env"), "prod")])
        .await
        .unwrap();

    app.client_name = "Console v2".to_string();
    app.access_token_lifetime = 600;
    app.access_token_type = AccessTokenType::Reference;
    app.allowed_scopes = vec!["openid".to_string()];
    let affected = client.update_root(&app).await.unwrap();
    assert_eq!(affected, 1);

    let loaded = client.load_client(&p).await.unwrap().unwrap();
    assert_eq!(loaded.client_name, "Console v2");
    assert_eq!(loaded.access_token_lifetime, 600);
    assert_eq!(loaded.access_token_type, AccessTokenType::Reference);
    assert_eq!(loaded.allowed_scopes, vec!["openid"]);
    assert_eq!(loaded.entity_id, app.entity_id);
    // Children are not touched by a scalar update.
    assert_eq!(loaded.properties.len(), 1);

    cleanup(&client, &p).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_grant_store_roundtrip() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");
    cleanup(&client, &p).await;

    let mut app = make_client(&p);
    client.create_root(&mut app).await.unwrap();

    let key = format!("{p}-grant");
    let grant = make_grant(&key, &format!("{p}-alice"), &p, "refresh_token");
    assert_eq!(client.store_grant(&grant).await.unwrap(), 1);

    let stored = client.get_grant(&key).await.unwrap().unwrap();
    assert_eq!(stored.subject_id, grant.subject_id);
    assert_eq!(stored.grant_type, "refresh_token");
    assert_eq!(stored.creation_time, grant.creation_time);
    assert_eq!(stored.expiration, grant.expiration);
    assert_eq!(stored.data, grant.data);
    let minted = stored.entity_id.unwrap();

    // Re-store under the same key: in-place update, same entity_id.
    let updated = PersistedGrant {
        data: r#"{"scopes":["openid"]}"#.to_string(),
        ..grant.clone()
    };
    assert_eq!(client.store_grant(&updated).await.unwrap(), 1);
    let restored = client.get_grant(&key).await.unwrap().unwrap();
    assert_eq!(restored.data, updated.data);
    assert_eq!(restored.entity_id, Some(minted));

    cleanup(&client, &p).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_store_grant_without_client_returns_zero() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");

    let key = format!("{p}-grant");
    let grant = make_grant(&key, &format!("{p}-alice"), &p, "refresh_token");
    assert_eq!(client.store_grant(&grant).await.unwrap(), 0);
    assert!(client.get_grant(&key).await.unwrap().is_none());
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_remove_grants_variants() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");
    cleanup(&client, &p).await;

    let client_a = format!("{p}-a");
    let client_b = format!("{p}-b");
    let subject = format!("{p}-alice");
    let mut app_a = make_client(&client_a);
    let mut app_b = make_client(&client_b);
    client.create_root(&mut app_a).await.unwrap();
    client.create_root(&mut app_b).await.unwrap();

    for (key, owner, kind) in [
        (format!("{p}-k1"), &client_a, "refresh_token"),
        (format!("{p}-k2"), &client_a, "authorization_code"),
        (format!("{p}-k3"), &client_b, "refresh_token"),
    ] {
        let grant = make_grant(&key, &subject, owner, kind);
        assert_eq!(client.store_grant(&grant).await.unwrap(), 1);
    }

    let all = client.grants_for_subject(&subject).await.unwrap();
    assert_eq!(all.len(), 3);
    let keys: Vec<_> = all.iter().map(|g| g.key.clone()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);

    // Typed removal only hits the matching grant type.
    assert_eq!(
        client
            .remove_grants_of_type(&subject, &client_a, "refresh_token")
            .await
            .unwrap(),
        1
    );
    assert_eq!(client.remove_grants(&subject, &client_a).await.unwrap(), 1);
    assert_eq!(client.remove_grants(&subject, &client_b).await.unwrap(), 1);
    assert!(client.grants_for_subject(&subject).await.unwrap().is_empty());

    // Targeted removal of a key that is already gone.
    assert_eq!(client.remove_grant(&format!("{p}-k1")).await.unwrap(), 0);

    cleanup(&client, &p).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_resource_finds() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");
    cleanup(&client, &p).await;

    let mut billing = ApiResource {
        name: format!("{p}-billing"),
        display_name: "Billing API".to_string(),
        ..ApiResource::default()
    };
    client.create_root(&mut billing).await.unwrap();
    client
        .set_children(
            RootKind::ApiResource,
            &billing.name,
            &[
                make_scope(&format!("{p}-read")),
                make_scope(&format!("{p}-write")),
            ],
        )
        .await
        .unwrap();
    client
        .set_children(
            RootKind::ApiResource,
            &billing.name,
            &[make_secret(&format!("{p}-introspection"))],
        )
        .await
        .unwrap();

    let mut audit = ApiResource {
        name: format!("{p}-audit"),
        ..ApiResource::default()
    };
    client.create_root(&mut audit).await.unwrap();
    client
        .set_children(
            RootKind::ApiResource,
            &audit.name,
            &[make_scope(&format!("{p}-admin"))],
        )
        .await
        .unwrap();

    for name in ["openid", "profile"] {
        let mut idr = IdentityResource {
            name: format!("{p}-{name}"),
            display_name: name.to_string(),
            ..IdentityResource::default()
        };
        client.create_root(&mut idr).await.unwrap();
    }

    // Scope-name hit loads the full aggregate.
    let hits = client
        .find_api_resources_by_scope(&[format!("{p}-read")])
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, billing.name);
    assert_eq!(hits[0].scopes.len(), 2);
    assert_eq!(hits[0].api_secrets.len(), 1);

    let misses = client
        .find_api_resources_by_scope(&[format!("{p}-none")])
        .await
        .unwrap();
    assert!(misses.is_empty());

    let idrs = client
        .find_identity_resources_by_scope(&[format!("{p}-openid")])
        .await
        .unwrap();
    assert_eq!(idrs.len(), 1);
    assert_eq!(idrs[0].display_name, "openid");

    // all_resources is store-wide; check ours are present and complete.
    let set = client.all_resources().await.unwrap();
    let mine_api: Vec<_> = set
        .api_resources
        .iter()
        .filter(|a| a.name.starts_with(&p))
        .collect();
    assert_eq!(mine_api.len(), 2);
    let mine_idr = set
        .identity_resources
        .iter()
        .filter(|i| i.name.starts_with(&p))
        .count();
    assert_eq!(mine_idr, 2);
    let audit_loaded = mine_api.iter().find(|a| a.name == audit.name).unwrap();
    assert!(audit_loaded.api_secrets.is_empty());
    assert_eq!(audit_loaded.scopes.len(), 1);

    cleanup(&client, &p).await;
}

#[tokio::test]
#[ignore = "requires live Neo4j"]
async fn test_cors_origin_check_is_case_insensitive() {
    let Some(client) = connect_or_skip().await else {
        return;
    };
    let p = unique("wg");
    cleanup(&client, &p).await;

    let mut app = make_client(&p);
    app.allowed_cors_origins = vec![format!("https://{p}.Example.com")];
    client.create_root(&mut app).await.unwrap();

    assert!(client
        .is_origin_allowed(&format!("https://{p}.example.COM"))
        .await
        .unwrap());
    assert!(!client
        .is_origin_allowed(&format!("https://{p}-other.example.com"))
        .await
        .unwrap());

    cleanup(&client, &p).await;
}

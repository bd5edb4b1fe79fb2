//! Aggregate loading: one round trip per root, children reassembled in place.
//!
//! Child collections are gathered one at a time, each list collapsed with
//! `collect` before the next `OPTIONAL MATCH` opens, so sibling collections
//! never multiply into a cross product. Children are ordered by graph id
//! before collecting, which keeps reloads deterministic.

use neo4rs::query;

use warden_core::{
    ApiResource, Claim, Client, IdentityResource, Property, ResourceSet, Scope, Secret,
};

use crate::client::{GraphClient, StoreError};
use crate::schema::{ChildKind, GraphChild, GraphRoot, RootKind, OWNS};

impl GraphClient {
    /// Load a client and all three of its child collections.
    pub async fn load_client(&self, client_id: &str) -> Result<Option<Client>, StoreError> {
        let row = self.load_row(RootKind::Client, client_id).await?;
        tracing::debug!(client_id = %client_id, found = row.is_some(), "Client lookup");
        match row {
            Some(row) => Ok(Some(client_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Load an api resource with its secrets and scopes.
    pub async fn load_api_resource(&self, name: &str) -> Result<Option<ApiResource>, StoreError> {
        let row = self.load_row(RootKind::ApiResource, name).await?;
        tracing::debug!(name = %name, found = row.is_some(), "Api resource lookup");
        match row {
            Some(row) => Ok(Some(api_resource_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Load an identity resource. Identity resources carry no child nodes.
    pub async fn load_identity_resource(
        &self,
        name: &str,
    ) -> Result<Option<IdentityResource>, StoreError> {
        let row = self.load_row(RootKind::IdentityResource, name).await?;
        tracing::debug!(name = %name, found = row.is_some(), "Identity resource lookup");
        match row {
            Some(row) => Ok(Some(IdentityResource::hydrate(&root_node(&row)?))),
            None => Ok(None),
        }
    }

    /// Api resources owning at least one scope whose name is in `scope_names`,
    /// loaded complete with children.
    pub async fn find_api_resources_by_scope(
        &self,
        scope_names: &[String],
    ) -> Result<Vec<ApiResource>, StoreError> {
        let kind = RootKind::ApiResource;
        let cypher = format!(
            "MATCH (n:{label})\n{collects}WHERE ANY(x IN {scps} WHERE x.{name_prop} IN $scope_names)\nRETURN {columns}\nORDER BY id(n)",
            label = kind.label(),
            collects = collect_fragment(kind),
            scps = ChildKind::Scope.collected_alias(),
            name_prop = ChildKind::Scope.sub_key_prop(),
            columns = return_columns(kind),
        );
        let rows = self
            .query_rows(query(&cypher).param("scope_names", scope_names.to_vec()))
            .await?;
        let mut found = Vec::with_capacity(rows.len());
        for row in &rows {
            found.push(api_resource_from_row(row)?);
        }
        tracing::debug!(
            requested = scope_names.len(),
            found = found.len(),
            "Api resources by scope"
        );
        Ok(found)
    }

    /// Identity resources whose own name is in `scope_names`.
    pub async fn find_identity_resources_by_scope(
        &self,
        scope_names: &[String],
    ) -> Result<Vec<IdentityResource>, StoreError> {
        let kind = RootKind::IdentityResource;
        let cypher = format!(
            "MATCH (n:{label}) WHERE n.{key_prop} IN $scope_names RETURN n ORDER BY id(n)",
            label = kind.label(),
            key_prop = kind.key_prop(),
        );
        let rows = self
            .query_rows(query(&cypher).param("scope_names", scope_names.to_vec()))
            .await?;
        let mut found = Vec::with_capacity(rows.len());
        for row in &rows {
            found.push(IdentityResource::hydrate(&root_node(row)?));
        }
        tracing::debug!(
            requested = scope_names.len(),
            found = found.len(),
            "Identity resources by scope"
        );
        Ok(found)
    }

    /// Every api resource (complete with children) plus every identity
    /// resource known to the store.
    pub async fn all_resources(&self) -> Result<ResourceSet, StoreError> {
        let api_resources = self.all_api_resources().await?;
        let identity_resources = self.all_identity_resources().await?;
        tracing::debug!(
            api = api_resources.len(),
            identity = identity_resources.len(),
            "Loaded all resources"
        );
        Ok(ResourceSet {
            api_resources,
            identity_resources,
        })
    }

    /// Case-insensitive membership of `origin` across every client's
    /// `allowed_cors_origins` list.
    pub async fn is_origin_allowed(&self, origin: &str) -> Result<bool, StoreError> {
        let cypher = format!(
            "MATCH (n:{label})\nUNWIND coalesce(n.allowed_cors_origins, []) AS origin\nWITH origin\nWHERE toLower(origin) = toLower($origin)\nRETURN count(origin) > 0 AS allowed",
            label = RootKind::Client.label(),
        );
        let row = self
            .query_one(query(&cypher).param("origin", origin.to_string()))
            .await?
            .ok_or_else(|| StoreError::Decode("no row from origin check".to_string()))?;
        let allowed = row
            .get("allowed")
            .map_err(|e| StoreError::Decode(format!("allowed column missing: {e}")))?;
        tracing::debug!(origin = %origin, allowed, "Checked CORS origin");
        Ok(allowed)
    }

    async fn load_row(
        &self,
        kind: RootKind,
        key: &str,
    ) -> Result<Option<neo4rs::Row>, StoreError> {
        let cypher = format!(
            "MATCH (n:{label} {{{key_prop}: $root_key}})\n{collects}RETURN {columns}",
            label = kind.label(),
            key_prop = kind.key_prop(),
            collects = collect_fragment(kind),
            columns = return_columns(kind),
        );
        self.query_one(query(&cypher).param("root_key", key.to_string()))
            .await
    }

    async fn all_api_resources(&self) -> Result<Vec<ApiResource>, StoreError> {
        let kind = RootKind::ApiResource;
        let cypher = format!(
            "MATCH (n:{label})\n{collects}RETURN {columns}\nORDER BY id(n)",
            label = kind.label(),
            collects = collect_fragment(kind),
            columns = return_columns(kind),
        );
        let rows = self.query_rows(query(&cypher)).await?;
        let mut found = Vec::with_capacity(rows.len());
        for row in &rows {
            found.push(api_resource_from_row(row)?);
        }
        Ok(found)
    }

    async fn all_identity_resources(&self) -> Result<Vec<IdentityResource>, StoreError> {
        let kind = RootKind::IdentityResource;
        let cypher = format!(
            "MATCH (n:{label}) RETURN n ORDER BY id(n)",
            label = kind.label(),
        );
        let rows = self.query_rows(query(&cypher)).await?;
        let mut found = Vec::with_capacity(rows.len());
        for row in &rows {
            found.push(IdentityResource::hydrate(&root_node(row)?));
        }
        Ok(found)
    }
}

// ── Row Assembly ──────────────────────────────────────────────────

fn client_from_row(row: &neo4rs::Row) -> Result<Client, StoreError> {
    let node = root_node(row)?;
    let mut client = Client::hydrate(&node);
    client.properties = child_list::<Property>(row)?;
    client.client_secrets = child_list::<Secret>(row)?;
    client.claims = child_list::<Claim>(row)?;
    Ok(client)
}

fn api_resource_from_row(row: &neo4rs::Row) -> Result<ApiResource, StoreError> {
    let node = root_node(row)?;
    let mut api = ApiResource::hydrate(&node);
    api.api_secrets = child_list::<Secret>(row)?;
    api.scopes = child_list::<Scope>(row)?;
    Ok(api)
}

fn root_node(row: &neo4rs::Row) -> Result<neo4rs::Node, StoreError> {
    row.get("n")
        .map_err(|e| StoreError::Decode(format!("root node column missing: {e}")))
}

fn child_list<C: GraphChild>(row: &neo4rs::Row) -> Result<Vec<C>, StoreError> {
    let col = C::KIND.collected_alias();
    let nodes: Vec<neo4rs::Node> = row
        .get(col)
        .map_err(|e| StoreError::Decode(format!("child list {col} missing: {e}")))?;
    Ok(nodes.iter().map(C::hydrate).collect())
}

/// One `OPTIONAL MATCH` + ordered `collect` block per declared child kind.
fn collect_fragment(kind: RootKind) -> String {
    let mut carried = String::from("n");
    let mut text = String::new();
    for child in kind.child_kinds() {
        let alias = child.alias();
        let list = child.collected_alias();
        text.push_str(&format!(
            "OPTIONAL MATCH (n)-[:{OWNS}]->({alias}:{label})\nWITH {carried}, {alias} ORDER BY id({alias})\nWITH {carried}, collect(DISTINCT {alias}) AS {list}\n",
            label = child.label(),
        ));
        carried.push_str(", ");
        carried.push_str(list);
    }
    text
}

fn return_columns(kind: RootKind) -> String {
    let mut cols = String::from("n");
    for child in kind.child_kinds() {
        cols.push_str(", ");
        cols.push_str(child.collected_alias());
    }
    cols
}

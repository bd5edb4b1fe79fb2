//! Persisted grant store: upsert by key, lookups, and targeted removal.
//!
//! Grants hang off their owning client via `HAS`, but subject and client
//! identifiers are also kept as node properties, and removal matches on
//! those properties alone. A grant whose client has since been deleted is
//! still found and removed.

use neo4rs::query;

use warden_core::PersistedGrant;

use crate::client::{GraphClient, StoreError};
use crate::schema::{bind_all, set_clause, GraphRoot, RootKind, OWNS};

impl GraphClient {
    /// Merge-or-create a grant under its owning client.
    ///
    /// On first store the grant node is created and gets an `entity_id`; on
    /// re-store the scalars are overwritten in place and the `entity_id`
    /// survives. Returns the number of grants written. 0 means the owning
    /// client does not exist; that is logged as a warning, not an error.
    pub async fn store_grant(&self, grant: &PersistedGrant) -> Result<u64, StoreError> {
        if grant.key.is_empty() {
            return Err(StoreError::Validation(
                "persisted grant key must not be empty".to_string(),
            ));
        }
        if grant.client_id.is_empty() {
            return Err(StoreError::Validation(
                "persisted grant client_id must not be empty".to_string(),
            ));
        }

        let props = grant.props();
        let cypher = format!(
            "MATCH (c:{client_label} {{{client_key}: $client_id}})\nMERGE (c)-[:{OWNS}]->(g:{label} {{{key_prop}: $key}})\nON CREATE SET {set}, g.entity_id = id(g)\nON MATCH SET {set}\nRETURN count(g) AS affected",
            client_label = RootKind::Client.label(),
            client_key = RootKind::Client.key_prop(),
            label = RootKind::PersistedGrant.label(),
            key_prop = RootKind::PersistedGrant.key_prop(),
            set = set_clause("g", &props),
        );

        let affected = self.execute_count(bind_all(query(&cypher), props)).await?;
        if affected == 0 {
            tracing::warn!(
                key = %grant.key,
                client_id = %grant.client_id,
                "No grant stored; owning client not found"
            );
        }
        Ok(affected)
    }

    /// Grant by key, children-free by construction.
    pub async fn get_grant(&self, key: &str) -> Result<Option<PersistedGrant>, StoreError> {
        let cypher = format!(
            "MATCH (g:{label} {{{key_prop}: $key}}) RETURN g",
            label = RootKind::PersistedGrant.label(),
            key_prop = RootKind::PersistedGrant.key_prop(),
        );
        let row = self
            .query_one(query(&cypher).param("key", key.to_string()))
            .await?;
        tracing::debug!(key = %key, found = row.is_some(), "Grant lookup");
        match row {
            Some(row) => Ok(Some(PersistedGrant::hydrate(&grant_node(&row)?))),
            None => Ok(None),
        }
    }

    /// Every grant issued to a subject, ordered by key.
    pub async fn grants_for_subject(
        &self,
        subject_id: &str,
    ) -> Result<Vec<PersistedGrant>, StoreError> {
        let cypher = format!(
            "MATCH (g:{label} {{subject_id: $subject_id}}) RETURN g ORDER BY g.{key_prop}",
            label = RootKind::PersistedGrant.label(),
            key_prop = RootKind::PersistedGrant.key_prop(),
        );
        let rows = self
            .query_rows(query(&cypher).param("subject_id", subject_id.to_string()))
            .await?;
        let mut grants = Vec::with_capacity(rows.len());
        for row in &rows {
            grants.push(PersistedGrant::hydrate(&grant_node(row)?));
        }
        tracing::debug!(subject_id = %subject_id, found = grants.len(), "Grants for subject");
        Ok(grants)
    }

    /// Delete the grant with this key. Returns the number removed.
    pub async fn remove_grant(&self, key: &str) -> Result<u64, StoreError> {
        let cypher = format!(
            "MATCH (g:{label} {{{key_prop}: $key}}) DETACH DELETE g RETURN count(g) AS affected",
            label = RootKind::PersistedGrant.label(),
            key_prop = RootKind::PersistedGrant.key_prop(),
        );
        let affected = self
            .execute_count(query(&cypher).param("key", key.to_string()))
            .await?;
        if affected == 0 {
            tracing::debug!(key = %key, "No grant removed");
        }
        Ok(affected)
    }

    /// Delete every grant issued to a subject through a client.
    pub async fn remove_grants(
        &self,
        subject_id: &str,
        client_id: &str,
    ) -> Result<u64, StoreError> {
        let cypher = format!(
            "MATCH (g:{label} {{subject_id: $subject_id, client_id: $client_id}})\nDETACH DELETE g\nRETURN count(g) AS affected",
            label = RootKind::PersistedGrant.label(),
        );
        let affected = self
            .execute_count(
                query(&cypher)
                    .param("subject_id", subject_id.to_string())
                    .param("client_id", client_id.to_string()),
            )
            .await?;
        tracing::debug!(
            subject_id = %subject_id,
            client_id = %client_id,
            affected,
            "Removed grants for subject and client"
        );
        Ok(affected)
    }

    /// Delete every grant of one type issued to a subject through a client.
    pub async fn remove_grants_of_type(
        &self,
        subject_id: &str,
        client_id: &str,
        grant_type: &str,
    ) -> Result<u64, StoreError> {
        let cypher = format!(
            "MATCH (g:{label} {{subject_id: $subject_id, client_id: $client_id, grant_type: $grant_type}})\nDETACH DELETE g\nRETURN count(g) AS affected",
            label = RootKind::PersistedGrant.label(),
        );
        let affected = self
            .execute_count(
                query(&cypher)
                    .param("subject_id", subject_id.to_string())
                    .param("client_id", client_id.to_string())
                    .param("grant_type", grant_type.to_string()),
            )
            .await?;
        tracing::debug!(
            subject_id = %subject_id,
            client_id = %client_id,
            grant_type = %grant_type,
            affected,
            "Removed grants of type"
        );
        Ok(affected)
    }
}

fn grant_node(row: &neo4rs::Row) -> Result<neo4rs::Node, StoreError> {
    row.get("g")
        .map_err(|e| StoreError::Decode(format!("grant node column missing: {e}")))
}

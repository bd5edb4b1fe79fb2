//! Aggregate-root lifecycle: create, update, remove.
//!
//! Roots are created without children; collections are managed separately
//! by the synchronizer in [`crate::sync`]. Mutations against a missing root
//! return 0 instead of failing.

use neo4rs::query;

use crate::client::{GraphClient, StoreError};
use crate::schema::{bind_all, set_clause, GraphRoot, RootKind, OWNS};

impl GraphClient {
    /// Create a root node with every scalar property of its projection plus
    /// a store-assigned `entity_id`, which is written back into `root`.
    ///
    /// Child collections carried on the value are ignored here.
    pub async fn create_root<R: GraphRoot>(&self, root: &mut R) -> Result<(), StoreError> {
        if root.key().is_empty() {
            return Err(StoreError::Validation(format!(
                "{} {} must not be empty",
                R::KIND.label(),
                R::KIND.key_prop()
            )));
        }

        let label = R::KIND.label();
        let props = root.props();
        let cypher = format!(
            "CREATE (n:{label})
             SET {set}, n.entity_id = id(n)
             RETURN n.entity_id AS entity_id",
            set = set_clause("n", &props),
        );

        let q = bind_all(query(&cypher), props);
        match self.query_one(q).await? {
            Some(row) => {
                let id = row.get::<i64>("entity_id").map_err(|e| {
                    StoreError::Decode(format!("entity_id missing after creating {label}: {e}"))
                })?;
                root.assign_entity_id(id);
                tracing::debug!(label, entity_id = id, "Created root node");
                Ok(())
            }
            None => Err(StoreError::Decode(format!(
                "no row returned creating {label}"
            ))),
        }
    }

    /// Overwrite the scalar properties of the root matched by natural key.
    ///
    /// Returns the number of roots updated; 0 means no such root exists and
    /// nothing changed. `entity_id` and child collections are untouched.
    pub async fn update_root<R: GraphRoot>(&self, root: &R) -> Result<u64, StoreError> {
        if root.key().is_empty() {
            return Err(StoreError::Validation(format!(
                "{} {} must not be empty",
                R::KIND.label(),
                R::KIND.key_prop()
            )));
        }

        let label = R::KIND.label();
        let key_prop = R::KIND.key_prop();
        let props = root.props();
        let cypher = format!(
            "MATCH (n:{label} {{{key_prop}: $root_key}})
             SET {set}
             RETURN count(n) AS affected",
            set = set_clause("n", &props),
        );

        let q = bind_all(
            query(&cypher).param("root_key", root.key().to_string()),
            props,
        );
        self.execute_count(q).await
    }

    /// Remove the root and every directly owned child node in one statement.
    ///
    /// Returns the number of roots removed (0 or 1 for a unique key);
    /// 0 means no such root exists.
    pub async fn remove_root(&self, kind: RootKind, key: &str) -> Result<u64, StoreError> {
        if key.is_empty() {
            return Err(StoreError::Validation(format!(
                "{} {} must not be empty",
                kind.label(),
                kind.key_prop()
            )));
        }

        let label = kind.label();
        let key_prop = kind.key_prop();
        let cypher = format!(
            "MATCH (n:{label} {{{key_prop}: $root_key}})
             OPTIONAL MATCH (n)-[:{OWNS}]->(c)
             DETACH DELETE c, n
             RETURN count(DISTINCT n) AS affected"
        );

        let q = query(&cypher).param("root_key", key.to_string());
        let affected = self.execute_count(q).await?;
        tracing::debug!(label, key = %key, affected, "Removed root with children");
        Ok(affected)
    }
}

//! Collection synchronization for owned child nodes.
//!
//! Each operation here is a single transactional unit: a concurrent reader
//! observes either the previous collection or the new one, never a mix.
//! Writers against the same collection are not fenced against each other,
//! though; concurrent replacements race at the transaction level and the
//! last commit wins. Counts of touched children are returned; 0 means the
//! target was missing and nothing changed.

use neo4rs::query;

use crate::client::{GraphClient, StoreError};
use crate::schema::{bind_all, set_clause, ChildKind, GraphChild, RootKind, OWNS};

impl GraphClient {
    /// Replace the root's whole `C`-collection with `items`.
    ///
    /// Replacement is by discard: the previous child nodes are deleted and
    /// every item gets a freshly created node with a new `entity_id`, even
    /// items identical to the old state. An empty `items` is rejected; use
    /// [`clear_children`](Self::clear_children) to empty a collection.
    ///
    /// Returns the number of children created (0 when the root is missing).
    pub async fn set_children<C: GraphChild>(
        &self,
        root: RootKind,
        root_key: &str,
        items: &[C],
    ) -> Result<u64, StoreError> {
        require_key(root, root_key)?;
        if items.is_empty() {
            return Err(StoreError::Validation(
                "no items to set; use clear_children to empty a collection".to_string(),
            ));
        }

        let root_label = root.label();
        let key_prop = root.key_prop();
        let child_label = C::KIND.label();

        let mut txn = self.start_txn().await?;

        // Snapshot the graph ids of the children being replaced.
        let snapshot = format!(
            "MATCH (n:{root_label} {{{key_prop}: $root_key}})
             OPTIONAL MATCH (n)-[:{OWNS}]->(p:{child_label})
             RETURN count(DISTINCT n) AS roots, collect(id(p)) AS old_ids"
        );
        let mut stream = txn
            .execute(query(&snapshot).param("root_key", root_key.to_string()))
            .await?;
        let row = stream
            .next(txn.handle())
            .await?
            .ok_or_else(|| StoreError::Decode("no row from children snapshot".to_string()))?;
        let roots: i64 = row.get("roots").unwrap_or(0);
        let old_ids: Vec<i64> = row.get("old_ids").unwrap_or_default();

        if roots == 0 {
            txn.rollback().await?;
            tracing::debug!(root = root_label, key = %root_key, "Root not found, no children set");
            return Ok(0);
        }

        // Prop names are fixed per child type; build the SET fragment once.
        let create = format!(
            "MATCH (n:{root_label} {{{key_prop}: $root_key}})
             CREATE (n)-[:{OWNS}]->(q:{child_label})
             SET {set}, q.entity_id = id(q)",
            set = set_clause("q", &items[0].props()),
        );
        for item in items {
            let q = bind_all(
                query(&create).param("root_key", root_key.to_string()),
                item.props(),
            );
            txn.run(q).await?;
        }

        if !old_ids.is_empty() {
            let discard =
                format!("MATCH (p:{child_label}) WHERE id(p) IN $old_ids DETACH DELETE p");
            txn.run(query(&discard).param("old_ids", old_ids)).await?;
        }

        txn.commit().await?;
        tracing::debug!(
            root = root_label,
            child = child_label,
            key = %root_key,
            created = items.len(),
            "Replaced child collection"
        );
        Ok(items.len() as u64)
    }

    /// Overwrite the scalar properties of the one child matched by sub-key,
    /// keeping its `entity_id`.
    ///
    /// Returns the number of children patched; 0 means no such root or no
    /// such child, and nothing changed.
    pub async fn replace_child<C: GraphChild>(
        &self,
        root: RootKind,
        root_key: &str,
        item: &C,
    ) -> Result<u64, StoreError> {
        require_key(root, root_key)?;
        require_sub_key(C::KIND, item.sub_key())?;

        let root_label = root.label();
        let key_prop = root.key_prop();
        let child_label = C::KIND.label();
        let sub_key_prop = C::KIND.sub_key_prop();

        let props = item.props();
        let cypher = format!(
            "MATCH (n:{root_label} {{{key_prop}: $root_key}})\
             -[:{OWNS}]->\
             (p:{child_label} {{{sub_key_prop}: $sub_key}})
             SET {set}
             RETURN count(p) AS affected",
            set = set_clause("p", &props),
        );

        let q = bind_all(
            query(&cypher)
                .param("root_key", root_key.to_string())
                .param("sub_key", item.sub_key().to_string()),
            props,
        );
        self.execute_count(q).await
    }

    /// Delete exactly the child matched by sub-key.
    ///
    /// Returns the number of children removed; 0 means no match.
    pub async fn remove_child(
        &self,
        root: RootKind,
        root_key: &str,
        child: ChildKind,
        sub_key: &str,
    ) -> Result<u64, StoreError> {
        require_key(root, root_key)?;
        require_sub_key(child, sub_key)?;

        let root_label = root.label();
        let key_prop = root.key_prop();
        let child_label = child.label();
        let sub_key_prop = child.sub_key_prop();

        let cypher = format!(
            "MATCH (n:{root_label} {{{key_prop}: $root_key}})\
             -[:{OWNS}]->\
             (p:{child_label} {{{sub_key_prop}: $sub_key}})
             DETACH DELETE p
             RETURN count(p) AS affected"
        );

        let q = query(&cypher)
            .param("root_key", root_key.to_string())
            .param("sub_key", sub_key.to_string());
        self.execute_count(q).await
    }

    /// Delete every `child`-labeled node under the root.
    ///
    /// Unlike [`set_children`](Self::set_children) an already-empty
    /// collection is fine. Returns the number of children removed.
    pub async fn clear_children(
        &self,
        root: RootKind,
        root_key: &str,
        child: ChildKind,
    ) -> Result<u64, StoreError> {
        require_key(root, root_key)?;

        let root_label = root.label();
        let key_prop = root.key_prop();
        let child_label = child.label();

        let cypher = format!(
            "MATCH (n:{root_label} {{{key_prop}: $root_key}})\
             -[:{OWNS}]->\
             (p:{child_label})
             DETACH DELETE p
             RETURN count(p) AS affected"
        );

        let q = query(&cypher).param("root_key", root_key.to_string());
        self.execute_count(q).await
    }
}

fn require_key(root: RootKind, key: &str) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::Validation(format!(
            "{} {} must not be empty",
            root.label(),
            root.key_prop()
        )));
    }
    Ok(())
}

fn require_sub_key(child: ChildKind, sub_key: &str) -> Result<(), StoreError> {
    if sub_key.is_empty() {
        return Err(StoreError::Validation(format!(
            "{} {} must not be empty",
            child.label(),
            child.sub_key_prop()
        )));
    }
    Ok(())
}

//! Schema registry: node labels, natural keys, and property projections.
//!
//! Every label or relationship fragment spliced into Cypher text comes from
//! the static tables below. Caller-supplied data only ever travels through
//! query parameters.

use chrono::{DateTime, Utc};
use neo4rs::Query;

use warden_core::{
    AccessTokenType, ApiResource, Claim, Client, IdentityResource, PersistedGrant, Property, Scope,
    Secret,
};

/// Relationship type linking a root aggregate to its owned children.
pub const OWNS: &str = "HAS";

// ── Kinds ─────────────────────────────────────────────────────────

/// Root aggregate kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Client,
    ApiResource,
    IdentityResource,
    PersistedGrant,
}

impl RootKind {
    /// Node label for this root.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Client => "Client",
            Self::ApiResource => "ApiResource",
            Self::IdentityResource => "IdentityResource",
            Self::PersistedGrant => "PersistedGrant",
        }
    }

    /// Natural-key property name.
    pub fn key_prop(&self) -> &'static str {
        match self {
            Self::Client => "client_id",
            Self::ApiResource => "name",
            Self::IdentityResource => "name",
            Self::PersistedGrant => "key",
        }
    }

    /// Child collections declared for this root, in load order.
    pub fn child_kinds(&self) -> &'static [ChildKind] {
        match self {
            Self::Client => &[ChildKind::Property, ChildKind::Secret, ChildKind::Claim],
            Self::ApiResource => &[ChildKind::Secret, ChildKind::Scope],
            Self::IdentityResource => &[],
            Self::PersistedGrant => &[],
        }
    }
}

/// Child entity kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    Property,
    Secret,
    Claim,
    Scope,
}

impl ChildKind {
    /// Node label for this child.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Property => "Property",
            Self::Secret => "Secret",
            Self::Claim => "Claim",
            Self::Scope => "Scope",
        }
    }

    /// Property identifying a child within its owner's collection.
    pub fn sub_key_prop(&self) -> &'static str {
        match self {
            Self::Property => "name",
            Self::Secret => "description",
            Self::Claim => "claim_type",
            Self::Scope => "name",
        }
    }

    /// Cypher variable used for this child in multi-collection loads.
    pub fn alias(&self) -> &'static str {
        match self {
            Self::Property => "prop",
            Self::Secret => "sec",
            Self::Claim => "clm",
            Self::Scope => "scp",
        }
    }

    /// Column name of the collected child list in load queries.
    pub fn collected_alias(&self) -> &'static str {
        match self {
            Self::Property => "props",
            Self::Secret => "secs",
            Self::Claim => "clms",
            Self::Scope => "scps",
        }
    }
}

// ── Property Values ───────────────────────────────────────────────

/// Scalar property kinds persisted on warden nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(String),
    Int(i64),
    Bool(bool),
    StrList(Vec<String>),
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Vec<String>> for PropValue {
    fn from(v: Vec<String>) -> Self {
        Self::StrList(v)
    }
}

/// Attach one property value to a query under the given parameter name.
pub fn bind(q: Query, key: &str, value: PropValue) -> Query {
    match value {
        PropValue::Str(v) => q.param(key, v),
        PropValue::Int(v) => q.param(key, v),
        PropValue::Bool(v) => q.param(key, v),
        PropValue::StrList(v) => q.param(key, v),
    }
}

/// Attach a whole projection to a query, one parameter per property.
pub fn bind_all(mut q: Query, props: Vec<(&'static str, PropValue)>) -> Query {
    for (name, value) in props {
        q = bind(q, name, value);
    }
    q
}

/// Build a `var.a = $a, var.b = $b, ...` fragment for a projection.
pub fn set_clause(var: &str, props: &[(&'static str, PropValue)]) -> String {
    props
        .iter()
        .map(|(name, _)| format!("{var}.{name} = ${name}"))
        .collect::<Vec<_>>()
        .join(", ")
}

// ── Timestamps ────────────────────────────────────────────────────

/// RFC 3339 rendering for node properties.
pub fn datetime_string(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// RFC 3339 rendering; `None` is stored as an empty string.
pub fn opt_datetime_string(dt: Option<DateTime<Utc>>) -> String {
    dt.map(datetime_string).unwrap_or_default()
}

/// Parse an RFC 3339 node property. Empty or malformed strings become `None`.
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

// ── Projections ───────────────────────────────────────────────────

/// A root aggregate persisted as a single labeled node.
///
/// `props` lists exactly the scalar properties written to the node.
/// Collection-backed fields are excluded (children are separate nodes), and
/// so is `entity_id` (store-assigned once at creation, never overwritten).
pub trait GraphRoot: Sized {
    const KIND: RootKind;

    /// Natural-key value.
    fn key(&self) -> &str;

    /// Scalar property projection, one parameter per entry.
    fn props(&self) -> Vec<(&'static str, PropValue)>;

    /// Record the store-assigned graph id after creation.
    fn assign_entity_id(&mut self, id: i64);

    /// Rebuild from a node. Collection fields are left empty; the loader
    /// fills them from the child nodes.
    fn hydrate(node: &neo4rs::Node) -> Self;
}

/// A child entity persisted under a root via the `HAS` relationship.
pub trait GraphChild: Sized {
    const KIND: ChildKind;

    /// Value of the property identifying this child in its collection.
    fn sub_key(&self) -> &str;

    /// Scalar property projection, one parameter per entry.
    fn props(&self) -> Vec<(&'static str, PropValue)>;

    /// Rebuild from a node.
    fn hydrate(node: &neo4rs::Node) -> Self;
}

impl GraphRoot for Client {
    const KIND: RootKind = RootKind::Client;

    fn key(&self) -> &str {
        &self.client_id
    }

    fn props(&self) -> Vec<(&'static str, PropValue)> {
        vec![
            ("client_id", self.client_id.clone().into()),
            ("client_name", self.client_name.clone().into()),
            ("description", self.description.clone().into()),
            ("enabled", self.enabled.into()),
            ("require_client_secret", self.require_client_secret.into()),
            ("require_consent", self.require_consent.into()),
            ("allow_offline_access", self.allow_offline_access.into()),
            ("allowed_grant_types", self.allowed_grant_types.clone().into()),
            ("redirect_uris", self.redirect_uris.clone().into()),
            (
                "post_logout_redirect_uris",
                self.post_logout_redirect_uris.clone().into(),
            ),
            ("allowed_scopes", self.allowed_scopes.clone().into()),
            (
                "allowed_cors_origins",
                self.allowed_cors_origins.clone().into(),
            ),
            ("access_token_lifetime", self.access_token_lifetime.into()),
            (
                "identity_token_lifetime",
                self.identity_token_lifetime.into(),
            ),
            ("access_token_type", self.access_token_type.as_str().into()),
        ]
    }

    fn assign_entity_id(&mut self, id: i64) {
        self.entity_id = Some(id);
    }

    fn hydrate(node: &neo4rs::Node) -> Self {
        Self {
            entity_id: node.get::<i64>("entity_id").ok(),
            client_id: node.get("client_id").unwrap_or_default(),
            client_name: node.get("client_name").unwrap_or_default(),
            description: node.get("description").unwrap_or_default(),
            enabled: node.get("enabled").unwrap_or_default(),
            require_client_secret: node.get("require_client_secret").unwrap_or_default(),
            require_consent: node.get("require_consent").unwrap_or_default(),
            allow_offline_access: node.get("allow_offline_access").unwrap_or_default(),
            allowed_grant_types: node.get("allowed_grant_types").unwrap_or_default(),
            redirect_uris: node.get("redirect_uris").unwrap_or_default(),
            post_logout_redirect_uris: node.get("post_logout_redirect_uris").unwrap_or_default(),
            allowed_scopes: node.get("allowed_scopes").unwrap_or_default(),
            allowed_cors_origins: node.get("allowed_cors_origins").unwrap_or_default(),
            access_token_lifetime: node.get("access_token_lifetime").unwrap_or_default(),
            identity_token_lifetime: node.get("identity_token_lifetime").unwrap_or_default(),
            access_token_type: node
                .get::<String>("access_token_type")
                .ok()
                .and_then(|s| AccessTokenType::parse(&s))
                .unwrap_or_default(),
            properties: Vec::new(),
            claims: Vec::new(),
            client_secrets: Vec::new(),
        }
    }
}

impl GraphRoot for ApiResource {
    const KIND: RootKind = RootKind::ApiResource;

    fn key(&self) -> &str {
        &self.name
    }

    fn props(&self) -> Vec<(&'static str, PropValue)> {
        vec![
            ("name", self.name.clone().into()),
            ("display_name", self.display_name.clone().into()),
            ("description", self.description.clone().into()),
            ("enabled", self.enabled.into()),
            ("user_claims", self.user_claims.clone().into()),
        ]
    }

    fn assign_entity_id(&mut self, id: i64) {
        self.entity_id = Some(id);
    }

    fn hydrate(node: &neo4rs::Node) -> Self {
        Self {
            entity_id: node.get::<i64>("entity_id").ok(),
            name: node.get("name").unwrap_or_default(),
            display_name: node.get("display_name").unwrap_or_default(),
            description: node.get("description").unwrap_or_default(),
            enabled: node.get("enabled").unwrap_or_default(),
            user_claims: node.get("user_claims").unwrap_or_default(),
            api_secrets: Vec::new(),
            scopes: Vec::new(),
        }
    }
}

impl GraphRoot for IdentityResource {
    const KIND: RootKind = RootKind::IdentityResource;

    fn key(&self) -> &str {
        &self.name
    }

    fn props(&self) -> Vec<(&'static str, PropValue)> {
        vec![
            ("name", self.name.clone().into()),
            ("display_name", self.display_name.clone().into()),
            ("description", self.description.clone().into()),
            ("enabled", self.enabled.into()),
            ("required", self.required.into()),
            ("emphasize", self.emphasize.into()),
            (
                "show_in_discovery_document",
                self.show_in_discovery_document.into(),
            ),
            ("user_claims", self.user_claims.clone().into()),
        ]
    }

    fn assign_entity_id(&mut self, id: i64) {
        self.entity_id = Some(id);
    }

    fn hydrate(node: &neo4rs::Node) -> Self {
        Self {
            entity_id: node.get::<i64>("entity_id").ok(),
            name: node.get("name").unwrap_or_default(),
            display_name: node.get("display_name").unwrap_or_default(),
            description: node.get("description").unwrap_or_default(),
            enabled: node.get("enabled").unwrap_or_default(),
            required: node.get("required").unwrap_or_default(),
            emphasize: node.get("emphasize").unwrap_or_default(),
            show_in_discovery_document: node.get("show_in_discovery_document").unwrap_or_default(),
            user_claims: node.get("user_claims").unwrap_or_default(),
        }
    }
}

impl GraphRoot for PersistedGrant {
    const KIND: RootKind = RootKind::PersistedGrant;

    fn key(&self) -> &str {
        &self.key
    }

    fn props(&self) -> Vec<(&'static str, PropValue)> {
        vec![
            ("key", self.key.clone().into()),
            ("grant_type", self.grant_type.clone().into()),
            ("subject_id", self.subject_id.clone().into()),
            ("client_id", self.client_id.clone().into()),
            ("creation_time", datetime_string(self.creation_time).into()),
            ("expiration", opt_datetime_string(self.expiration).into()),
            ("data", self.data.clone().into()),
        ]
    }

    fn assign_entity_id(&mut self, id: i64) {
        self.entity_id = Some(id);
    }

    fn hydrate(node: &neo4rs::Node) -> Self {
        Self {
            entity_id: node.get::<i64>("entity_id").ok(),
            key: node.get("key").unwrap_or_default(),
            grant_type: node.get("grant_type").unwrap_or_default(),
            subject_id: node.get("subject_id").unwrap_or_default(),
            client_id: node.get("client_id").unwrap_or_default(),
            creation_time: node
                .get::<String>("creation_time")
                .ok()
                .and_then(|s| parse_datetime(&s))
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            expiration: node
                .get::<String>("expiration")
                .ok()
                .and_then(|s| parse_datetime(&s)),
            data: node.get("data").unwrap_or_default(),
        }
    }
}

impl GraphChild for Property {
    const KIND: ChildKind = ChildKind::Property;

    fn sub_key(&self) -> &str {
        &self.name
    }

    fn props(&self) -> Vec<(&'static str, PropValue)> {
        vec![
            ("name", self.name.clone().into()),
            ("value", self.value.clone().into()),
        ]
    }

    fn hydrate(node: &neo4rs::Node) -> Self {
        Self {
            entity_id: node.get::<i64>("entity_id").ok(),
            name: node.get("name").unwrap_or_default(),
            value: node.get("value").unwrap_or_default(),
        }
    }
}

impl GraphChild for Secret {
    const KIND: ChildKind = ChildKind::Secret;

    fn sub_key(&self) -> &str {
        &self.description
    }

    fn props(&self) -> Vec<(&'static str, PropValue)> {
        vec![
            ("description", self.description.clone().into()),
            ("value", self.value.clone().into()),
            ("secret_type", self.secret_type.clone().into()),
            ("expiration", opt_datetime_string(self.expiration).into()),
        ]
    }

    fn hydrate(node: &neo4rs::Node) -> Self {
        Self {
            entity_id: node.get::<i64>("entity_id").ok(),
            description: node.get("description").unwrap_or_default(),
            value: node.get("value").unwrap_or_default(),
            secret_type: node.get("secret_type").unwrap_or_default(),
            expiration: node
                .get::<String>("expiration")
                .ok()
                .and_then(|s| parse_datetime(&s)),
        }
    }
}

impl GraphChild for Claim {
    const KIND: ChildKind = ChildKind::Claim;

    fn sub_key(&self) -> &str {
        &self.claim_type
    }

    fn props(&self) -> Vec<(&'static str, PropValue)> {
        vec![
            ("claim_type", self.claim_type.clone().into()),
            ("claim_value", self.claim_value.clone().into()),
        ]
    }

    fn hydrate(node: &neo4rs::Node) -> Self {
        Self {
            entity_id: node.get::<i64>("entity_id").ok(),
            claim_type: node.get("claim_type").unwrap_or_default(),
            claim_value: node.get("claim_value").unwrap_or_default(),
        }
    }
}

impl GraphChild for Scope {
    const KIND: ChildKind = ChildKind::Scope;

    fn sub_key(&self) -> &str {
        &self.name
    }

    fn props(&self) -> Vec<(&'static str, PropValue)> {
        vec![
            ("name", self.name.clone().into()),
            ("display_name", self.display_name.clone().into()),
            ("description", self.description.clone().into()),
            ("required", self.required.into()),
            ("emphasize", self.emphasize.into()),
            (
                "show_in_discovery_document",
                self.show_in_discovery_document.into(),
            ),
            ("user_claims", self.user_claims.clone().into()),
        ]
    }

    fn hydrate(node: &neo4rs::Node) -> Self {
        Self {
            entity_id: node.get::<i64>("entity_id").ok(),
            name: node.get("name").unwrap_or_default(),
            display_name: node.get("display_name").unwrap_or_default(),
            description: node.get("description").unwrap_or_default(),
            required: node.get("required").unwrap_or_default(),
            emphasize: node.get("emphasize").unwrap_or_default(),
            show_in_discovery_document: node.get("show_in_discovery_document").unwrap_or_default(),
            user_claims: node.get("user_claims").unwrap_or_default(),
        }
    }
}

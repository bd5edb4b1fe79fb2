//! Core domain types for the warden identity store.
//!
//! Root aggregates (Client, ApiResource, IdentityResource, PersistedGrant)
//! own their child collections by value; the graph layer materializes each
//! child as its own node. `entity_id` is the store-assigned graph identity,
//! `None` until the entity has been persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Root Aggregates ───────────────────────────────────────────────

/// An OAuth2/OIDC client application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub entity_id: Option<i64>,
    pub client_id: String,
    pub client_name: String,
    pub description: String,
    pub enabled: bool,
    pub require_client_secret: bool,
    pub require_consent: bool,
    pub allow_offline_access: bool,
    pub allowed_grant_types: Vec<String>,
    pub redirect_uris: Vec<String>,
    pub post_logout_redirect_uris: Vec<String>,
    pub allowed_scopes: Vec<String>,
    pub allowed_cors_origins: Vec<String>,
    /// Access token lifetime in seconds.
    pub access_token_lifetime: i64,
    /// Identity token lifetime in seconds.
    pub identity_token_lifetime: i64,
    pub access_token_type: AccessTokenType,
    pub properties: Vec<Property>,
    pub claims: Vec<Claim>,
    pub client_secrets: Vec<Secret>,
}

impl Default for Client {
    fn default() -> Self {
        Self {
            entity_id: None,
            client_id: String::new(),
            client_name: String::new(),
            description: String::new(),
            enabled: true,
            require_client_secret: true,
            require_consent: true,
            allow_offline_access: false,
            allowed_grant_types: Vec::new(),
            redirect_uris: Vec::new(),
            post_logout_redirect_uris: Vec::new(),
            allowed_scopes: Vec::new(),
            allowed_cors_origins: Vec::new(),
            access_token_lifetime: 3600,
            identity_token_lifetime: 300,
            access_token_type: AccessTokenType::Jwt,
            properties: Vec::new(),
            claims: Vec::new(),
            client_secrets: Vec::new(),
        }
    }
}

/// A protected API, exposing one or more scopes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResource {
    pub entity_id: Option<i64>,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub enabled: bool,
    pub user_claims: Vec<String>,
    pub api_secrets: Vec<Secret>,
    pub scopes: Vec<Scope>,
}

impl Default for ApiResource {
    fn default() -> Self {
        Self {
            entity_id: None,
            name: String::new(),
            display_name: String::new(),
            description: String::new(),
            enabled: true,
            user_claims: Vec::new(),
            api_secrets: Vec::new(),
            scopes: Vec::new(),
        }
    }
}

/// An identity scope (e.g. `openid`, `profile`) with its claim mappings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityResource {
    pub entity_id: Option<i64>,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub enabled: bool,
    pub required: bool,
    pub emphasize: bool,
    pub show_in_discovery_document: bool,
    pub user_claims: Vec<String>,
}

impl Default for IdentityResource {
    fn default() -> Self {
        Self {
            entity_id: None,
            name: String::new(),
            display_name: String::new(),
            description: String::new(),
            enabled: true,
            required: false,
            emphasize: false,
            show_in_discovery_document: true,
            user_claims: Vec::new(),
        }
    }
}

/// A short-lived operational grant (authorization code, refresh token,
/// reference token, consent record).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedGrant {
    pub entity_id: Option<i64>,
    pub key: String,
    pub grant_type: String,
    pub subject_id: String,
    pub client_id: String,
    pub creation_time: DateTime<Utc>,
    /// `None` means the grant never expires.
    pub expiration: Option<DateTime<Utc>>,
    pub data: String,
}

impl Default for PersistedGrant {
    fn default() -> Self {
        Self {
            entity_id: None,
            key: String::new(),
            grant_type: String::new(),
            subject_id: String::new(),
            client_id: String::new(),
            creation_time: Utc::now(),
            expiration: None,
            data: String::new(),
        }
    }
}

// ── Child Entities ────────────────────────────────────────────────

/// A free-form key/value pair attached to a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Property {
    pub entity_id: Option<i64>,
    pub name: String,
    pub value: String,
}

/// A credential owned by a client or api resource.
///
/// `description` identifies the secret within its owner's collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secret {
    pub entity_id: Option<i64>,
    pub description: String,
    pub value: String,
    pub secret_type: String,
    pub expiration: Option<DateTime<Utc>>,
}

impl Default for Secret {
    fn default() -> Self {
        Self {
            entity_id: None,
            description: String::new(),
            value: String::new(),
            secret_type: "SharedSecret".to_string(),
            expiration: None,
        }
    }
}

/// A claim issued for tokens minted on behalf of a client.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Claim {
    pub entity_id: Option<i64>,
    pub claim_type: String,
    pub claim_value: String,
}

/// A scope exposed by an api resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scope {
    pub entity_id: Option<i64>,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub required: bool,
    pub emphasize: bool,
    pub show_in_discovery_document: bool,
    pub user_claims: Vec<String>,
}

impl Default for Scope {
    fn default() -> Self {
        Self {
            entity_id: None,
            name: String::new(),
            display_name: String::new(),
            description: String::new(),
            required: false,
            emphasize: false,
            show_in_discovery_document: true,
            user_claims: Vec::new(),
        }
    }
}

// ── Enums ─────────────────────────────────────────────────────────

/// How access tokens for a client are issued.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AccessTokenType {
    /// Self-contained JWT.
    #[default]
    Jwt,
    /// Opaque reference token resolved through introspection.
    Reference,
}

impl AccessTokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jwt => "jwt",
            Self::Reference => "reference",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "jwt" => Some(Self::Jwt),
            "reference" => Some(Self::Reference),
            _ => None,
        }
    }
}

// ── Aggregation ───────────────────────────────────────────────────

/// Every resource known to the store, api and identity together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceSet {
    pub api_resources: Vec<ApiResource>,
    pub identity_resources: Vec<IdentityResource>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_serialization_roundtrip() {
        let client = Client {
            client_id: "spa-app".to_string(),
            client_name: "SPA Application".to_string(),
            allowed_grant_types: vec!["authorization_code".to_string()],
            redirect_uris: vec!["https://app.example.com/cb".to_string()],
            allowed_scopes: vec!["openid".to_string(), "api1".to_string()],
            properties: vec![Property {
                entity_id: None,
                name: "tier".to_string(),
                value: "gold".to_string(),
            }],
            ..Client::default()
        };

        let json = serde_json::to_string(&client).unwrap();
        let deserialized: Client = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.client_id, "spa-app");
        assert_eq!(deserialized.properties.len(), 1);
        assert_eq!(deserialized.properties[0].value, "gold");
    }

    #[test]
    fn client_defaults() {
        let client = Client::default();
        assert!(client.enabled);
        assert!(client.require_client_secret);
        assert_eq!(client.access_token_lifetime, 3600);
        assert_eq!(client.identity_token_lifetime, 300);
        assert_eq!(client.access_token_type, AccessTokenType::Jwt);
        assert!(client.entity_id.is_none());
    }

    #[test]
    fn access_token_type_parse() {
        assert_eq!(AccessTokenType::parse("jwt"), Some(AccessTokenType::Jwt));
        assert_eq!(
            AccessTokenType::parse("reference"),
            Some(AccessTokenType::Reference)
        );
        assert_eq!(AccessTokenType::parse("bearer"), None);
        assert_eq!(AccessTokenType::Reference.as_str(), "reference");
    }

    #[test]
    fn access_token_type_serializes_lowercase() {
        let json = serde_json::to_string(&AccessTokenType::Reference).unwrap();
        assert_eq!(json, "\"reference\"");
    }

    #[test]
    fn grant_expiration_roundtrip() {
        let grant = PersistedGrant {
            key: "abc".to_string(),
            grant_type: "refresh_token".to_string(),
            subject_id: "sub-1".to_string(),
            client_id: "spa-app".to_string(),
            data: "{}".to_string(),
            ..PersistedGrant::default()
        };
        assert!(grant.expiration.is_none());

        let json = serde_json::to_string(&grant).unwrap();
        let deserialized: PersistedGrant = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.key, "abc");
        assert!(deserialized.expiration.is_none());
    }

    #[test]
    fn secret_default_type() {
        assert_eq!(Secret::default().secret_type, "SharedSecret");
    }
}

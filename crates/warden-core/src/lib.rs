//! warden-core: shared domain types for the warden identity store.
//!
//! This crate provides the aggregate and child entity types persisted by
//! warden-graph:
//! - Root aggregates (Client, ApiResource, IdentityResource, PersistedGrant)
//! - Child entities (Property, Secret, Claim, Scope) owned by the roots
//!
//! No graph or I/O code lives here.

pub mod types;

pub use types::{
    AccessTokenType, ApiResource, Claim, Client, IdentityResource, PersistedGrant, Property,
    ResourceSet, Scope, Secret,
};

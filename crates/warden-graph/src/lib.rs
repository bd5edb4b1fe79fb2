//! Neo4j persistence for warden identity configuration and grants.
//!
//! All graph access goes through [`GraphClient`]. The [`schema`] registry is
//! the single source for node labels, natural keys, and property
//! projections; [`writer`] and [`sync`] mutate root aggregates and their
//! child collections, [`loader`] reassembles them, and [`grants`] holds the
//! operational persisted-grant surface.
//!
//! Mutations report how many nodes they touched; 0 consistently means "the
//! target was not there" and is never an error.

pub mod client;
pub mod grants;
pub mod loader;
pub mod schema;
pub mod sync;
pub mod writer;

pub use client::{GraphClient, GraphConfig, StoreError};
pub use schema::{ChildKind, RootKind};

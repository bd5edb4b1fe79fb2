//! warden-sweep: expired-grant sweeper for the warden identity graph.
//!
//! Drains persisted grants whose expiration has passed, either as a one-shot
//! pass or as a cancellable periodic daemon loop.

pub mod config;
pub mod error;
pub mod sweeper;

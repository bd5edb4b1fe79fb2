//! Error types for the warden-sweep crate.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] warden_graph::StoreError),
}

pub type Result<T> = std::result::Result<T, SweepError>;

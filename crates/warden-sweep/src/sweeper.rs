//! Background expiry sweeper for persisted grants.
//!
//! Expired grants are deleted in bounded batches so a large backlog never
//! turns into one oversized transaction. The lifecycle of a running sweep
//! loop is its [`SweeperHandle`]: a handle exists exactly as long as its
//! loop is wanted, and stopping consumes it.

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use warden_graph::{GraphClient, RootKind};

use crate::config::SweepConfig;
use crate::error::Result;

/// Outcome of one drain pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainStats {
    /// Grants deleted across all batches of the pass.
    pub deleted: u64,
    /// Delete batches issued, including the final short one.
    pub batches: u64,
}

/// Periodic expired-grant remover.
pub struct GrantSweeper {
    graph: GraphClient,
    config: SweepConfig,
}

impl GrantSweeper {
    /// Build a sweeper, rejecting unusable intervals or batch sizes.
    pub fn new(graph: GraphClient, config: SweepConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { graph, config })
    }

    /// Spawn the sweep loop on a fresh task and hand back its lifecycle.
    ///
    /// Each call gets an independent task and handle, so repeated starts
    /// (or several sweepers over one store) simply coexist; the batched
    /// deletes they issue are disjoint.
    pub fn start(&self) -> SweeperHandle {
        let graph = self.graph.clone();
        let interval = Duration::from_secs(self.config.interval_secs);
        let batch_size = self.config.batch_size;
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            tracing::info!(
                interval_secs = interval.as_secs(),
                batch_size,
                "Grant sweeper started"
            );
            loop {
                tokio::select! {
                    _ = loop_cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                match drain_expired(&graph, batch_size).await {
                    Ok(stats) => tracing::debug!(
                        deleted = stats.deleted,
                        batches = stats.batches,
                        "Sweep pass done"
                    ),
                    Err(e) => tracing::error!(error = %e, "Sweep pass failed"),
                }
            }
            tracing::info!("Grant sweeper stopped");
        });

        SweeperHandle { cancel, task }
    }
}

/// Delete every grant whose expiration is set and already past.
///
/// Expirations are stored as RFC 3339 strings, so the lexicographic
/// comparison against now is chronological. Grants are taken in ascending
/// key order, `batch_size` at a time, until a batch comes back short.
pub async fn drain_expired(graph: &GraphClient, batch_size: u64) -> Result<DrainStats> {
    let cypher = format!(
        "MATCH (g:{label})\nWHERE g.expiration <> '' AND g.expiration < $now\nWITH g ORDER BY g.key LIMIT $batch\nDETACH DELETE g\nRETURN count(g) AS affected",
        label = RootKind::PersistedGrant.label(),
    );

    let mut stats = DrainStats {
        deleted: 0,
        batches: 0,
    };
    loop {
        let q = neo4rs::query(&cypher)
            .param("now", Utc::now().to_rfc3339())
            .param("batch", batch_size as i64);
        let deleted = graph.execute_count(q).await?;
        stats.deleted += deleted;
        stats.batches += 1;
        tracing::info!(deleted, "Cleared expired grants");
        if deleted < batch_size {
            break;
        }
    }
    Ok(stats)
}

/// Lifecycle of a running sweep loop.
///
/// Dropping the handle without calling [`stop`](Self::stop) or
/// [`shutdown`](Self::shutdown) leaves the loop running detached.
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signal the loop to exit without waiting for it.
    pub fn stop(self) {
        self.cancel.cancel();
    }

    /// Signal the loop to exit and wait until it has.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "Sweeper task panicked");
        }
    }

    /// Whether the loop has already exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

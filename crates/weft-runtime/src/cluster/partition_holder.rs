use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use weft_core::cluster::{PartitionAssignment, PartitionId, TopologyClient};

/// Immutable set of partitions owned by this node.
///
/// Empty means the partitions are not known yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedPartitions {
    ids: Arc<[PartitionId]>,
}

impl OwnedPartitions {
    pub fn new(ids: Vec<PartitionId>) -> Self {
        Self { ids: ids.into() }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[PartitionId] {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn contains(&self, partition_id: PartitionId) -> bool {
        self.ids.contains(&partition_id)
    }
}

/// Discovers which partitions this node owns.
///
/// The cluster's partition ids come from a [`TopologyClient`]; the node's
/// share of them is chosen by its [`PartitionAssignment`].
pub struct PartitionHolder<C: TopologyClient> {
    client: C,
    assignment: PartitionAssignment,
    current: watch::Sender<OwnedPartitions>,
}

impl<C: TopologyClient> PartitionHolder<C> {
    /// Default wait between attempts.
    pub const WAIT_TIME: Duration = Duration::from_secs(1);
    /// Default number of retries after the first attempt.
    pub const MAX_RETRIES: u32 = 60;

    pub fn new(client: C, assignment: PartitionAssignment) -> Self {
        let (current, _) = watch::channel(OwnedPartitions::empty());
        Self {
            client,
            assignment,
            current,
        }
    }

    pub fn assignment(&self) -> &PartitionAssignment {
        &self.assignment
    }

    /// Current snapshot. Never blocks.
    pub fn partitions(&self) -> OwnedPartitions {
        self.current.borrow().clone()
    }

    /// Receiver notified whenever the snapshot is replaced.
    pub fn subscribe(&self) -> watch::Receiver<OwnedPartitions> {
        self.current.subscribe()
    }

    /// Owned partitions, querying the topology until known.
    ///
    /// Returns the cached snapshot when one is known. Otherwise makes one
    /// attempt plus up to `max_retries` retries, waiting `wait` before each
    /// retry, and returns an empty set when every attempt failed.
    pub async fn resolve(&self, wait: Duration, max_retries: u32) -> OwnedPartitions {
        self.resolve_with_cancel(wait, max_retries, &CancellationToken::new())
            .await
    }

    /// Like [`resolve`](Self::resolve), giving up with an empty set once
    /// `cancel` fires.
    pub async fn resolve_with_cancel(
        &self,
        wait: Duration,
        max_retries: u32,
        cancel: &CancellationToken,
    ) -> OwnedPartitions {
        let cached = self.partitions();
        if !cached.is_empty() {
            return cached;
        }
        self.query(wait, max_retries, cancel).await
    }

    /// Query the topology again and replace the snapshot.
    pub async fn refresh(&self, wait: Duration, max_retries: u32) -> OwnedPartitions {
        self.query(wait, max_retries, &CancellationToken::new()).await
    }

    async fn query(
        &self,
        wait: Duration,
        max_retries: u32,
        cancel: &CancellationToken,
    ) -> OwnedPartitions {
        let mut retries = 0;
        loop {
            if retries > 0 {
                tokio::select! {
                    _ = tokio::time::sleep(wait) => {}
                    _ = cancel.cancelled() => {
                        tracing::info!("Partition discovery cancelled");
                        return OwnedPartitions::empty();
                    }
                }
            } else if cancel.is_cancelled() {
                return OwnedPartitions::empty();
            }

            let fetched = tokio::select! {
                ids = self.partition_ids_from_topology() => ids,
                _ = cancel.cancelled() => {
                    tracing::info!("Partition discovery cancelled");
                    return OwnedPartitions::empty();
                }
            };

            if let Some(ids) = fetched {
                let owned = OwnedPartitions::new(self.assignment.select(&ids));
                tracing::info!(
                    partition_ids = ?owned.ids(),
                    retrieved = ids.len(),
                    "Partition ids resolved"
                );
                self.current.send_replace(owned.clone());
                return owned;
            }

            retries += 1;
            if retries > max_retries {
                tracing::info!(
                    attempts = retries,
                    "Partition ids can't be fetched, returning an empty list"
                );
                return OwnedPartitions::empty();
            }
            tracing::info!(retry = retries, "Partition ids can't be fetched, trying again");
        }
    }

    async fn partition_ids_from_topology(&self) -> Option<Vec<PartitionId>> {
        tracing::debug!("Requesting partition ids from topology");
        match self.client.topology().await {
            Ok(topology) if topology.partitions_count > 0 => Some(topology.partition_ids()),
            Ok(_) => {
                tracing::warn!("Topology reported no partitions");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Error occurred when requesting partition ids");
                None
            }
        }
    }
}

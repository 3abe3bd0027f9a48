use std::collections::BTreeMap;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::PartitionId;

/// Role of a broker for one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartitionRole {
    Leader,
    Follower,
}

/// A partition as seen by one broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionInfo {
    pub partition_id: PartitionId,
    pub role: PartitionRole,
}

/// A broker and the partitions it replicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerInfo {
    pub node_id: u32,
    pub address: String,
    #[serde(default)]
    pub partitions: Vec<PartitionInfo>,
}

/// Cluster topology as reported by the topology service.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topology {
    #[serde(default)]
    pub cluster_size: u32,
    pub partitions_count: u32,
    #[serde(default)]
    pub replication_factor: u32,
    #[serde(default)]
    pub brokers: Vec<BrokerInfo>,
}

impl Topology {
    /// Topology with only a partition count.
    pub fn with_partitions(partitions_count: u32) -> Self {
        Self {
            partitions_count,
            ..Default::default()
        }
    }

    /// All partition ids, `1..=partitions_count`.
    pub fn partition_ids(&self) -> Vec<PartitionId> {
        (1..=self.partitions_count).collect()
    }

    /// Leader broker per partition, for partitions that currently have one.
    pub fn leaders(&self) -> BTreeMap<PartitionId, u32> {
        self.brokers
            .iter()
            .flat_map(|broker| {
                broker
                    .partitions
                    .iter()
                    .filter(|p| p.role == PartitionRole::Leader)
                    .map(move |p| (p.partition_id, broker.node_id))
            })
            .collect()
    }
}

/// Source of cluster topology.
pub trait TopologyClient: Send + Sync {
    /// Request the current topology.
    fn topology(&self) -> impl Future<Output = Result<Topology>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_ids() {
        assert_eq!(Topology::with_partitions(3).partition_ids(), vec![1, 2, 3]);
        assert!(Topology::with_partitions(0).partition_ids().is_empty());
    }

    #[test]
    fn test_leaders() {
        let topology = Topology {
            cluster_size: 2,
            partitions_count: 2,
            replication_factor: 2,
            brokers: vec![
                BrokerInfo {
                    node_id: 0,
                    address: "broker-0:26501".into(),
                    partitions: vec![
                        PartitionInfo {
                            partition_id: 1,
                            role: PartitionRole::Leader,
                        },
                        PartitionInfo {
                            partition_id: 2,
                            role: PartitionRole::Follower,
                        },
                    ],
                },
                BrokerInfo {
                    node_id: 1,
                    address: "broker-1:26501".into(),
                    partitions: vec![
                        PartitionInfo {
                            partition_id: 1,
                            role: PartitionRole::Follower,
                        },
                        PartitionInfo {
                            partition_id: 2,
                            role: PartitionRole::Leader,
                        },
                    ],
                },
            ],
        };

        let leaders = topology.leaders();
        assert_eq!(leaders.get(&1), Some(&0));
        assert_eq!(leaders.get(&2), Some(&1));
    }

    #[test]
    fn test_parse_minimal_topology() {
        let topology: Topology =
            serde_json::from_str(r#"{"partitionsCount": 4}"#).unwrap();
        assert_eq!(topology.partitions_count, 4);
        assert!(topology.brokers.is_empty());
    }
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cluster::PartitionId;

/// Cluster configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Cluster name.
    #[serde(default = "default_cluster_name")]
    pub name: String,

    /// Base URL of the topology service.
    pub topology_endpoint: Option<String>,

    /// Topology request timeout in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// Wait between topology attempts in milliseconds.
    #[serde(default = "default_wait_time")]
    pub wait_time_ms: u64,

    /// Topology retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Which partitions this node owns.
    #[serde(default)]
    pub partitions: PartitionsConfig,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            name: default_cluster_name(),
            topology_endpoint: None,
            request_timeout_ms: default_request_timeout(),
            wait_time_ms: default_wait_time(),
            max_retries: default_max_retries(),
            partitions: PartitionsConfig::default(),
        }
    }
}

impl ClusterConfig {
    pub fn wait_time(&self) -> Duration {
        Duration::from_millis(self.wait_time_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_cluster_name() -> String {
    "default".to_string()
}

fn default_request_timeout() -> u64 {
    5000
}

fn default_wait_time() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    60
}

/// Partition ownership of the local node.
///
/// Either list the ids explicitly, or give the node count and this node's
/// zero-based id to take a contiguous share. With neither, the node owns all.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct PartitionsConfig {
    /// Explicit partition ids.
    #[serde(default)]
    pub partition_ids: Vec<PartitionId>,

    /// Number of nodes sharing the partitions.
    pub node_count: Option<u32>,

    /// Zero-based id of this node.
    pub current_node_id: Option<u32>,
}

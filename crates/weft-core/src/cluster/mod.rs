mod assignment;
mod topology;

pub use assignment::{split_and_get_sublist, PartitionAssignment};
pub use topology::{BrokerInfo, PartitionInfo, PartitionRole, Topology, TopologyClient};

/// Identifier of a partition. Partitions are numbered from 1.
pub type PartitionId = u32;

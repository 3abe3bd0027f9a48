mod http;
mod partition_holder;

pub use http::HttpTopologyClient;
pub use partition_holder::{OwnedPartitions, PartitionHolder};

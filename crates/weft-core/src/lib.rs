pub mod cluster;
pub mod command;
pub mod config;
pub mod error;
pub mod model;
pub mod record;

pub use cluster::{PartitionAssignment, PartitionId, Topology, TopologyClient};
pub use config::WeftConfig;
pub use error::{Result, WeftError};
pub use record::{PendingRecord, Record, WorkflowInstanceIntent, WorkflowInstanceRecord};

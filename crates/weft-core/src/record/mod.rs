mod intent;
mod value;

pub use intent::WorkflowInstanceIntent;
pub use value::{WorkflowInstanceRecord, UNSET_KEY};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cluster::PartitionId;

/// Number of low bits of a key reserved for the per-partition counter.
pub const KEY_BITS: u32 = 51;

/// Build a globally unique key from a partition id and a per-partition counter.
pub fn encode_key(partition_id: PartitionId, counter: i64) -> i64 {
    ((partition_id as i64) << KEY_BITS) + counter
}

/// Partition id encoded in a key.
pub fn decode_partition_id(key: i64) -> PartitionId {
    (key >> KEY_BITS) as PartitionId
}

/// An immutable entry of a partition's log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Position in the partition log (starts at 1).
    pub position: u64,
    /// Key of the entity the record is about. Fresh keys are monotonic per partition.
    pub key: i64,
    /// Partition the record belongs to.
    pub partition_id: PartitionId,
    /// What happened.
    pub intent: WorkflowInstanceIntent,
    /// Payload.
    pub value: WorkflowInstanceRecord,
    /// Position of the record whose processing produced this one.
    pub source_position: Option<u64>,
    /// Append time.
    pub timestamp: DateTime<Utc>,
}

impl Record {
    /// Whether this record was written by the partition's own processor.
    pub fn is_follow_up(&self) -> bool {
        self.source_position.is_some()
    }

    /// Identity of the record without its append time.
    pub fn identity(&self) -> (i64, WorkflowInstanceIntent, &WorkflowInstanceRecord) {
        (self.key, self.intent, &self.value)
    }
}

/// A record emitted by a handler, before the log assigned its position.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRecord {
    /// Key of an existing entity; `None` asks the log for a fresh key.
    pub key: Option<i64>,
    /// What happened.
    pub intent: WorkflowInstanceIntent,
    /// Payload.
    pub value: WorkflowInstanceRecord,
    /// Position of the record being processed when this one was emitted.
    pub source_position: Option<u64>,
}

impl PendingRecord {
    /// A record written from outside the processor (client command, test input).
    pub fn external(intent: WorkflowInstanceIntent, value: WorkflowInstanceRecord) -> Self {
        Self {
            key: None,
            intent,
            value,
            source_position: None,
        }
    }

    /// A follow-up record produced while processing `source_position`.
    pub fn follow_up(
        intent: WorkflowInstanceIntent,
        value: WorkflowInstanceRecord,
        source_position: u64,
    ) -> Self {
        Self {
            key: None,
            intent,
            value,
            source_position: Some(source_position),
        }
    }

    /// Reuse the key of an existing entity.
    pub fn with_key(mut self, key: i64) -> Self {
        self.key = Some(key);
        self
    }
}

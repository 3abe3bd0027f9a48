//! Partition record logs.

mod memory;
mod writer;

pub use memory::InMemoryLogStream;
pub use writer::RecordWriter;

use std::sync::Arc;

use tokio::sync::Notify;
use weft_core::{PartitionId, PendingRecord, Record, Result};

/// Append-only, totally ordered log of one partition.
pub trait RecordStream: Send + Sync {
    /// Partition this log belongs to.
    fn partition_id(&self) -> PartitionId;

    /// Append a record, assigning its position and, if unset, a fresh key.
    fn append(&self, record: PendingRecord) -> Result<Record>;

    /// Record at a position. Positions start at 1.
    fn read(&self, position: u64) -> Option<Record>;

    /// Position of the last record, 0 when empty.
    fn last_position(&self) -> u64;

    /// Signalled after every append.
    fn append_notifier(&self) -> Arc<Notify>;

    /// All records from `position` (inclusive) to the end.
    fn records_from(&self, position: u64) -> Vec<Record> {
        (position.max(1)..=self.last_position())
            .filter_map(|p| self.read(p))
            .collect()
    }
}

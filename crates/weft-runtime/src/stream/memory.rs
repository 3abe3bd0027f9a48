use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::sync::Notify;
use weft_core::record::encode_key;
use weft_core::{
    PartitionId, PendingRecord, Record, Result, WorkflowInstanceIntent, WorkflowInstanceRecord,
};

use super::RecordStream;

#[derive(Debug, Default)]
struct LogInner {
    records: Vec<Record>,
    next_key: i64,
}

/// In-memory partition log. Clones share the same log.
#[derive(Debug, Clone)]
pub struct InMemoryLogStream {
    partition_id: PartitionId,
    inner: Arc<Mutex<LogInner>>,
    notify: Arc<Notify>,
}

impl InMemoryLogStream {
    pub fn new(partition_id: PartitionId) -> Self {
        Self {
            partition_id,
            inner: Arc::new(Mutex::new(LogInner {
                records: Vec::new(),
                next_key: 1,
            })),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Write a command from outside the processor.
    pub fn write_command(
        &self,
        intent: WorkflowInstanceIntent,
        value: WorkflowInstanceRecord,
    ) -> Result<Record> {
        self.append(PendingRecord::external(intent, value))
    }

    /// Copy of every record in the log.
    pub fn records(&self) -> Vec<Record> {
        self.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RecordStream for InMemoryLogStream {
    fn partition_id(&self) -> PartitionId {
        self.partition_id
    }

    fn append(&self, pending: PendingRecord) -> Result<Record> {
        let record = {
            let mut inner = self.lock();
            let key = match pending.key {
                Some(key) => key,
                None => {
                    let key = encode_key(self.partition_id, inner.next_key);
                    inner.next_key += 1;
                    key
                }
            };
            let record = Record {
                position: inner.records.len() as u64 + 1,
                key,
                partition_id: self.partition_id,
                intent: pending.intent,
                value: pending.value,
                source_position: pending.source_position,
                timestamp: Utc::now(),
            };
            inner.records.push(record.clone());
            record
        };

        tracing::trace!(
            partition_id = self.partition_id,
            position = record.position,
            key = record.key,
            intent = %record.intent,
            "Record appended"
        );
        self.notify.notify_one();
        Ok(record)
    }

    fn read(&self, position: u64) -> Option<Record> {
        let index = usize::try_from(position.checked_sub(1)?).ok()?;
        self.lock().records.get(index).cloned()
    }

    fn last_position(&self) -> u64 {
        self.lock().records.len() as u64
    }

    fn append_notifier(&self) -> Arc<Notify> {
        self.notify.clone()
    }
}

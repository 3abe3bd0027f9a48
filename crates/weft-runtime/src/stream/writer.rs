use weft_core::{PendingRecord, Record, Result, WorkflowInstanceIntent, WorkflowInstanceRecord};

use super::RecordStream;

/// Buffers the records a handler emits while processing one record.
///
/// Nothing reaches the log until [`flush`](Self::flush), so a failed
/// handler leaves no output behind.
#[derive(Debug, Default)]
pub struct RecordWriter {
    source_position: u64,
    pending: Vec<PendingRecord>,
}

impl RecordWriter {
    /// Writer for follow-ups of the record at `source_position`.
    pub fn new(source_position: u64) -> Self {
        Self {
            source_position,
            pending: Vec::new(),
        }
    }

    /// Emit an event about a new entity; the log assigns it a fresh key.
    pub fn append_new_event(&mut self, intent: WorkflowInstanceIntent, value: WorkflowInstanceRecord) {
        self.pending
            .push(PendingRecord::follow_up(intent, value, self.source_position));
    }

    /// Emit an event about an existing entity.
    pub fn append_follow_up_event(
        &mut self,
        key: i64,
        intent: WorkflowInstanceIntent,
        value: WorkflowInstanceRecord,
    ) {
        self.pending.push(
            PendingRecord::follow_up(intent, value, self.source_position).with_key(key),
        );
    }

    pub fn pending(&self) -> &[PendingRecord] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop buffered records.
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    /// Append buffered records to the log in emission order.
    pub fn flush(&mut self, stream: &dyn RecordStream) -> Result<Vec<Record>> {
        self.pending
            .drain(..)
            .map(|record| stream.append(record))
            .collect()
    }
}

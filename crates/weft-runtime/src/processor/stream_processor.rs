use std::sync::Arc;

use tokio::sync::watch;
use weft_core::{PartitionId, Record, Result, WeftError};

use super::context::BpmnStepContext;
use super::registry::StepHandlerRegistry;
use crate::state::WorkflowState;
use crate::stream::{RecordStream, RecordWriter};
use crate::workflow::WorkflowRepository;

/// Result of processing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessingOutcome {
    /// A handler ran; these follow-ups were appended.
    Processed { written: Vec<Record> },
    /// The record was not handled.
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No handler for the element kind and intent.
    NoHandler,
    /// The workflow instance is blacklisted.
    Blacklisted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Process,
    Replay,
}

/// Applies records of one partition log to the partition's state.
///
/// Records are handled one at a time in log order. Each record's state
/// changes and follow-up records are applied together or not at all.
pub struct StreamProcessor<S: RecordStream> {
    stream: S,
    repository: Arc<WorkflowRepository>,
    handlers: Arc<StepHandlerRegistry>,
    state: WorkflowState,
    last_processed_position: u64,
}

impl<S: RecordStream> StreamProcessor<S> {
    pub fn new(
        stream: S,
        repository: Arc<WorkflowRepository>,
        handlers: Arc<StepHandlerRegistry>,
    ) -> Self {
        Self {
            stream,
            repository,
            handlers,
            state: WorkflowState::new(),
            last_processed_position: 0,
        }
    }

    pub fn partition_id(&self) -> PartitionId {
        self.stream.partition_id()
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn last_processed_position(&self) -> u64 {
        self.last_processed_position
    }

    /// Rebuild state from the log.
    ///
    /// Every record that already produced follow-ups is handled again with
    /// output suppressed. Returns the number of replayed records.
    pub fn recover(&mut self) -> usize {
        let last_source_position = self
            .stream
            .records_from(1)
            .iter()
            .filter_map(|r| r.source_position)
            .max()
            .unwrap_or(0);

        let mut replayed = 0;
        while self.last_processed_position < last_source_position {
            let position = self.last_processed_position + 1;
            if let Some(record) = self.stream.read(position) {
                if let Err(e) = self.process_record(&record, Mode::Replay) {
                    tracing::debug!(position, error = %e, "Replayed record failed again");
                }
                replayed += 1;
            }
            self.last_processed_position = position;
        }

        tracing::info!(
            partition_id = self.partition_id(),
            replayed,
            last_position = self.last_processed_position,
            "Partition state recovered"
        );
        replayed
    }

    /// Process the next unprocessed record, if any.
    pub fn process_next(&mut self) -> Option<Result<ProcessingOutcome>> {
        let position = self.last_processed_position + 1;
        let record = self.stream.read(position)?;
        let result = self.process_record(&record, Mode::Process);
        self.last_processed_position = position;
        Some(result)
    }

    /// Process every record currently in the log. Returns how many were read.
    pub fn process_available(&mut self) -> usize {
        let mut count = 0;
        while let Some(result) = self.process_next() {
            count += 1;
            if let Err(e) = result {
                tracing::debug!(error = %e, "Record processing failed");
            }
        }
        count
    }

    fn process_record(&mut self, record: &Record, mode: Mode) -> Result<ProcessingOutcome> {
        let workflow_instance_key = record.value.workflow_instance_key;
        if self.state.is_blacklisted(workflow_instance_key) {
            tracing::debug!(
                position = record.position,
                workflow_instance_key,
                "Skipping record of blacklisted workflow instance"
            );
            return Ok(ProcessingOutcome::Skipped(SkipReason::Blacklisted));
        }

        let invariant_violation = |reason: String| WeftError::InvariantViolation {
            workflow_instance_key,
            record_key: record.key,
            element_id: record.value.element_id.clone(),
            reason,
        };

        let result = match self.repository.get(record.value.workflow_key) {
            None => Err(invariant_violation(format!(
                "workflow {} is not deployed",
                record.value.workflow_key
            ))),
            Some(workflow) => match workflow.element(&record.value.element_id) {
                None => Err(invariant_violation(format!(
                    "element is not part of workflow {}",
                    workflow.key()
                ))),
                Some(element) => match self.handlers.get(element.kind(), record.intent) {
                    None => return Ok(ProcessingOutcome::Skipped(SkipReason::NoHandler)),
                    Some(handler) => {
                        let mut writer = RecordWriter::new(record.position);
                        self.state.begin();
                        let handled = {
                            let mut context = BpmnStepContext::new(
                                record,
                                &workflow,
                                element,
                                &mut self.state,
                                &mut writer,
                            );
                            handler.handle(&mut context)
                        };
                        handled.and_then(|()| self.write(&mut writer, mode))
                    }
                },
            },
        };

        match result {
            Ok(written) => {
                self.state.commit();
                Ok(ProcessingOutcome::Processed { written })
            }
            Err(e) => {
                self.state.rollback();
                if e.is_fatal() && self.state.blacklist(workflow_instance_key) {
                    tracing::error!(
                        partition_id = self.partition_id(),
                        position = record.position,
                        workflow_instance_key,
                        error = %e,
                        "Workflow instance blacklisted"
                    );
                }
                Err(e)
            }
        }
    }

    fn write(&self, writer: &mut RecordWriter, mode: Mode) -> Result<Vec<Record>> {
        match mode {
            Mode::Process => writer.flush(&self.stream),
            Mode::Replay => {
                writer.reset();
                Ok(Vec::new())
            }
        }
    }
}

/// Drives a partition's processor until shutdown.
pub struct PartitionProcessor<S: RecordStream> {
    processor: StreamProcessor<S>,
}

impl<S: RecordStream> PartitionProcessor<S> {
    pub fn new(processor: StreamProcessor<S>) -> Self {
        Self { processor }
    }

    /// Recover, then process records as they are appended.
    ///
    /// Returns the processor once `shutdown` turns true or its sender is dropped.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> StreamProcessor<S> {
        let partition_id = self.processor.partition_id();
        let notify = self.processor.stream().append_notifier();
        self.processor.recover();

        tracing::info!(partition_id, "Partition processor started");

        loop {
            let processed = self.processor.process_available();
            if processed > 0 {
                tracing::trace!(partition_id, processed, "Processed records");
            }

            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = notify.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!(
            partition_id,
            last_position = self.processor.last_processed_position(),
            "Partition processor stopped"
        );
        self.processor
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use weft_core::model::{ExecutableCatchEventElement, ExecutableWorkflow};
    use weft_core::{PendingRecord, WorkflowInstanceIntent, WorkflowInstanceRecord};

    use super::*;
    use crate::stream::InMemoryLogStream;

    fn repository() -> Arc<WorkflowRepository> {
        let mut repository = WorkflowRepository::new();
        repository
            .deploy(
                ExecutableWorkflow::builder(1, "order", 1)
                    .process(vec![
                        ExecutableCatchEventElement::timer("timer", Duration::from_secs(60)),
                        ExecutableCatchEventElement::message("message", "order-placed"),
                    ])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        repository
            .deploy(
                ExecutableWorkflow::builder(2, "invoice", 1)
                    .process(vec![ExecutableCatchEventElement::none("start")])
                    .build()
                    .unwrap(),
            )
            .unwrap();
        Arc::new(repository)
    }

    fn processor(stream: InMemoryLogStream) -> StreamProcessor<InMemoryLogStream> {
        StreamProcessor::new(
            stream,
            repository(),
            Arc::new(StepHandlerRegistry::with_defaults()),
        )
    }

    fn value(workflow_key: i64, element_id: &str) -> WorkflowInstanceRecord {
        let process_id = if workflow_key == 1 { "order" } else { "invoice" };
        WorkflowInstanceRecord::new(process_id, workflow_key, weft_core::record::UNSET_KEY)
            .with_element_id(element_id)
    }

    fn intents(stream: &InMemoryLogStream) -> Vec<WorkflowInstanceIntent> {
        stream.records().iter().map(|r| r.intent).collect()
    }

    #[test]
    fn test_none_start_instance() {
        let stream = InMemoryLogStream::new(1);
        let mut processor = processor(stream.clone());
        let created = stream
            .write_command(WorkflowInstanceIntent::ElementActivating, value(2, "invoice"))
            .unwrap();

        assert_eq!(processor.process_available(), 4);
        assert_eq!(
            intents(&stream),
            vec![
                WorkflowInstanceIntent::ElementActivating,
                WorkflowInstanceIntent::ElementActivated,
                WorkflowInstanceIntent::EventTriggering,
                WorkflowInstanceIntent::EventTriggered,
            ]
        );

        let triggering = stream.read(3).unwrap();
        assert_eq!(triggering.value.element_id, "start");
        assert_eq!(triggering.value.scope_instance_key, created.key);
        assert_eq!(triggering.value.workflow_instance_key, created.key);
        assert_eq!(triggering.source_position, Some(2));
        assert!(processor
            .state()
            .element_instance_state()
            .instance(created.key)
            .is_some());
    }

    #[test]
    fn test_event_start_instance() {
        let stream = InMemoryLogStream::new(1);
        let mut processor = processor(stream.clone());
        let occurred = stream
            .write_command(WorkflowInstanceIntent::EventOccurred, value(1, "message"))
            .unwrap();

        processor.process_available();

        let triggering = stream
            .records()
            .into_iter()
            .find(|r| r.intent == WorkflowInstanceIntent::EventTriggering)
            .unwrap();
        assert_eq!(triggering.value.element_id, "message");
        assert_eq!(triggering.value.workflow_instance_key, occurred.key);
        assert!(!processor
            .state()
            .element_instance_state()
            .has_deferred_tokens(occurred.key));
    }

    #[test]
    fn test_scope_terminated_before_activation_never_starts() {
        let stream = InMemoryLogStream::new(1);
        let mut processor = processor(stream.clone());
        let occurred = stream
            .write_command(WorkflowInstanceIntent::EventOccurred, value(1, "timer"))
            .unwrap();
        assert!(matches!(
            processor.process_next(),
            Some(Ok(ProcessingOutcome::Processed { .. }))
        ));

        let activating = stream.read(2).unwrap();
        stream
            .append(
                PendingRecord::external(
                    WorkflowInstanceIntent::ElementTerminating,
                    activating.value.clone(),
                )
                .with_key(activating.key),
            )
            .unwrap();
        processor.process_available();

        assert_eq!(
            intents(&stream),
            vec![
                WorkflowInstanceIntent::EventOccurred,
                WorkflowInstanceIntent::ElementActivating,
                WorkflowInstanceIntent::ElementTerminating,
                WorkflowInstanceIntent::ElementActivated,
                WorkflowInstanceIntent::ElementTerminated,
            ]
        );
        let state = processor.state().element_instance_state();
        assert!(!state.has_deferred_tokens(occurred.key));
        assert_eq!(state.instance_count(), 0);
        assert!(!processor.state().is_blacklisted(occurred.key));
    }

    #[test]
    fn test_missing_token_blacklists_instance() {
        let stream = InMemoryLogStream::new(1);
        let mut processor = processor(stream.clone());
        stream
            .write_command(WorkflowInstanceIntent::ElementActivating, value(1, "order"))
            .unwrap();

        assert!(matches!(
            processor.process_next(),
            Some(Ok(ProcessingOutcome::Processed { .. }))
        ));
        let activated = stream.read(2).unwrap();
        let err = processor.process_next().unwrap().unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(stream.len(), 2);
        assert!(processor
            .state()
            .is_blacklisted(activated.value.workflow_instance_key));

        stream
            .write_command(
                WorkflowInstanceIntent::ElementTerminating,
                activated.value.clone(),
            )
            .unwrap();
        assert_eq!(
            processor.process_next().unwrap().unwrap(),
            ProcessingOutcome::Skipped(SkipReason::Blacklisted)
        );
    }

    #[test]
    fn test_unhandled_records_are_skipped() {
        let stream = InMemoryLogStream::new(1);
        let mut processor = processor(stream.clone());
        stream
            .write_command(WorkflowInstanceIntent::ElementCompleted, value(2, "invoice"))
            .unwrap();

        assert_eq!(
            processor.process_next().unwrap().unwrap(),
            ProcessingOutcome::Skipped(SkipReason::NoHandler)
        );
        assert!(processor.process_next().is_none());
        assert_eq!(processor.last_processed_position(), 1);
    }

    #[test]
    fn test_unknown_workflow_is_rejected() {
        let stream = InMemoryLogStream::new(1);
        let mut processor = processor(stream.clone());
        stream
            .write_command(WorkflowInstanceIntent::ElementActivating, value(9, "invoice"))
            .unwrap();

        let err = processor.process_next().unwrap().unwrap_err();
        assert!(matches!(err, WeftError::InvariantViolation { .. }));
        assert_eq!(stream.len(), 1);
    }

    #[test]
    fn test_replay_rebuilds_state() {
        let stream = InMemoryLogStream::new(1);
        let mut original = processor(stream.clone());
        stream
            .write_command(WorkflowInstanceIntent::EventOccurred, value(1, "timer"))
            .unwrap();
        stream
            .write_command(WorkflowInstanceIntent::ElementActivating, value(2, "invoice"))
            .unwrap();
        stream
            .write_command(WorkflowInstanceIntent::ElementActivating, value(1, "order"))
            .unwrap();
        original.process_available();
        let records = stream.records();

        let mut recovered = processor(stream.clone());
        let replayed = recovered.recover();

        assert!(replayed > 0);
        assert_eq!(recovered.state(), original.state());
        assert_eq!(stream.records(), records);

        recovered.process_available();
        assert_eq!(recovered.state(), original.state());
        assert_eq!(stream.records(), records);
    }

    #[tokio::test]
    async fn test_partition_processor_runs_until_shutdown() {
        let stream = InMemoryLogStream::new(1);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(PartitionProcessor::new(processor(stream.clone())).run(shutdown_rx));

        stream
            .write_command(WorkflowInstanceIntent::ElementActivating, value(2, "invoice"))
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while stream.len() < 4 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap();

        shutdown_tx.send(true).unwrap();
        let processor = task.await.unwrap();
        assert_eq!(processor.last_processed_position(), 4);
    }
}

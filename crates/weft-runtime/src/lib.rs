pub mod cluster;
pub mod command;
pub mod processor;
pub mod state;
pub mod stream;
pub mod workflow;

pub use cluster::{HttpTopologyClient, OwnedPartitions, PartitionHolder};
pub use command::{
    execute_command, Command, CommandExceptionHandlingStrategy, CommandExecutor, CommandHandle,
    CommandWrapper, DefaultCommandExceptionHandlingStrategy, Scheduler, TokioScheduler,
};
pub use processor::{
    BpmnStepContext, BpmnStepHandler, PartitionProcessor, ProcessingOutcome, StepHandlerRegistry,
    StreamProcessor,
};
pub use state::{ElementInstanceState, IndexedRecord, WorkflowState};
pub use stream::{InMemoryLogStream, RecordStream, RecordWriter};
pub use workflow::WorkflowRepository;

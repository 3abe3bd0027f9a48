//! BPMN record processing.

mod context;
mod handlers;
mod registry;
mod stream_processor;

pub use context::BpmnStepContext;
pub use handlers::{
    ActivateElementHandler, EventOccurredHandler, TerminateContainerHandler, TriggerEventHandler,
    TriggerStartEventHandler,
};
pub use registry::{BpmnStepHandler, StepHandlerRegistry};
pub use stream_processor::{PartitionProcessor, ProcessingOutcome, SkipReason, StreamProcessor};

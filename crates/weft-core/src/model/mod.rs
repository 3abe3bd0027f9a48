mod element;
mod workflow;

pub use element::{
    ElementKind, EventTrigger, ExecutableCatchEventElement, ExecutableElement,
    ExecutableFlowElementContainer, MessageDefinition, TimerDefinition,
};
pub use workflow::{ExecutableWorkflow, WorkflowBuilder};

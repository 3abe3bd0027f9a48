use weft_core::model::{ExecutableElement, ExecutableFlowElementContainer, ExecutableWorkflow};
use weft_core::{Record, Result, WeftError, WorkflowInstanceRecord};

use crate::state::{ElementInstanceState, WorkflowState};
use crate::stream::RecordWriter;

/// Everything a step handler sees while processing one record.
pub struct BpmnStepContext<'a> {
    record: &'a Record,
    workflow: &'a ExecutableWorkflow,
    element: &'a ExecutableElement,
    state: &'a mut WorkflowState,
    output: &'a mut RecordWriter,
}

impl<'a> BpmnStepContext<'a> {
    pub fn new(
        record: &'a Record,
        workflow: &'a ExecutableWorkflow,
        element: &'a ExecutableElement,
        state: &'a mut WorkflowState,
        output: &'a mut RecordWriter,
    ) -> Self {
        Self {
            record,
            workflow,
            element,
            state,
            output,
        }
    }

    /// The record being processed.
    pub fn record(&self) -> &'a Record {
        self.record
    }

    pub fn value(&self) -> &'a WorkflowInstanceRecord {
        &self.record.value
    }

    pub fn workflow(&self) -> &'a ExecutableWorkflow {
        self.workflow
    }

    /// The element the record targets.
    pub fn element(&self) -> &'a ExecutableElement {
        self.element
    }

    /// The targeted element as a scope.
    pub fn container(&self) -> Result<&'a ExecutableFlowElementContainer> {
        self.element
            .as_container()
            .ok_or_else(|| self.invariant_violation("element is not a flow element container"))
    }

    pub fn state(&self) -> &WorkflowState {
        self.state
    }

    pub fn state_mut(&mut self) -> &mut WorkflowState {
        self.state
    }

    pub fn element_instance_state_mut(&mut self) -> &mut ElementInstanceState {
        self.state.element_instance_state_mut()
    }

    pub fn output(&mut self) -> &mut RecordWriter {
        self.output
    }

    /// Invariant violation attributed to the current record.
    pub fn invariant_violation(&self, reason: impl Into<String>) -> WeftError {
        WeftError::InvariantViolation {
            workflow_instance_key: self.record.value.workflow_instance_key,
            record_key: self.record.key,
            element_id: self.record.value.element_id.clone(),
            reason: reason.into(),
        }
    }
}

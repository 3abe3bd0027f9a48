//! Built-in BPMN step handlers.

use weft_core::record::UNSET_KEY;
use weft_core::{Result, WorkflowInstanceIntent};

use super::context::BpmnStepContext;
use super::registry::BpmnStepHandler;

/// Picks and triggers the start event of a freshly activated scope.
///
/// A none start event is taken immediately. Otherwise the scope was entered
/// through an event, and the start event named by the oldest deferred token
/// of the workflow instance is taken.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerStartEventHandler;

impl BpmnStepHandler for TriggerStartEventHandler {
    fn handle(&self, context: &mut BpmnStepContext<'_>) -> Result<()> {
        let container = context.container()?;
        let record = context.record();
        if context
            .state()
            .element_instance_state()
            .instance(record.key)
            .is_none()
        {
            tracing::debug!(
                key = record.key,
                element_id = %record.value.element_id,
                "Scope is no longer active, not starting it"
            );
            return Ok(());
        }

        let first = &container.start_events()[0];
        let element_id = if first.is_none() {
            first.id.clone()
        } else {
            let workflow_instance_key = record.value.workflow_instance_key;
            let state = context.element_instance_state_mut();
            if !state.has_deferred_tokens(workflow_instance_key) {
                return Err(context.invariant_violation(
                    "scope has no none start event and no deferred token to start from",
                ));
            }
            state.consume_token(workflow_instance_key)?.value.element_id
        };

        let value = record
            .value
            .clone()
            .with_element_id(element_id)
            .with_scope_instance_key(record.key);
        context
            .output()
            .append_new_event(WorkflowInstanceIntent::EventTriggering, value);
        Ok(())
    }
}

/// Tracks a container that is being activated and marks it activated.
///
/// A root process activation without an instance key starts a new workflow
/// instance keyed by the activating record.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivateElementHandler;

impl BpmnStepHandler for ActivateElementHandler {
    fn handle(&self, context: &mut BpmnStepContext<'_>) -> Result<()> {
        let record = context.record();
        let mut value = record.value.clone();
        if value.workflow_instance_key == UNSET_KEY {
            value.workflow_instance_key = record.key;
        }

        context.element_instance_state_mut().new_instance(
            record.key,
            &value,
            WorkflowInstanceIntent::ElementActivated,
        );
        context.output().append_follow_up_event(
            record.key,
            WorkflowInstanceIntent::ElementActivated,
            value,
        );
        Ok(())
    }
}

/// A start event fired: remember which one and activate its scope.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventOccurredHandler;

impl BpmnStepHandler for EventOccurredHandler {
    fn handle(&self, context: &mut BpmnStepContext<'_>) -> Result<()> {
        let record = context.record();
        let start_event_id = record.value.element_id.as_str();
        let scope = context
            .workflow()
            .flow_scope_of(start_event_id)
            .ok_or_else(|| context.invariant_violation("start event has no enclosing scope"))?;

        let mut token = record.value.clone();
        if token.workflow_instance_key == UNSET_KEY {
            token.workflow_instance_key = record.key;
        }
        let activation = token.clone().with_element_id(scope.id());

        context.element_instance_state_mut().defer_token(
            token.workflow_instance_key,
            record.key,
            token,
        );
        context
            .output()
            .append_new_event(WorkflowInstanceIntent::ElementActivating, activation);
        Ok(())
    }
}

/// Acknowledge a triggering start event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerEventHandler;

impl BpmnStepHandler for TriggerEventHandler {
    fn handle(&self, context: &mut BpmnStepContext<'_>) -> Result<()> {
        let record = context.record();
        context.output().append_follow_up_event(
            record.key,
            WorkflowInstanceIntent::EventTriggered,
            record.value.clone(),
        );
        Ok(())
    }
}

/// Terminate a scope: drop it, everything nested in it, and any token still
/// waiting to start it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminateContainerHandler;

impl BpmnStepHandler for TerminateContainerHandler {
    fn handle(&self, context: &mut BpmnStepContext<'_>) -> Result<()> {
        let record = context.record();
        let state = context.element_instance_state_mut();
        let removed = state.remove_instance_tree(record.key);
        if removed.first().map(|i| i.key) != Some(record.key) {
            tracing::debug!(key = record.key, "Terminated scope was not tracked");
        }
        // Tokens of an event-started instance wait in the workflow instance scope.
        if record.value.scope_instance_key == UNSET_KEY {
            state.remove_deferred_tokens(record.value.workflow_instance_key);
        }

        context.output().append_follow_up_event(
            record.key,
            WorkflowInstanceIntent::ElementTerminated,
            record.value.clone(),
        );
        Ok(())
    }
}

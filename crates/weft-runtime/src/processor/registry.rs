use std::collections::HashMap;
use std::sync::Arc;

use weft_core::model::ElementKind;
use weft_core::{Result, WorkflowInstanceIntent};

use super::context::BpmnStepContext;
use super::handlers::{
    ActivateElementHandler, EventOccurredHandler, TerminateContainerHandler,
    TriggerEventHandler, TriggerStartEventHandler,
};

/// One step of BPMN execution.
///
/// A handler mutates state through the context and emits follow-up records
/// to its writer. On error the processor discards both.
pub trait BpmnStepHandler: Send + Sync {
    fn handle(&self, context: &mut BpmnStepContext<'_>) -> Result<()>;
}

impl<F> BpmnStepHandler for F
where
    F: Fn(&mut BpmnStepContext<'_>) -> Result<()> + Send + Sync,
{
    fn handle(&self, context: &mut BpmnStepContext<'_>) -> Result<()> {
        self(context)
    }
}

/// Registry of step handlers by element kind and intent.
#[derive(Clone, Default)]
pub struct StepHandlerRegistry {
    handlers: HashMap<(ElementKind, WorkflowInstanceIntent), Arc<dyn BpmnStepHandler>>,
}

impl StepHandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with the built-in container and start event steps.
    pub fn with_defaults() -> Self {
        use ElementKind::*;
        use WorkflowInstanceIntent::*;

        let mut registry = Self::new();
        for kind in [Process, SubProcess] {
            registry.register(kind, ElementActivating, ActivateElementHandler);
            registry.register(kind, ElementActivated, TriggerStartEventHandler);
            registry.register(kind, ElementTerminating, TerminateContainerHandler);
        }
        registry.register(StartEvent, EventOccurred, EventOccurredHandler);
        registry.register(StartEvent, EventTriggering, TriggerEventHandler);
        registry
    }

    /// Register a handler, replacing any previous one for the same step.
    pub fn register<H>(&mut self, kind: ElementKind, intent: WorkflowInstanceIntent, handler: H)
    where
        H: BpmnStepHandler + 'static,
    {
        self.handlers.insert((kind, intent), Arc::new(handler));
    }

    /// Get the handler for a step.
    pub fn get(
        &self,
        kind: ElementKind,
        intent: WorkflowInstanceIntent,
    ) -> Option<Arc<dyn BpmnStepHandler>> {
        self.handlers.get(&(kind, intent)).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for StepHandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepHandlerRegistry")
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let registry = StepHandlerRegistry::with_defaults();
        assert_eq!(registry.len(), 8);
        assert!(registry
            .get(ElementKind::Process, WorkflowInstanceIntent::ElementActivated)
            .is_some());
        assert!(registry
            .get(ElementKind::SubProcess, WorkflowInstanceIntent::ElementActivated)
            .is_some());
        assert!(registry
            .get(ElementKind::ServiceTask, WorkflowInstanceIntent::ElementActivated)
            .is_none());
    }

    #[test]
    fn test_register_closure_replaces() {
        let mut registry = StepHandlerRegistry::with_defaults();
        let before = registry.len();
        registry.register(
            ElementKind::Process,
            WorkflowInstanceIntent::ElementActivated,
            |_ctx: &mut BpmnStepContext<'_>| -> Result<()> { Ok(()) },
        );
        assert_eq!(registry.len(), before);
        assert!(StepHandlerRegistry::new().is_empty());
    }
}

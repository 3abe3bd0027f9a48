use std::collections::HashMap;

use crate::error::{Result, WeftError};

use super::element::{
    ElementKind, ExecutableCatchEventElement, ExecutableElement, ExecutableFlowElementContainer,
};

/// A deployed, compiled process definition. Shared read-only by all its instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableWorkflow {
    key: i64,
    bpmn_process_id: String,
    version: u32,
    elements: HashMap<String, ExecutableElement>,
}

impl ExecutableWorkflow {
    /// Start building a workflow.
    pub fn builder(key: i64, bpmn_process_id: impl Into<String>, version: u32) -> WorkflowBuilder {
        WorkflowBuilder::new(key, bpmn_process_id, version)
    }

    pub fn key(&self) -> i64 {
        self.key
    }

    pub fn bpmn_process_id(&self) -> &str {
        &self.bpmn_process_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Element by id.
    pub fn element(&self, id: &str) -> Option<&ExecutableElement> {
        self.elements.get(id)
    }

    /// The root process container.
    pub fn process(&self) -> Option<&ExecutableFlowElementContainer> {
        self.element(&self.bpmn_process_id)
            .and_then(ExecutableElement::as_container)
    }

    /// The container declaring the given start event.
    pub fn flow_scope_of(&self, start_event_id: &str) -> Option<&ExecutableFlowElementContainer> {
        self.elements
            .values()
            .filter_map(ExecutableElement::as_container)
            .find(|c| c.start_event(start_event_id).is_some())
    }

    /// Number of elements, start events included.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Builder for [`ExecutableWorkflow`].
#[derive(Debug)]
pub struct WorkflowBuilder {
    key: i64,
    bpmn_process_id: String,
    version: u32,
    containers: Vec<(String, ElementKind, Vec<ExecutableCatchEventElement>)>,
    nodes: Vec<(String, ElementKind)>,
}

impl WorkflowBuilder {
    /// Create a new builder.
    pub fn new(key: i64, bpmn_process_id: impl Into<String>, version: u32) -> Self {
        Self {
            key,
            bpmn_process_id: bpmn_process_id.into(),
            version,
            containers: Vec::new(),
            nodes: Vec::new(),
        }
    }

    /// Define the root process scope; its id is the BPMN process id.
    pub fn process(mut self, start_events: Vec<ExecutableCatchEventElement>) -> Self {
        let id = self.bpmn_process_id.clone();
        self.containers.push((id, ElementKind::Process, start_events));
        self
    }

    /// Add an embedded sub-process scope.
    pub fn sub_process(
        mut self,
        id: impl Into<String>,
        start_events: Vec<ExecutableCatchEventElement>,
    ) -> Self {
        self.containers
            .push((id.into(), ElementKind::SubProcess, start_events));
        self
    }

    /// Add a plain flow node (task, gateway, end event).
    pub fn element(mut self, id: impl Into<String>, kind: ElementKind) -> Self {
        self.nodes.push((id.into(), kind));
        self
    }

    /// Validate and build.
    pub fn build(self) -> Result<ExecutableWorkflow> {
        let mut elements = HashMap::new();

        for (id, kind, start_events) in self.containers {
            let container = ExecutableFlowElementContainer::new(id, kind, start_events)?;
            for event in container.start_events() {
                insert_unique(
                    &mut elements,
                    ExecutableElement::CatchEvent(event.clone()),
                )?;
            }
            insert_unique(&mut elements, ExecutableElement::Container(container))?;
        }

        for (id, kind) in self.nodes {
            if kind.is_container() {
                return Err(WeftError::InvalidArgument(format!(
                    "element '{}' is a {} and must be declared with its start events",
                    id, kind
                )));
            }
            insert_unique(&mut elements, ExecutableElement::FlowNode { id, kind })?;
        }

        let workflow = ExecutableWorkflow {
            key: self.key,
            bpmn_process_id: self.bpmn_process_id,
            version: self.version,
            elements,
        };

        if workflow.process().is_none() {
            return Err(WeftError::InvalidArgument(format!(
                "workflow '{}' has no process scope",
                workflow.bpmn_process_id
            )));
        }

        Ok(workflow)
    }
}

fn insert_unique(
    elements: &mut HashMap<String, ExecutableElement>,
    element: ExecutableElement,
) -> Result<()> {
    let id = element.id().to_string();
    if elements.contains_key(&id) {
        return Err(WeftError::InvalidArgument(format!(
            "duplicate element id '{}'",
            id
        )));
    }
    elements.insert(id, element);
    Ok(())
}

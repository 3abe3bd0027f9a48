use std::collections::HashMap;
use std::sync::Arc;

use weft_core::model::ExecutableWorkflow;
use weft_core::{Result, WeftError};

/// Deployed workflows, keyed by workflow key.
#[derive(Debug, Clone, Default)]
pub struct WorkflowRepository {
    workflows: HashMap<i64, Arc<ExecutableWorkflow>>,
}

impl WorkflowRepository {
    /// Create a new empty repository.
    pub fn new() -> Self {
        Self {
            workflows: HashMap::new(),
        }
    }

    /// Deploy a workflow. Keys are unique.
    pub fn deploy(&mut self, workflow: ExecutableWorkflow) -> Result<Arc<ExecutableWorkflow>> {
        let key = workflow.key();
        if self.workflows.contains_key(&key) {
            return Err(WeftError::InvalidArgument(format!(
                "workflow key {} is already deployed",
                key
            )));
        }

        tracing::debug!(
            workflow_key = key,
            bpmn_process_id = workflow.bpmn_process_id(),
            version = workflow.version(),
            "Workflow deployed"
        );
        let workflow = Arc::new(workflow);
        self.workflows.insert(key, workflow.clone());
        Ok(workflow)
    }

    /// Get a workflow by key.
    pub fn get(&self, workflow_key: i64) -> Option<Arc<ExecutableWorkflow>> {
        self.workflows.get(&workflow_key).cloned()
    }

    /// Get a workflow by process id and version.
    pub fn get_version(&self, bpmn_process_id: &str, version: u32) -> Option<Arc<ExecutableWorkflow>> {
        self.workflows
            .values()
            .find(|w| w.bpmn_process_id() == bpmn_process_id && w.version() == version)
            .cloned()
    }

    /// Highest deployed version of a process.
    pub fn latest(&self, bpmn_process_id: &str) -> Option<Arc<ExecutableWorkflow>> {
        self.workflows
            .values()
            .filter(|w| w.bpmn_process_id() == bpmn_process_id)
            .max_by_key(|w| w.version())
            .cloned()
    }

    /// List all deployed workflows.
    pub fn list(&self) -> Vec<Arc<ExecutableWorkflow>> {
        self.workflows.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

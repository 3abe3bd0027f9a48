use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Marker for a key that was never assigned.
pub const UNSET_KEY: i64 = -1;

/// Payload of a workflow instance record.
///
/// Values are never mutated in place once appended. Handlers derive the next
/// value from the current one with the `with_*` builders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowInstanceRecord {
    pub bpmn_process_id: String,
    pub workflow_key: i64,
    pub workflow_instance_key: i64,
    pub element_id: String,
    pub scope_instance_key: i64,
    #[serde(default)]
    pub variables: BTreeMap<String, serde_json::Value>,
}

impl Default for WorkflowInstanceRecord {
    fn default() -> Self {
        Self {
            bpmn_process_id: String::new(),
            workflow_key: UNSET_KEY,
            workflow_instance_key: UNSET_KEY,
            element_id: String::new(),
            scope_instance_key: UNSET_KEY,
            variables: BTreeMap::new(),
        }
    }
}

impl WorkflowInstanceRecord {
    /// Create a value for an instance of a deployed workflow.
    pub fn new(
        bpmn_process_id: impl Into<String>,
        workflow_key: i64,
        workflow_instance_key: i64,
    ) -> Self {
        Self {
            bpmn_process_id: bpmn_process_id.into(),
            workflow_key,
            workflow_instance_key,
            ..Default::default()
        }
    }

    /// Set the targeted element.
    pub fn with_element_id(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = element_id.into();
        self
    }

    /// Set the enclosing scope instance.
    pub fn with_scope_instance_key(mut self, scope_instance_key: i64) -> Self {
        self.scope_instance_key = scope_instance_key;
        self
    }

    /// Set the workflow instance.
    pub fn with_workflow_instance_key(mut self, workflow_instance_key: i64) -> Self {
        self.workflow_instance_key = workflow_instance_key;
        self
    }

    /// Add or replace one variable.
    pub fn with_variable(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    /// Merge variables, replacing existing names.
    pub fn with_variables(
        mut self,
        variables: impl IntoIterator<Item = (String, serde_json::Value)>,
    ) -> Self {
        self.variables.extend(variables);
        self
    }

    /// Whether the value belongs to a scope.
    pub fn has_scope(&self) -> bool {
        self.scope_instance_key != UNSET_KEY
    }
}

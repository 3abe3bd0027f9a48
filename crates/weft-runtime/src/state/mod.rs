//! Partition-local workflow state.

mod element_instance;

pub use element_instance::{ElementInstance, ElementInstanceState, IndexedRecord};

use std::collections::BTreeSet;

use weft_core::record::UNSET_KEY;

/// All state a partition's processor mutates.
///
/// Mutations made while handling one record are grouped with
/// [`begin`](Self::begin), [`commit`](Self::commit) and [`rollback`](Self::rollback).
#[derive(Debug, Default, PartialEq)]
pub struct WorkflowState {
    element_instance_state: ElementInstanceState,
    blacklist: BTreeSet<i64>,
}

impl WorkflowState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn element_instance_state(&self) -> &ElementInstanceState {
        &self.element_instance_state
    }

    pub fn element_instance_state_mut(&mut self) -> &mut ElementInstanceState {
        &mut self.element_instance_state
    }

    /// Open a transaction. An already open transaction is discarded.
    pub fn begin(&mut self) {
        self.element_instance_state.begin();
    }

    pub fn commit(&mut self) {
        self.element_instance_state.commit();
    }

    /// Undo every mutation since [`begin`](Self::begin).
    pub fn rollback(&mut self) {
        self.element_instance_state.rollback();
    }

    pub fn in_transaction(&self) -> bool {
        self.element_instance_state.in_transaction()
    }

    /// Stop processing records of a workflow instance.
    pub fn blacklist(&mut self, workflow_instance_key: i64) -> bool {
        if workflow_instance_key == UNSET_KEY {
            return false;
        }
        self.blacklist.insert(workflow_instance_key)
    }

    pub fn is_blacklisted(&self, workflow_instance_key: i64) -> bool {
        self.blacklist.contains(&workflow_instance_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_core::WorkflowInstanceRecord;

    #[test]
    fn test_transaction_rollback() {
        let mut state = WorkflowState::new();
        state.begin();
        assert!(state.in_transaction());
        state.element_instance_state_mut().defer_token(
            10,
            1,
            WorkflowInstanceRecord::new("order", 1, 10).with_element_id("timer"),
        );
        state.rollback();

        assert!(!state.in_transaction());
        assert_eq!(state, WorkflowState::new());
    }

    #[test]
    fn test_blacklist() {
        let mut state = WorkflowState::new();
        assert!(state.blacklist(42));
        assert!(!state.blacklist(42));
        assert!(state.is_blacklisted(42));
        assert!(!state.is_blacklisted(43));
        assert!(!state.blacklist(UNSET_KEY));
    }
}

use std::collections::{BTreeMap, VecDeque};

use weft_core::{Result, WeftError, WorkflowInstanceIntent, WorkflowInstanceRecord};

/// A token that reached a scope before its start event was chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRecord {
    /// Key of the record that deferred the token.
    pub index: i64,
    /// Value carried by the token; its element id names the start event to take.
    pub value: WorkflowInstanceRecord,
}

/// A live element instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementInstance {
    pub key: i64,
    pub parent_key: i64,
    pub workflow_instance_key: i64,
    pub element_id: String,
    pub intent: WorkflowInstanceIntent,
}

#[derive(Debug)]
enum Undo {
    Instance {
        key: i64,
        previous: Option<ElementInstance>,
    },
    ConsumedToken {
        scope_key: i64,
        token: IndexedRecord,
    },
    DeferredToken {
        scope_key: i64,
    },
    RemovedTokens {
        scope_key: i64,
        tokens: VecDeque<IndexedRecord>,
    },
}

/// Deferred tokens and element instances of one partition.
///
/// While a transaction is open every mutation is journaled so that
/// [`rollback`](Self::rollback) restores the state seen at [`begin`](Self::begin).
#[derive(Debug, Default)]
pub struct ElementInstanceState {
    deferred_tokens: BTreeMap<i64, VecDeque<IndexedRecord>>,
    instances: BTreeMap<i64, ElementInstance>,
    journal: Option<Vec<Undo>>,
}

impl PartialEq for ElementInstanceState {
    fn eq(&self, other: &Self) -> bool {
        self.deferred_tokens == other.deferred_tokens && self.instances == other.instances
    }
}

impl ElementInstanceState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a scope's deferred tokens, oldest first.
    pub fn get_deferred_tokens(&self, scope_key: i64) -> Vec<IndexedRecord> {
        self.deferred_tokens
            .get(&scope_key)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_deferred_tokens(&self, scope_key: i64) -> bool {
        self.deferred_tokens.contains_key(&scope_key)
    }

    pub fn deferred_token_count(&self, scope_key: i64) -> usize {
        self.deferred_tokens.get(&scope_key).map_or(0, VecDeque::len)
    }

    /// Remove and return the oldest deferred token of a scope.
    ///
    /// Callers check for tokens first; an empty queue is a programming error.
    pub fn consume_token(&mut self, scope_key: i64) -> Result<IndexedRecord> {
        let queue = self
            .deferred_tokens
            .get_mut(&scope_key)
            .ok_or(WeftError::NoDeferredToken {
                scope_instance_key: scope_key,
            })?;
        let token = queue.pop_front().ok_or(WeftError::NoDeferredToken {
            scope_instance_key: scope_key,
        })?;
        if queue.is_empty() {
            self.deferred_tokens.remove(&scope_key);
        }
        self.record(Undo::ConsumedToken {
            scope_key,
            token: token.clone(),
        });
        Ok(token)
    }

    /// Append a token to a scope's queue.
    pub fn defer_token(&mut self, scope_key: i64, index: i64, value: WorkflowInstanceRecord) {
        self.deferred_tokens
            .entry(scope_key)
            .or_default()
            .push_back(IndexedRecord { index, value });
        self.record(Undo::DeferredToken { scope_key });
    }

    /// Discard every deferred token of a scope.
    pub fn remove_deferred_tokens(&mut self, scope_key: i64) -> Vec<IndexedRecord> {
        match self.deferred_tokens.remove(&scope_key) {
            Some(tokens) => {
                let discarded = tokens.iter().cloned().collect();
                self.record(Undo::RemovedTokens { scope_key, tokens });
                discarded
            }
            None => Vec::new(),
        }
    }

    /// Track a new element instance. Its parent is the value's scope.
    pub fn new_instance(
        &mut self,
        key: i64,
        value: &WorkflowInstanceRecord,
        intent: WorkflowInstanceIntent,
    ) -> &ElementInstance {
        let instance = ElementInstance {
            key,
            parent_key: value.scope_instance_key,
            workflow_instance_key: value.workflow_instance_key,
            element_id: value.element_id.clone(),
            intent,
        };
        let previous = self.instances.insert(key, instance);
        self.record(Undo::Instance { key, previous });
        &self.instances[&key]
    }

    pub fn instance(&self, key: i64) -> Option<&ElementInstance> {
        self.instances.get(&key)
    }

    /// Move an instance to a new lifecycle state.
    pub fn update_intent(&mut self, key: i64, intent: WorkflowInstanceIntent) -> Result<()> {
        let instance = self
            .instances
            .get_mut(&key)
            .ok_or_else(|| WeftError::NotFound(format!("element instance {}", key)))?;
        let previous = instance.clone();
        instance.intent = intent;
        self.record(Undo::Instance {
            key,
            previous: Some(previous),
        });
        Ok(())
    }

    /// Forget an instance together with the tokens deferred into its scope.
    pub fn remove_instance(&mut self, key: i64) -> Option<ElementInstance> {
        self.remove_deferred_tokens(key);
        let removed = self.instances.remove(&key);
        if let Some(instance) = &removed {
            self.record(Undo::Instance {
                key,
                previous: Some(instance.clone()),
            });
        }
        removed
    }

    /// Forget a scope instance and everything nested below it, with the
    /// tokens deferred into any of those scopes.
    ///
    /// Returns the removed instances, parents before their children.
    pub fn remove_instance_tree(&mut self, key: i64) -> Vec<ElementInstance> {
        let mut removed = Vec::new();
        let mut pending = vec![key];
        while let Some(key) = pending.pop() {
            pending.extend(self.child_instances(key).iter().map(|c| c.key));
            if let Some(instance) = self.remove_instance(key) {
                removed.push(instance);
            }
        }
        removed
    }

    /// Direct children of a scope instance.
    pub fn child_instances(&self, parent_key: i64) -> Vec<&ElementInstance> {
        self.instances
            .values()
            .filter(|i| i.parent_key == parent_key)
            .collect()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    pub(crate) fn begin(&mut self) {
        self.journal = Some(Vec::new());
    }

    pub(crate) fn commit(&mut self) {
        self.journal = None;
    }

    pub(crate) fn rollback(&mut self) {
        let Some(journal) = self.journal.take() else {
            return;
        };
        for undo in journal.into_iter().rev() {
            match undo {
                Undo::Instance { key, previous } => match previous {
                    Some(instance) => {
                        self.instances.insert(key, instance);
                    }
                    None => {
                        self.instances.remove(&key);
                    }
                },
                Undo::ConsumedToken { scope_key, token } => {
                    self.deferred_tokens
                        .entry(scope_key)
                        .or_default()
                        .push_front(token);
                }
                Undo::DeferredToken { scope_key } => {
                    if let Some(queue) = self.deferred_tokens.get_mut(&scope_key) {
                        queue.pop_back();
                        if queue.is_empty() {
                            self.deferred_tokens.remove(&scope_key);
                        }
                    }
                }
                Undo::RemovedTokens { scope_key, tokens } => {
                    self.deferred_tokens.insert(scope_key, tokens);
                }
            }
        }
    }

    pub(crate) fn in_transaction(&self) -> bool {
        self.journal.is_some()
    }

    fn record(&mut self, undo: Undo) {
        if let Some(journal) = self.journal.as_mut() {
            journal.push(undo);
        }
    }
}

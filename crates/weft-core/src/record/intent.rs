use serde::{Deserialize, Serialize};

/// Lifecycle transitions of workflow instance elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowInstanceIntent {
    ElementActivating,
    ElementActivated,
    ElementCompleting,
    ElementCompleted,
    ElementTerminating,
    ElementTerminated,
    EventOccurred,
    EventTriggering,
    EventTriggered,
    SequenceFlowTaken,
}

impl WorkflowInstanceIntent {
    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ElementActivating => "ELEMENT_ACTIVATING",
            Self::ElementActivated => "ELEMENT_ACTIVATED",
            Self::ElementCompleting => "ELEMENT_COMPLETING",
            Self::ElementCompleted => "ELEMENT_COMPLETED",
            Self::ElementTerminating => "ELEMENT_TERMINATING",
            Self::ElementTerminated => "ELEMENT_TERMINATED",
            Self::EventOccurred => "EVENT_OCCURRED",
            Self::EventTriggering => "EVENT_TRIGGERING",
            Self::EventTriggered => "EVENT_TRIGGERED",
            Self::SequenceFlowTaken => "SEQUENCE_FLOW_TAKEN",
        }
    }

    /// Parse from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ELEMENT_ACTIVATING" => Some(Self::ElementActivating),
            "ELEMENT_ACTIVATED" => Some(Self::ElementActivated),
            "ELEMENT_COMPLETING" => Some(Self::ElementCompleting),
            "ELEMENT_COMPLETED" => Some(Self::ElementCompleted),
            "ELEMENT_TERMINATING" => Some(Self::ElementTerminating),
            "ELEMENT_TERMINATED" => Some(Self::ElementTerminated),
            "EVENT_OCCURRED" => Some(Self::EventOccurred),
            "EVENT_TRIGGERING" => Some(Self::EventTriggering),
            "EVENT_TRIGGERED" => Some(Self::EventTriggered),
            "SEQUENCE_FLOW_TAKEN" => Some(Self::SequenceFlowTaken),
            _ => None,
        }
    }

    /// Whether the element instance is gone after this transition.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::ElementCompleted | Self::ElementTerminated)
    }
}

impl std::fmt::Display for WorkflowInstanceIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

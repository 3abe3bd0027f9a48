use std::time::Duration;

use crate::error::{Result, WeftError};

/// Kind of a compiled BPMN element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Process,
    SubProcess,
    StartEvent,
    IntermediateCatchEvent,
    ServiceTask,
    ExclusiveGateway,
    EndEvent,
}

impl ElementKind {
    /// Convert to string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Process => "process",
            Self::SubProcess => "sub_process",
            Self::StartEvent => "start_event",
            Self::IntermediateCatchEvent => "intermediate_catch_event",
            Self::ServiceTask => "service_task",
            Self::ExclusiveGateway => "exclusive_gateway",
            Self::EndEvent => "end_event",
        }
    }

    /// Whether elements of this kind own a scope with start events.
    pub fn is_container(&self) -> bool {
        matches!(self, Self::Process | Self::SubProcess)
    }
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Timer trigger of a catch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerDefinition {
    pub duration: Duration,
}

/// Message trigger of a catch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDefinition {
    pub name: String,
    pub correlation_key: Option<String>,
}

/// What makes a catch event fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTrigger {
    /// Fires unconditionally.
    None,
    Timer(TimerDefinition),
    Message(MessageDefinition),
}

/// A compiled catch event, e.g. a start event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableCatchEventElement {
    pub id: String,
    pub kind: ElementKind,
    pub trigger: EventTrigger,
}

impl ExecutableCatchEventElement {
    /// A none start event.
    pub fn none(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ElementKind::StartEvent,
            trigger: EventTrigger::None,
        }
    }

    /// A timer start event.
    pub fn timer(id: impl Into<String>, duration: Duration) -> Self {
        Self {
            id: id.into(),
            kind: ElementKind::StartEvent,
            trigger: EventTrigger::Timer(TimerDefinition { duration }),
        }
    }

    /// A message start event.
    pub fn message(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: ElementKind::StartEvent,
            trigger: EventTrigger::Message(MessageDefinition {
                name: name.into(),
                correlation_key: None,
            }),
        }
    }

    /// Change the element kind, e.g. to an intermediate catch event.
    pub fn with_kind(mut self, kind: ElementKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn is_none(&self) -> bool {
        matches!(self.trigger, EventTrigger::None)
    }

    pub fn is_timer(&self) -> bool {
        matches!(self.trigger, EventTrigger::Timer(_))
    }

    pub fn is_message(&self) -> bool {
        matches!(self.trigger, EventTrigger::Message(_))
    }
}

/// A compiled scope (process or sub-process) and its start events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableFlowElementContainer {
    id: String,
    kind: ElementKind,
    start_events: Vec<ExecutableCatchEventElement>,
}

impl ExecutableFlowElementContainer {
    /// Create a container. It needs at least one start event.
    pub fn new(
        id: impl Into<String>,
        kind: ElementKind,
        start_events: Vec<ExecutableCatchEventElement>,
    ) -> Result<Self> {
        let id = id.into();
        if !kind.is_container() {
            return Err(WeftError::InvalidArgument(format!(
                "element '{}' of kind {} cannot contain start events",
                id, kind
            )));
        }
        if start_events.is_empty() {
            return Err(WeftError::InvalidArgument(format!(
                "container '{}' has no start event",
                id
            )));
        }
        Ok(Self {
            id,
            kind,
            start_events,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    /// Start events in declaration order. Never empty.
    pub fn start_events(&self) -> &[ExecutableCatchEventElement] {
        &self.start_events
    }

    /// The first none start event, if any.
    pub fn none_start_event(&self) -> Option<&ExecutableCatchEventElement> {
        self.start_events.iter().find(|e| e.is_none())
    }

    /// Start event by id.
    pub fn start_event(&self, id: &str) -> Option<&ExecutableCatchEventElement> {
        self.start_events.iter().find(|e| e.id == id)
    }
}

/// Any compiled element, tagged by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutableElement {
    Container(ExecutableFlowElementContainer),
    CatchEvent(ExecutableCatchEventElement),
    FlowNode { id: String, kind: ElementKind },
}

impl ExecutableElement {
    pub fn id(&self) -> &str {
        match self {
            Self::Container(c) => c.id(),
            Self::CatchEvent(e) => &e.id,
            Self::FlowNode { id, .. } => id,
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Container(c) => c.kind(),
            Self::CatchEvent(e) => e.kind,
            Self::FlowNode { kind, .. } => *kind,
        }
    }

    pub fn as_container(&self) -> Option<&ExecutableFlowElementContainer> {
        match self {
            Self::Container(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_catch_event(&self) -> Option<&ExecutableCatchEventElement> {
        match self {
            Self::CatchEvent(e) => Some(e),
            _ => None,
        }
    }
}

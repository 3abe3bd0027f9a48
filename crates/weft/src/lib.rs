//! Weft: a partitioned, event-sourced BPMN workflow engine core.

pub mod observability;
mod runtime;

pub use runtime::prelude;
pub use runtime::{LogStreamFactory, LogStreams, Weft, WeftBuilder};

pub use weft_core as core;
pub use weft_runtime as engine;

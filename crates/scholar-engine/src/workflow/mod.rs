//! Graph definitions, run state, and the sequential executor.

mod graph;
mod runner;
mod state;

pub use graph::{END, GraphBuilder, GraphDefinition, NodeOutcome, Transition, WorkflowNode};
pub use runner::WorkflowRunner;
pub use state::{StateUpdate, WorkflowState};

//! Workflow orchestration for the scholar tutoring engine.
//!
//! Three fixed graphs — explain, quiz, and coach — sequence retrieval against
//! the external generator and document store. The graph executor is a minimal
//! sequential runner over statically-wired nodes; the [`LearningEngine`]
//! facade owns the collaborator handles and exposes the ingest/retrieve/run
//! surface to the host system.

mod engine;
/// Node implementations for the explain, quiz, and coach graphs.
pub mod nodes;
/// Quiz-history aggregation for the coach graph.
pub mod progress;
mod prompts;
/// Graph definitions, run state, and the sequential executor.
pub mod workflow;

pub use engine::LearningEngine;
pub use progress::compute_progress;
pub use workflow::{
    END, GraphBuilder, GraphDefinition, NodeOutcome, StateUpdate, Transition, WorkflowNode,
    WorkflowRunner, WorkflowState,
};

//! Nodes of the coach graph.

use std::sync::Arc;

use async_trait::async_trait;
use scholar_core::{Error, GenerationRequest, Generator, Persistence, Result};
use serde_json::{Value, json};

use crate::progress::compute_progress;
use crate::prompts;
use crate::workflow::{NodeOutcome, StateUpdate, WorkflowNode, WorkflowState};

/// Fetches the learner's quiz responses and aggregates them.
pub struct ComputeProgress {
    /// External document store.
    persistence: Arc<dyn Persistence>,
}

impl ComputeProgress {
    /// Creates the node over a shared persistence handle.
    pub fn new(persistence: Arc<dyn Persistence>) -> Self {
        Self { persistence }
    }
}

#[async_trait]
impl WorkflowNode for ComputeProgress {
    fn name(&self) -> &'static str {
        "compute_progress"
    }

    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let user_id = state.require_str("user_id")?;

        let responses = self
            .persistence
            .find("responses", &json!({"user_id": user_id}))
            .await?;

        let summary = compute_progress(user_id, &responses);

        Ok(NodeOutcome::advance(
            StateUpdate::new().set("progress_summary", serde_json::to_value(summary)?),
        ))
    }
}

/// Turns the progress summary into coaching advice.
pub struct Coaching {
    /// External text generator.
    generator: Arc<dyn Generator>,
}

impl Coaching {
    /// Creates the node over a shared generator handle.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl WorkflowNode for Coaching {
    fn name(&self) -> &'static str {
        "coaching"
    }

    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let summary = state.get("progress_summary").ok_or_else(|| {
            Error::InvalidParameter("run reached coaching without a progress summary".to_owned())
        })?;
        let summary_text = serde_json::to_string_pretty(summary)?;

        let request = GenerationRequest::new(prompts::coaching_advice(&summary_text))
            .with_system(prompts::COACH_SYSTEM);
        let advice = self.generator.generate(&request).await?;

        Ok(NodeOutcome::advance(
            StateUpdate::new().set("advice", Value::String(advice)),
        ))
    }
}

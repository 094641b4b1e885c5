//! Nodes of the explain graph.

use std::sync::Arc;

use async_trait::async_trait;
use scholar_core::{DifficultyLevel, Error, GenerationRequest, Generator, Result};
use scholar_retrieval::{EmbeddingProvider, Retriever};
use serde_json::{Value, json};

use crate::prompts;
use crate::workflow::{NodeOutcome, StateUpdate, WorkflowNode, WorkflowState};

/// Retrieves study-material context for the student's question.
///
/// `mode: "raw"` bypasses retrieval and uses `raw_text` directly as the sole
/// context entry; otherwise the question is embedded and the top `k` chunks
/// (payload override or engine default) become the context.
pub struct RetrieveContext<E: EmbeddingProvider> {
    /// Shared retrieval handle.
    retriever: Arc<Retriever<E>>,
    /// Neighbors fetched when the payload does not override `k`.
    default_k: usize,
}

impl<E: EmbeddingProvider> RetrieveContext<E> {
    /// Creates the node over a shared retriever.
    pub fn new(retriever: Arc<Retriever<E>>, default_k: usize) -> Self {
        Self {
            retriever,
            default_k,
        }
    }
}

#[async_trait]
impl<E: EmbeddingProvider + 'static> WorkflowNode for RetrieveContext<E> {
    fn name(&self) -> &'static str {
        "retrieve_context"
    }

    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        match state.opt_str("mode")? {
            Some("raw") => {
                let raw_text = state.require_str("raw_text")?;
                return Ok(NodeOutcome::advance(
                    StateUpdate::new().set("context", json!([raw_text])),
                ));
            }
            None | Some("retrieval") => {}
            Some(other) => {
                return Err(Error::InvalidParameter(format!(
                    "unknown explain mode '{other}' (expected raw or retrieval)"
                )));
            }
        }

        let question = state.require_str("question")?;
        let k = state
            .opt_u64("k")?
            .map_or(self.default_k, |value| value as usize);

        let hits = self.retriever.retrieve(question, k).await?;
        let context: Vec<Value> = hits
            .into_iter()
            .map(|hit| Value::String(hit.chunk.text))
            .collect();

        Ok(NodeOutcome::advance(
            StateUpdate::new().set("context", Value::Array(context)),
        ))
    }
}

/// Generates the explanation from the gathered context.
pub struct GenerateExplanation {
    /// External text generator.
    generator: Arc<dyn Generator>,
}

impl GenerateExplanation {
    /// Creates the node over a shared generator handle.
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl WorkflowNode for GenerateExplanation {
    fn name(&self) -> &'static str {
        "generate_explanation"
    }

    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let level = match state.opt_str("difficulty_level")? {
            Some(text) => text.parse::<DifficultyLevel>()?,
            None => DifficultyLevel::default(),
        };
        let context: Vec<String> = state.field("context")?.unwrap_or_default();
        let question = state.opt_str("question")?;

        let prompt = match (question, context.is_empty()) {
            (Some(question), false) => prompts::explain_with_context(question, level, &context),
            (Some(question), true) => prompts::explain_without_context(question, level),
            (None, false) => prompts::explain_content(&context.join("\n\n"), level),
            (None, true) => {
                return Err(Error::InvalidParameter(
                    "explain run has neither a question nor raw text".to_owned(),
                ));
            }
        };

        let request = GenerationRequest::new(prompt).with_system(prompts::EXPLAINER_SYSTEM);
        let explanation = self.generator.generate(&request).await?;

        Ok(NodeOutcome::advance(
            StateUpdate::new().set("explanation", Value::String(explanation)),
        ))
    }
}

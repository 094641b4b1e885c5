//! Nodes of the quiz graph.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use scholar_core::{Error, GenerationRequest, Generator, Mcq, Persistence, Result};
use scholar_retrieval::{EmbeddingProvider, Retriever};
use serde_json::json;
use tracing::warn;

use crate::prompts;
use crate::workflow::{NodeOutcome, StateUpdate, WorkflowNode, WorkflowState};

/// Chunks of study material retrieved per quiz topic.
const QUIZ_CONTEXT_K: usize = 5;
/// Questions generated when the payload does not override `num_questions`.
const DEFAULT_QUESTION_COUNT: u64 = 5;
/// Difficulty used when the payload does not override `difficulty`.
const DEFAULT_QUIZ_DIFFICULTY: &str = "medium";

/// Retrieves topic material and generates validated multiple-choice questions.
///
/// The generator's output must parse into the MCQ shape; malformed output
/// aborts the run with `GenerationFormat` rather than being coerced.
pub struct GenerateMcqs<E: EmbeddingProvider> {
    /// Shared retrieval handle.
    retriever: Arc<Retriever<E>>,
    /// External text generator.
    generator: Arc<dyn Generator>,
}

impl<E: EmbeddingProvider> GenerateMcqs<E> {
    /// Creates the node over shared retriever and generator handles.
    pub fn new(retriever: Arc<Retriever<E>>, generator: Arc<dyn Generator>) -> Self {
        Self {
            retriever,
            generator,
        }
    }
}

/// Strips a Markdown code fence if the generator wrapped its JSON in one.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim()
}

/// Parses and validates generator output into MCQs.
///
/// # Errors
/// Returns `GenerationFormat` if the text is not a JSON array of well-formed
/// questions, or if the array is empty.
fn parse_mcqs(text: &str) -> Result<Vec<Mcq>> {
    let payload = strip_code_fence(text);
    let mcqs: Vec<Mcq> = serde_json::from_str(payload).map_err(|error| {
        Error::GenerationFormat(format!("expected a JSON array of questions: {error}"))
    })?;

    if mcqs.is_empty() {
        return Err(Error::GenerationFormat(
            "generator returned no questions".to_owned(),
        ));
    }
    for mcq in &mcqs {
        mcq.validate()?;
    }
    Ok(mcqs)
}

#[async_trait]
impl<E: EmbeddingProvider + 'static> WorkflowNode for GenerateMcqs<E> {
    fn name(&self) -> &'static str {
        "generate_mcqs"
    }

    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let topic = state.require_str("topic")?;
        let count = state
            .opt_u64("num_questions")?
            .unwrap_or(DEFAULT_QUESTION_COUNT);
        let difficulty = state.opt_str("difficulty")?.unwrap_or(DEFAULT_QUIZ_DIFFICULTY);

        let hits = self.retriever.retrieve(topic, QUIZ_CONTEXT_K).await?;
        let context: Vec<String> = hits.into_iter().map(|hit| hit.chunk.text).collect();

        let prompt = prompts::quiz_questions(topic, count, difficulty, &context);
        let request = GenerationRequest::new(prompt)
            .with_system(prompts::QUIZ_SYSTEM)
            .with_constraint("temperature", json!(0.2));
        let text = self.generator.generate(&request).await?;

        let mcqs = parse_mcqs(&text)?;

        Ok(NodeOutcome::advance(
            StateUpdate::new().set("mcqs", serde_json::to_value(&mcqs)?),
        ))
    }
}

/// Persists the generated quiz and reports its id.
pub struct SaveQuiz {
    /// External document store.
    persistence: Arc<dyn Persistence>,
    /// Save attempts before the failure surfaces.
    max_attempts: usize,
}

impl SaveQuiz {
    /// Creates the node over a shared persistence handle.
    pub fn new(persistence: Arc<dyn Persistence>, max_attempts: usize) -> Self {
        Self {
            persistence,
            max_attempts: max_attempts.max(1),
        }
    }
}

#[async_trait]
impl WorkflowNode for SaveQuiz {
    fn name(&self) -> &'static str {
        "save_quiz"
    }

    async fn run(&self, state: &WorkflowState) -> Result<NodeOutcome> {
        let user_id = state.require_str("user_id")?;
        let topic = state.require_str("topic")?;
        let mcqs = state
            .get("mcqs")
            .cloned()
            .ok_or_else(|| Error::InvalidParameter("run reached save_quiz without mcqs".to_owned()))?;

        let record = json!({
            "user_id": user_id,
            "topic": topic,
            "mcqs": mcqs,
            "created_at": Utc::now().to_rfc3339(),
        });

        let mut attempt = 0;
        let quiz_id = loop {
            attempt += 1;
            match self.persistence.save("quizzes", record.clone()).await {
                Ok(id) => break id,
                Err(error) if error.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        "quiz save attempt {attempt}/{} failed: {error}; retrying",
                        self.max_attempts
                    );
                }
                Err(error) => return Err(error),
            }
        };

        Ok(NodeOutcome::advance(
            StateUpdate::new().set("quiz_id", json!(quiz_id)),
        ))
    }
}

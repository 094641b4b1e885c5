//! Engine facade wiring retrieval, graphs, and collaborator handles.

use std::sync::Arc;
use std::time::Duration;

use scholar_core::{
    ChunkId, EngineConfig, Error, Generator, Persistence, Result, RetrievalResult, TextSource,
};
use scholar_providers::{MemoryStore, OpenRouterGenerator};
use scholar_retrieval::{EmbeddingProvider, OllamaEmbeddingClient, Retriever};
use serde_json::Value;
use tracing::info;

use crate::nodes::{
    Coaching, ComputeProgress, GenerateExplanation, GenerateMcqs, RetrieveContext, SaveQuiz,
};
use crate::workflow::{GraphDefinition, WorkflowRunner, WorkflowState};

/// The core surface exposed to the rest of the system.
///
/// Owns the collaborator handles (embedder, generator, persistence) injected
/// at construction — lifecycle belongs to the process bootstrap, not to the
/// graph logic. Shares one retriever across the explain and quiz graphs and
/// runs every workflow over its own independent state.
pub struct LearningEngine<E: EmbeddingProvider = OllamaEmbeddingClient> {
    /// Engine configuration.
    config: EngineConfig,
    /// Shared ingestion/retrieval handle.
    retriever: Arc<Retriever<E>>,
    /// Executor over the three registered graphs.
    runner: WorkflowRunner,
}

impl LearningEngine<OllamaEmbeddingClient> {
    /// Creates an engine with the default collaborator stack: a local Ollama
    /// embedder, an OpenRouter generator, and an in-process document store.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or no OpenRouter API
    /// key is available.
    pub fn new(config: EngineConfig) -> Result<Self> {
        let embedder = OllamaEmbeddingClient::new(config.models.embedding_model.clone());
        let generator: Arc<dyn Generator> = Arc::new(
            OpenRouterGenerator::from_config_or_env(config.models.openrouter_key.clone())?
                .with_model(config.models.generator_model.clone()),
        );
        let persistence: Arc<dyn Persistence> = Arc::new(MemoryStore::new());
        Self::with_collaborators(config, embedder, generator, persistence)
    }
}

impl<E: EmbeddingProvider + 'static> LearningEngine<E> {
    /// Creates an engine over explicit collaborator handles.
    ///
    /// # Errors
    /// Returns an error if the configuration or graph wiring is invalid.
    pub fn with_collaborators(
        config: EngineConfig,
        embedder: E,
        generator: Arc<dyn Generator>,
        persistence: Arc<dyn Persistence>,
    ) -> Result<Self> {
        config.validate()?;

        let retriever = Arc::new(
            Retriever::with_provider(embedder)
                .with_chunking(config.chunking.size, config.chunking.overlap),
        );

        let explain = GraphDefinition::builder("explain")
            .node(Arc::new(RetrieveContext::new(
                Arc::clone(&retriever),
                config.retrieval.default_k,
            )))
            .node(Arc::new(GenerateExplanation::new(Arc::clone(&generator))))
            .edge("retrieve_context", "generate_explanation")
            .edge_to_end("generate_explanation")
            .entry("retrieve_context")
            .build()?;

        let quiz = GraphDefinition::builder("quiz")
            .node(Arc::new(GenerateMcqs::new(
                Arc::clone(&retriever),
                Arc::clone(&generator),
            )))
            .node(Arc::new(SaveQuiz::new(
                Arc::clone(&persistence),
                config.execution.persistence_max_attempts,
            )))
            .edge("generate_mcqs", "save_quiz")
            .edge_to_end("save_quiz")
            .entry("generate_mcqs")
            .build()?;

        let coach = GraphDefinition::builder("coach")
            .node(Arc::new(ComputeProgress::new(Arc::clone(&persistence))))
            .node(Arc::new(Coaching::new(generator)))
            .edge("compute_progress", "coaching")
            .edge_to_end("coaching")
            .entry("compute_progress")
            .build()?;

        let runner = WorkflowRunner::new(Duration::from_secs(config.execution.node_timeout_secs))
            .register(explain)
            .register(quiz)
            .register(coach);

        Ok(Self {
            config,
            retriever,
            runner,
        })
    }

    /// Checks collaborator availability and loads the library snapshot if one
    /// exists.
    ///
    /// # Errors
    /// Returns `EmbeddingUnavailable` if the embedding model cannot be
    /// reached, or a snapshot error if one exists but cannot be decoded.
    pub async fn initialize(&self) -> Result<()> {
        self.retriever.ensure_ready().await?;

        if self.retriever.load_snapshot(&self.config.snapshot_path())? {
            info!("restored {} indexed chunks from snapshot", self.retriever.len());
        }
        Ok(())
    }

    /// Ingests raw text under a source id and persists a fresh snapshot.
    ///
    /// # Errors
    /// Returns `EmbeddingUnavailable` if embedding fails (nothing is
    /// inserted) or a snapshot error if the new state cannot be saved.
    pub async fn ingest(&self, text: &str, source_id: &str) -> Result<Vec<ChunkId>> {
        let ids = self.retriever.ingest(text, source_id).await?;
        if !ids.is_empty() {
            self.persist_snapshot().await?;
        }
        Ok(ids)
    }

    /// Ingests whatever a text source produces.
    ///
    /// # Errors
    /// Propagates source failures and everything [`Self::ingest`] can return.
    pub async fn ingest_source(
        &self,
        source: &dyn TextSource,
        source_id: &str,
    ) -> Result<Vec<ChunkId>> {
        let text = source.produce_text()?;
        self.ingest(&text, source_id).await
    }

    /// Removes a source document's chunks from index and store together.
    ///
    /// # Errors
    /// Returns a snapshot error if the new state cannot be saved.
    pub async fn remove_source(&self, source_id: &str) -> Result<Vec<ChunkId>> {
        let removed = self.retriever.remove_source(source_id);
        if !removed.is_empty() {
            self.persist_snapshot().await?;
        }
        Ok(removed)
    }

    /// Returns the top `k` chunks for a query, most relevant first.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for `k == 0` and `EmbeddingUnavailable` if
    /// the query cannot be embedded.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<RetrievalResult> {
        self.retriever.retrieve(query, k).await
    }

    /// Runs a named graph over the caller's payload and returns the final
    /// state.
    ///
    /// # Errors
    /// Returns `InvalidParameter` for unknown graph names and a node-wrapped
    /// failure if the run aborts.
    pub async fn run_workflow(&self, graph_name: &str, payload: Value) -> Result<WorkflowState> {
        self.runner.run(graph_name, payload).await
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of indexed chunks.
    pub fn indexed_chunks(&self) -> usize {
        self.retriever.len()
    }

    /// Writes the library snapshot off the async runtime's worker threads.
    async fn persist_snapshot(&self) -> Result<()> {
        let retriever = Arc::clone(&self.retriever);
        let path = self.config.snapshot_path();
        tokio::task::spawn_blocking(move || retriever.save_snapshot(&path))
            .await
            .map_err(|error| Error::Other(format!("snapshot task failed: {error}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scholar_providers::MockGenerator;
    use scholar_retrieval::HashEmbeddingClient;

    fn engine() -> LearningEngine<HashEmbeddingClient> {
        let mut config = EngineConfig::default();
        config.storage.data_dir = std::env::temp_dir().join("scholar-engine-test");
        let built = LearningEngine::with_collaborators(
            config,
            HashEmbeddingClient::with_dimension(32),
            Arc::new(MockGenerator::new().with_default_response("ok")),
            Arc::new(MemoryStore::new()),
        );
        match built {
            Ok(engine) => engine,
            Err(error) => panic!("engine construction failed: {error}"),
        }
    }

    #[tokio::test]
    async fn registers_the_three_graphs() {
        let engine = engine();
        let mut names = engine.runner.graph_names();
        names.sort_unstable();
        assert_eq!(names, vec!["coach", "explain", "quiz"]);
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.chunking.overlap = config.chunking.size + 1;

        let built = LearningEngine::with_collaborators(
            config,
            HashEmbeddingClient::with_dimension(32),
            Arc::new(MockGenerator::new()) as Arc<dyn Generator>,
            Arc::new(MemoryStore::new()) as Arc<dyn Persistence>,
        );
        assert!(matches!(built, Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn unknown_workflow_is_rejected() {
        let engine = engine();
        let result = engine
            .run_workflow("daydream", serde_json::json!({}))
            .await;
        assert!(matches!(result, Err(Error::InvalidParameter(_))));
    }
}

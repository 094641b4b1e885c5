//! Core types and traits for the scholar engine.
//!
//! This crate provides the shared data model, error taxonomy, collaborator
//! trait definitions, and configuration used across the scholar workspace.

/// Configuration types for chunking, retrieval, models, and execution.
pub mod config;
/// Error types and result definitions.
pub mod error;
/// Synchronization utilities for handling poisoned locks.
pub mod sync;
/// Trait definitions for external collaborators.
pub mod traits;
/// Core data types for chunks, retrieval results, and workflow payloads.
pub mod types;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use sync::{IgnoreLock, IgnoreRwLock};
pub use traits::{Generator, Persistence, TextSource};
pub use types::{
    Chunk, ChunkId, DifficultyLevel, GenerationRequest, Mcq, ProgressSummary, RetrievalResult,
    ScoredChunk, TopicStat,
};

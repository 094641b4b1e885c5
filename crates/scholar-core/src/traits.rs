use async_trait::async_trait;
use serde_json::Value;

use crate::{GenerationRequest, Result};

/// Trait for external text generators (LLM calls).
///
/// Generators may fail with `GeneratorUnavailable` or return malformed text;
/// callers that expect structured output must validate it rather than trust it.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Returns the unique identifier for this generator.
    fn name(&self) -> &'static str;

    /// Checks whether this generator is currently able to serve requests.
    async fn is_available(&self) -> bool;

    /// Generates free text for the given request.
    ///
    /// # Errors
    ///
    /// Returns an error if the generator is unavailable, the request fails,
    /// or the response cannot be read.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

/// Trait for the external document store.
///
/// Assumed durable and available; failures surface as `Persistence` errors
/// and are retried only a bounded number of times by callers.
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Stores a record in the named collection and returns its identifier.
    ///
    /// # Errors
    /// Returns an error if the record cannot be written.
    async fn save(&self, collection: &str, record: Value) -> Result<String>;

    /// Finds records whose top-level fields all match the filter object.
    ///
    /// # Errors
    /// Returns an error if the collection cannot be read.
    async fn find(&self, collection: &str, filter: &Value) -> Result<Vec<Value>>;
}

/// Trait for anything that can feed text into ingestion.
///
/// OCR pipelines, file loaders, and transcript fetchers all reduce to this;
/// their failure handling stays on their side of the boundary.
pub trait TextSource {
    /// Produces the full text to ingest.
    ///
    /// # Errors
    /// Returns an error if the source cannot be read.
    fn produce_text(&self) -> Result<String>;
}

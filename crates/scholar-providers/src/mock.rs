//! Mock generator for testing workflow graphs.
//!
//! Allows defining canned responses for specific prompts, enabling
//! end-to-end testing of graph runs without real API calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use scholar_core::{Error, GenerationRequest, Generator, IgnoreLock as _, Result};

/// Response storage type.
type ResponseMap = Arc<Mutex<HashMap<String, String>>>;

/// Mock generator that returns pre-defined responses based on prompt patterns.
///
/// Useful for exercising graph runs end-to-end without real API calls.
/// Patterns match by exact prompt first, then by substring. A scripted error
/// queue lets tests simulate transient failures before a success.
#[derive(Clone, Default)]
pub struct MockGenerator {
    /// Predefined responses keyed by prompt pattern.
    responses: ResponseMap,
    /// Default response when no pattern matches.
    default_response: Arc<Mutex<Option<String>>>,
    /// Errors returned (in order) before any response is served.
    scripted_errors: Arc<Mutex<Vec<Error>>>,
    /// Prompt history for verification.
    call_history: Arc<Mutex<Vec<String>>>,
}

impl MockGenerator {
    /// Creates a mock with no canned responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a pattern-based response.
    #[must_use]
    pub fn with_response<P: Into<String>, R: Into<String>>(self, pattern: P, response: R) -> Self {
        {
            let mut responses = self.responses.lock_ignore_poison();
            responses.insert(pattern.into(), response.into());
        }
        self
    }

    /// Sets a default response for prompts that match no pattern.
    #[must_use]
    pub fn with_default_response<R: Into<String>>(self, response: R) -> Self {
        {
            let mut default = self.default_response.lock_ignore_poison();
            *default = Some(response.into());
        }
        self
    }

    /// Queues an error to be returned before any response is served.
    ///
    /// Multiple queued errors are returned in the order added.
    #[must_use]
    pub fn with_scripted_error(self, error: Error) -> Self {
        {
            let mut errors = self.scripted_errors.lock_ignore_poison();
            errors.push(error);
        }
        self
    }

    /// Returns the prompt history (every prompt this mock has seen).
    #[must_use]
    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock_ignore_poison().clone()
    }

    /// Returns the number of generation calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.call_history.lock_ignore_poison().len()
    }

    /// Finds a matching response for the given prompt.
    fn find_response(&self, prompt: &str) -> Option<String> {
        let responses = self.responses.lock_ignore_poison();

        if let Some(response) = responses.get(prompt) {
            return Some(response.clone());
        }

        for (pattern, response) in &*responses {
            if prompt.contains(pattern) {
                return Some(response.clone());
            }
        }

        None
    }
}

#[async_trait]
impl Generator for MockGenerator {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        {
            let mut history = self.call_history.lock_ignore_poison();
            history.push(request.prompt.clone());
        }

        {
            let mut errors = self.scripted_errors.lock_ignore_poison();
            if !errors.is_empty() {
                return Err(errors.remove(0));
            }
        }

        let text = self.find_response(&request.prompt).or_else(|| {
            let default = self.default_response.lock_ignore_poison();
            default.clone()
        });

        text.ok_or_else(|| {
            Error::GeneratorUnavailable("mock has no response for this prompt".to_owned())
        })
    }
}

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{Error, Result};

/// Opaque identifier for a chunk of ingested text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(Uuid);

impl ChunkId {
    /// Creates a fresh random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses an identifier from its string form.
    ///
    /// # Errors
    /// Returns an error if the string is not a valid identifier.
    pub fn parse(text: &str) -> Result<Self> {
        Uuid::parse_str(text)
            .map(Self)
            .map_err(|err| Error::InvalidParameter(format!("malformed chunk id '{text}': {err}")))
    }
}

impl Default for ChunkId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(formatter)
    }
}

/// A bounded contiguous slice of ingested text, the atomic unit of retrieval.
///
/// Immutable once created; deleted only when its source document is removed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique identifier, shared with the vector index.
    pub id: ChunkId,
    /// Chunk text.
    pub text: String,
    /// Identifier of the source document this chunk was cut from.
    pub source_id: String,
    /// Start position in the original text, counted in characters.
    pub offset: usize,
    /// Chunk length, counted in characters.
    pub length: usize,
}

impl Chunk {
    /// Creates a chunk with a fresh identifier, deriving `length` from the text.
    pub fn new<T: Into<String>>(text: T, source_id: T, offset: usize) -> Self {
        let text = text.into();
        let length = text.chars().count();
        Self {
            id: ChunkId::new(),
            text,
            source_id: source_id.into(),
            offset,
            length,
        }
    }
}

/// A retrieved chunk paired with its distance to the query.
///
/// Lower scores are more relevant (squared Euclidean distance).
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Squared Euclidean distance between the query and chunk vectors.
    pub score: f32,
}

/// Ordered retrieval output, most relevant first. Ephemeral, never persisted.
pub type RetrievalResult = Vec<ScoredChunk>;

/// Depth of an explanation requested by the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyLevel {
    /// Plain-language explanation for first contact with a topic.
    #[default]
    Simple,
    /// Assumes basic familiarity with the topic.
    Intermediate,
    /// Full-depth treatment including edge cases.
    Advanced,
}

impl DifficultyLevel {
    /// Returns the lowercase name used in prompts and payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl FromStr for DifficultyLevel {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        match text {
            "simple" => Ok(Self::Simple),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            other => Err(Error::InvalidParameter(format!(
                "unknown difficulty level '{other}' (expected simple, intermediate, or advanced)"
            ))),
        }
    }
}

impl fmt::Display for DifficultyLevel {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// A multiple-choice question produced by the quiz graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mcq {
    /// Question text.
    pub question: String,
    /// Answer choices; at least two.
    pub choices: Vec<String>,
    /// Index of the correct answer within `choices`.
    pub correct_index: usize,
    /// Optional rationale for the correct answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    /// Optional per-question difficulty label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
}

impl Mcq {
    /// Validates the structural invariants of a generated question.
    ///
    /// # Errors
    /// Returns `GenerationFormat` if the question text is empty, fewer than
    /// two choices are present, or `correct_index` is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.question.trim().is_empty() {
            return Err(Error::GenerationFormat("question text is empty".to_owned()));
        }
        if self.choices.len() < 2 {
            return Err(Error::GenerationFormat(format!(
                "question '{}' has {} choices, need at least 2",
                self.question,
                self.choices.len()
            )));
        }
        if self.correct_index >= self.choices.len() {
            return Err(Error::GenerationFormat(format!(
                "question '{}' marks choice {} correct but only {} choices exist",
                self.question,
                self.correct_index,
                self.choices.len()
            )));
        }
        Ok(())
    }
}

/// A single generation call to the external text generator.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// User-facing prompt text.
    pub prompt: String,
    /// Optional system framing for the generator.
    pub system: Option<String>,
    /// Open constraint map (temperature, max tokens, response format hints).
    pub constraints: Option<Map<String, Value>>,
}

impl GenerationRequest {
    /// Creates a request with only a prompt.
    pub fn new<T: Into<String>>(prompt: T) -> Self {
        Self {
            prompt: prompt.into(),
            system: None,
            constraints: None,
        }
    }

    /// Sets the system framing.
    #[must_use]
    pub fn with_system<T: Into<String>>(mut self, system: T) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Adds a single constraint entry.
    #[must_use]
    pub fn with_constraint<T: Into<String>>(mut self, key: T, value: Value) -> Self {
        self.constraints
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }
}

/// Per-topic quiz statistics for one learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicStat {
    /// Topic name as recorded on responses.
    pub name: String,
    /// Number of questions attempted.
    pub attempted: u64,
    /// Number answered correctly.
    pub correct: u64,
    /// `correct / attempted`.
    pub accuracy: f64,
}

/// Aggregated quiz history for one learner, consumed by the coach graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSummary {
    /// Learner this summary describes.
    pub user_id: String,
    /// Total questions answered across all topics.
    pub total_answered: u64,
    /// Overall fraction answered correctly.
    pub overall_accuracy: f64,
    /// Per-topic statistics, sorted by topic name.
    pub topics: Vec<TopicStat>,
    /// Topics below the mastery threshold, weakest first
    /// (ascending accuracy, ties broken by most attempts).
    pub weakest_topics: Vec<String>,
}

impl ProgressSummary {
    /// Summary for a learner with no recorded responses.
    pub fn empty<T: Into<String>>(user_id: T) -> Self {
        Self {
            user_id: user_id.into(),
            total_answered: 0,
            overall_accuracy: 0.0,
            topics: Vec::new(),
            weakest_topics: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_length_counts_characters() {
        let chunk = Chunk::new("héllo", "doc-1", 10);
        assert_eq!(chunk.length, 5);
        assert_eq!(chunk.offset, 10);
        assert_eq!(chunk.source_id, "doc-1");
    }

    #[test]
    fn chunk_id_round_trips_through_string() {
        let id = ChunkId::new();
        let parsed = ChunkId::parse(&id.to_string());
        assert!(parsed.is_ok(), "Failed to parse rendered id");
        if let Ok(back) = parsed {
            assert_eq!(back, id);
        }
    }

    #[test]
    fn chunk_id_rejects_garbage() {
        let parsed = ChunkId::parse("not-a-uuid");
        assert!(matches!(parsed, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn difficulty_level_parsing() {
        assert_eq!(
            "advanced".parse::<DifficultyLevel>().ok(),
            Some(DifficultyLevel::Advanced)
        );
        assert_eq!(DifficultyLevel::default(), DifficultyLevel::Simple);

        let unknown = "expert".parse::<DifficultyLevel>();
        assert!(matches!(unknown, Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn mcq_validation() {
        let good = Mcq {
            question: "What is 2 + 2?".to_owned(),
            choices: vec!["3".to_owned(), "4".to_owned()],
            correct_index: 1,
            explanation: None,
            difficulty: None,
        };
        assert!(good.validate().is_ok());

        let one_choice = Mcq {
            choices: vec!["4".to_owned()],
            ..good.clone()
        };
        assert!(matches!(
            one_choice.validate(),
            Err(Error::GenerationFormat(_))
        ));

        let bad_index = Mcq {
            correct_index: 2,
            ..good.clone()
        };
        assert!(matches!(
            bad_index.validate(),
            Err(Error::GenerationFormat(_))
        ));

        let empty_question = Mcq {
            question: "   ".to_owned(),
            ..good
        };
        assert!(matches!(
            empty_question.validate(),
            Err(Error::GenerationFormat(_))
        ));
    }

    #[test]
    fn generation_request_builder() {
        let request = GenerationRequest::new("explain photosynthesis")
            .with_system("You are a tutor.")
            .with_constraint("temperature", serde_json::json!(0.3));

        assert_eq!(request.prompt, "explain photosynthesis");
        assert_eq!(request.system.as_deref(), Some("You are a tutor."));
        let constraints = request.constraints.unwrap_or_default();
        assert_eq!(constraints.get("temperature"), Some(&serde_json::json!(0.3)));
    }
}

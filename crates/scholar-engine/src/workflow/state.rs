//! Run-scoped workflow state.

use scholar_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Mutable field map threaded through a graph's nodes for one run.
///
/// Created from the caller's input payload, updated by each node's partial
/// output, and returned whole when the run reaches the end marker. Never
/// shared across concurrent runs — each run owns an independent instance.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    /// Named fields, JSON-typed like the payloads they come from.
    fields: Map<String, Value>,
}

impl WorkflowState {
    /// Builds the initial state from a caller payload.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the payload is not a JSON object.
    pub fn from_payload(payload: Value) -> Result<Self> {
        match payload {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(Error::InvalidParameter(format!(
                "workflow payload must be a JSON object, got {other}"
            ))),
        }
    }

    /// Reads a field, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Reads a required string field.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the field is missing or not a string.
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.opt_str(key)?
            .ok_or_else(|| Error::InvalidParameter(format!("missing required field '{key}'")))
    }

    /// Reads an optional string field.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the field is present but not a string.
    pub fn opt_str(&self, key: &str) -> Result<Option<&str>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) => Ok(Some(text)),
            Some(other) => Err(Error::InvalidParameter(format!(
                "field '{key}' must be a string, got {other}"
            ))),
        }
    }

    /// Reads an optional unsigned integer field.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the field is present but not an unsigned
    /// integer.
    pub fn opt_u64(&self, key: &str) -> Result<Option<u64>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => value.as_u64().map(Some).ok_or_else(|| {
                Error::InvalidParameter(format!(
                    "field '{key}' must be an unsigned integer, got {value}"
                ))
            }),
        }
    }

    /// Deserializes an optional field into a typed value.
    ///
    /// # Errors
    /// Returns `InvalidParameter` if the field is present but does not
    /// deserialize into `T`.
    pub fn field<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value.clone()).map(Some).map_err(|error| {
                Error::InvalidParameter(format!("field '{key}' has unexpected shape: {error}"))
            }),
        }
    }

    /// Merges a node's partial update into the state.
    pub fn apply(&mut self, update: StateUpdate) {
        for (key, value) in update.fields {
            self.fields.insert(key, value);
        }
    }

    /// Consumes the state, returning the final field map as a JSON object.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

/// Partial state update produced by one node.
#[derive(Debug, Default)]
pub struct StateUpdate {
    /// Fields to write back into the run state.
    fields: Map<String, Value>,
}

impl StateUpdate {
    /// Creates an empty update.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one field write.
    #[must_use]
    pub fn set<K: Into<String>>(mut self, key: K, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn payload_must_be_an_object() {
        assert!(WorkflowState::from_payload(json!({"question": "why?"})).is_ok());
        assert!(matches!(
            WorkflowState::from_payload(json!("just a string")),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            WorkflowState::from_payload(json!([1, 2])),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn typed_accessors_distinguish_absent_from_mistyped() {
        let state = match WorkflowState::from_payload(json!({
            "question": "why is the sky blue?",
            "k": 3,
            "mcqs": [{"question": "q", "choices": ["a", "b"], "correct_index": 0}],
        })) {
            Ok(state) => state,
            Err(error) => panic!("payload rejected: {error}"),
        };

        assert_eq!(state.require_str("question").ok(), Some("why is the sky blue?"));
        assert!(matches!(
            state.require_str("absent"),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(
            state.require_str("k"),
            Err(Error::InvalidParameter(_))
        ));

        assert_eq!(state.opt_u64("k").ok().flatten(), Some(3));
        assert_eq!(state.opt_u64("absent").ok().flatten(), None);
        assert!(state.opt_u64("question").is_err());

        let mcqs: Option<Vec<scholar_core::Mcq>> = match state.field("mcqs") {
            Ok(mcqs) => mcqs,
            Err(error) => panic!("mcqs field rejected: {error}"),
        };
        assert_eq!(mcqs.map(|list| list.len()), Some(1));
    }

    #[test]
    fn apply_merges_and_overwrites() {
        let mut state = match WorkflowState::from_payload(json!({"topic": "algebra"})) {
            Ok(state) => state,
            Err(error) => panic!("payload rejected: {error}"),
        };

        state.apply(StateUpdate::new().set("quiz_id", json!("q-1")));
        state.apply(StateUpdate::new().set("quiz_id", json!("q-2")).set("extra", json!(true)));

        let value = state.into_value();
        assert_eq!(value["topic"], json!("algebra"));
        assert_eq!(value["quiz_id"], json!("q-2"));
        assert_eq!(value["extra"], json!(true));
    }
}

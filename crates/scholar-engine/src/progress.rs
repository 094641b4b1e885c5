//! Quiz-history aggregation for the coach graph.

use std::collections::BTreeMap;

use scholar_core::{ProgressSummary, TopicStat};
use serde_json::Value;

/// Accuracy below which a topic counts as weak.
pub const MASTERY_THRESHOLD: f64 = 0.6;

/// Running counters for one topic.
#[derive(Default)]
struct TopicCounts {
    /// Questions attempted.
    attempted: u64,
    /// Questions answered correctly.
    correct: u64,
}

/// Aggregates raw response records into a progress summary.
///
/// Each record is expected to carry a string `topic` and a `correct` flag
/// (boolean, or a number where non-zero means correct). Records missing a
/// topic are skipped rather than failing the whole aggregation — the store
/// may hold records written by older versions of the host system.
///
/// `weakest_topics` lists topics under the mastery threshold, ranked by
/// ascending accuracy with ties broken by most-attempted-first (a topic
/// failed often is more urgent than one failed once).
pub fn compute_progress(user_id: &str, responses: &[Value]) -> ProgressSummary {
    let mut counts: BTreeMap<String, TopicCounts> = BTreeMap::new();

    for record in responses {
        let Some(topic) = record.get("topic").and_then(Value::as_str) else {
            continue;
        };
        let correct = match record.get("correct") {
            Some(Value::Bool(flag)) => *flag,
            Some(Value::Number(number)) => number.as_f64().is_some_and(|value| value != 0.0),
            _ => false,
        };

        let entry = counts.entry(topic.to_owned()).or_default();
        entry.attempted += 1;
        if correct {
            entry.correct += 1;
        }
    }

    if counts.is_empty() {
        return ProgressSummary::empty(user_id);
    }

    let mut total_answered = 0;
    let mut total_correct = 0;
    let topics: Vec<TopicStat> = counts
        .into_iter()
        .map(|(name, entry)| {
            total_answered += entry.attempted;
            total_correct += entry.correct;
            TopicStat {
                name,
                attempted: entry.attempted,
                correct: entry.correct,
                accuracy: entry.correct as f64 / entry.attempted as f64,
            }
        })
        .collect();

    let mut weakest: Vec<&TopicStat> = topics
        .iter()
        .filter(|topic| topic.accuracy < MASTERY_THRESHOLD)
        .collect();
    weakest.sort_by(|first, second| {
        first
            .accuracy
            .total_cmp(&second.accuracy)
            .then(second.attempted.cmp(&first.attempted))
            .then(first.name.cmp(&second.name))
    });

    ProgressSummary {
        user_id: user_id.to_owned(),
        total_answered,
        overall_accuracy: total_correct as f64 / total_answered as f64,
        weakest_topics: weakest.into_iter().map(|topic| topic.name.clone()).collect(),
        topics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aggregates_per_topic_and_overall_accuracy() {
        let responses = vec![
            json!({"topic": "algebra", "correct": 1}),
            json!({"topic": "algebra", "correct": 0}),
            json!({"topic": "geometry", "correct": 1}),
        ];

        let summary = compute_progress("u1", &responses);
        assert_eq!(summary.user_id, "u1");
        assert_eq!(summary.total_answered, 3);
        assert!((summary.overall_accuracy - 2.0 / 3.0).abs() < 1e-9);

        // Topics come back sorted by name.
        assert_eq!(summary.topics.len(), 2);
        assert_eq!(summary.topics[0].name, "algebra");
        assert!((summary.topics[0].accuracy - 0.5).abs() < 1e-9);
        assert_eq!(summary.topics[1].name, "geometry");
        assert!((summary.topics[1].accuracy - 1.0).abs() < 1e-9);

        // Algebra (0.5) is below mastery; geometry (1.0) is not.
        assert_eq!(summary.weakest_topics, vec!["algebra".to_owned()]);
    }

    #[test]
    fn weakest_topics_rank_ascending_with_attempt_ties() {
        let mut responses = Vec::new();
        // chemistry: 1/4 = 0.25
        responses.push(json!({"topic": "chemistry", "correct": true}));
        for _ in 0..3 {
            responses.push(json!({"topic": "chemistry", "correct": false}));
        }
        // physics: 1/2 = 0.5
        responses.push(json!({"topic": "physics", "correct": true}));
        responses.push(json!({"topic": "physics", "correct": false}));
        // history: 2/4 = 0.5, more attempts than physics
        responses.push(json!({"topic": "history", "correct": true}));
        responses.push(json!({"topic": "history", "correct": true}));
        responses.push(json!({"topic": "history", "correct": false}));
        responses.push(json!({"topic": "history", "correct": false}));

        let summary = compute_progress("u1", &responses);
        assert_eq!(
            summary.weakest_topics,
            vec![
                "chemistry".to_owned(),
                "history".to_owned(),
                "physics".to_owned()
            ]
        );
    }

    #[test]
    fn no_responses_yield_empty_summary() {
        let summary = compute_progress("new-user", &[]);
        assert_eq!(summary.total_answered, 0);
        assert!((summary.overall_accuracy - 0.0).abs() < f64::EPSILON);
        assert!(summary.topics.is_empty());
        assert!(summary.weakest_topics.is_empty());
    }

    #[test]
    fn records_without_topic_are_skipped() {
        let responses = vec![
            json!({"correct": true}),
            json!({"topic": "algebra", "correct": true}),
            json!({"topic": "algebra"}),
        ];

        let summary = compute_progress("u1", &responses);
        assert_eq!(summary.total_answered, 2);
        assert_eq!(summary.topics.len(), 1);
        // A record with no `correct` field counts as attempted and wrong.
        assert_eq!(summary.topics[0].correct, 1);
    }
}

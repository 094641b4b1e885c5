//! Prompt builders for the explain, quiz, and coach graphs.

use scholar_core::DifficultyLevel;

/// System framing for explanation requests.
pub(crate) const EXPLAINER_SYSTEM: &str =
    "You explain concepts clearly for students using the given context.";

/// System framing for quiz generation requests.
pub(crate) const QUIZ_SYSTEM: &str =
    "You write fair multiple-choice questions grounded strictly in the provided material.";

/// System framing for coaching requests.
pub(crate) const COACH_SYSTEM: &str = "You are a kind and practical learning coach.";

/// Prompt for answering a question from retrieved study material.
pub(crate) fn explain_with_context(
    question: &str,
    level: DifficultyLevel,
    context: &[String],
) -> String {
    let mut context_block = String::new();
    for (position, text) in context.iter().enumerate() {
        context_block.push_str(&format!("[Chunk {}]\n{text}\n\n", position + 1));
    }

    format!(
        "You are a teaching assistant helping a student.\n\n\
         The student's question:\n\"\"\"{question}\"\"\"\n\n\
         You are given some context from their study material:\n\n\
         {context_block}\
         Instructions:\n\
         - Use the context above as your main source.\n\
         - If something is not in the context, say you are not sure instead of making it up.\n\
         - Explain at this level: {level}\n\
         - Use clear, structured explanation."
    )
}

/// Prompt for answering a question with no study material available.
pub(crate) fn explain_without_context(question: &str, level: DifficultyLevel) -> String {
    format!(
        "A student asked the following question:\n\n\
         \"\"\"{question}\"\"\"\n\n\
         There is no study material context available.\n\
         Give the best explanation you can at this level: {level}."
    )
}

/// Prompt for explaining caller-supplied raw content directly.
pub(crate) fn explain_content(content: &str, level: DifficultyLevel) -> String {
    format!(
        "Explain the following content to a student.\n\n\
         - Use clear, simple language.\n\
         - Focus on understanding, not just definitions.\n\
         - Use short paragraphs and bullet points where helpful.\n\
         - Adjust the depth to this level: {level}\n\n\
         Content to explain:\n\"\"\"{content}\"\"\""
    )
}

/// Prompt for generating multiple-choice questions about a topic.
pub(crate) fn quiz_questions(
    topic: &str,
    count: u64,
    difficulty: &str,
    context: &[String],
) -> String {
    let context_block = if context.is_empty() {
        "No study material was retrieved; write questions from general knowledge of the topic."
            .to_owned()
    } else {
        let mut block = String::from("Study material:\n\n");
        for (position, text) in context.iter().enumerate() {
            block.push_str(&format!("[Chunk {}]\n{text}\n\n", position + 1));
        }
        block
    };

    format!(
        "Write {count} multiple-choice questions about \"{topic}\" at {difficulty} difficulty.\n\n\
         {context_block}\n\
         Respond with ONLY a JSON array, no prose. Each element must have:\n\
         - \"question\": the question text\n\
         - \"choices\": an array of at least two answer options\n\
         - \"correct_index\": the zero-based index of the correct option\n\
         - optionally \"explanation\": why the correct option is right"
    )
}

/// Prompt for coaching advice from a progress summary.
pub(crate) fn coaching_advice(progress_summary: &str) -> String {
    format!(
        "ROLE:\nYou are a learning coach.\n\n\
         OBJECTIVE:\nHelp the student improve by analyzing performance data and recommending next steps.\n\n\
         INPUT DATA (authoritative):\n{progress_summary}\n\n\
         ANALYSIS RULES:\n\
         - Base all guidance strictly on the provided data.\n\
         - Identify strengths, weaknesses, and trends.\n\
         - Do NOT assume motivation, effort, or external factors.\n\n\
         COACHING OUTPUT SHOULD INCLUDE:\n\
         1. What the student is doing well\n\
         2. Topics or skills that need improvement\n\
         3. Recommended next action (practice, revision, difficulty change)\n\
         4. A short, supportive message (1-2 lines, professional tone)\n\n\
         CONSTRAINTS:\n\
         - No generic advice.\n\
         - No motivational cliches.\n\
         - No new topics unless justified by data.\n\n\
         OUTPUT:\nA concise coaching summary for the student."
    )
}

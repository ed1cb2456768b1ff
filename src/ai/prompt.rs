/// Persona sent as the system message on every summarization request.
pub const SYSTEM_PROMPT: &str = "You are a medical assistant who is an expert at analyzing \
    laboratory reports. Write for a patient without medical training: be clear, calm and \
    factual, and never present the summary as a diagnosis.";

/// Instruction placed in front of the report text in the user message.
pub const USER_INSTRUCTION: &str = "Analyze the following laboratory report and summarize the \
    main findings, highlighting any abnormal values and their possible clinical significance:";

/// Returns at most `budget` characters from the start of `text`.
///
/// Counts Unicode scalar values, so the cut never lands inside a character.
#[must_use]
pub fn truncate_to_budget(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Builds the user message for one report excerpt.
#[must_use]
pub fn user_message(excerpt: &str) -> String {
    format!("{USER_INSTRUCTION} {excerpt}")
}

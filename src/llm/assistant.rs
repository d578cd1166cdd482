//! Prompt construction for the free-text assistant features.
//!
//! Each call returns the generator's error untouched so the caller decides
//! what fallback text to show.

use crate::domain::email::Message;
use crate::llm::{GenerationError, TextGenerator};
use crate::mail::decoders::truncate_chars;

const SUMMARY_INPUT_CHARS: usize = 4000;
const REPLY_INPUT_CHARS: usize = 1000;
const ASK_CONTEXT_CHARS: usize = 500;
pub const BRIEFING_MESSAGES: usize = 5;

pub fn summarize(model: &dyn TextGenerator, text: &str) -> Result<String, GenerationError> {
    let prompt = format!(
        "Summarize this email in 2 sentences. Capture the main action item:\n\n{}",
        truncate_chars(text, SUMMARY_INPUT_CHARS)
    );
    model.generate(&prompt).map(|s| s.trim().to_string())
}

pub fn reply_prompt(email_text: &str, notes: &str, user_name: &str) -> String {
    format!(
        "You are an email assistant for {user_name}.\n\
         \n\
         Incoming Email:\n\
         {email}\n\
         \n\
         My Draft Notes:\n\
         {notes}\n\
         \n\
         Task: Write a professional reply based on my notes.\n\
         \n\
         STRICT RULES:\n\
         1. Output ONLY the email body.\n\
         2. Do NOT write \"Here is a draft\" or \"Subject:\".\n\
         3. Do NOT include placeholders like \"[Your Name]\".\n\
         4. Sign off specifically as \"{user_name}\".\n",
        email = truncate_chars(email_text, REPLY_INPUT_CHARS),
    )
}

pub fn draft_reply(
    model: &dyn TextGenerator,
    email_text: &str,
    notes: &str,
    user_name: &str,
) -> Result<String, GenerationError> {
    model
        .generate(&reply_prompt(email_text, notes, user_name))
        .map(|s| s.trim().to_string())
}

pub fn ask_prompt(messages: &[Message], question: &str) -> String {
    let mut context = String::new();
    for m in messages {
        context.push_str(&format!(
            "--- START EMAIL ---\nFrom: {}\nSubject: {}\nContent: {}...\n--- END EMAIL ---\n\n",
            m.sender,
            m.subject,
            truncate_chars(&m.body, ASK_CONTEXT_CHARS)
        ));
    }
    format!("Context:\n{context}\n\nUser Question: {question}\n\nAnswer based on the emails.")
}

pub fn ask_inbox(
    model: &dyn TextGenerator,
    messages: &[Message],
    question: &str,
) -> Result<String, GenerationError> {
    model.generate(&ask_prompt(messages, question))
}

/// Spoken digest of the newest messages. A failed summary is left out
/// rather than aborting the briefing.
pub fn briefing_script(model: &dyn TextGenerator, user_name: &str, messages: &[Message]) -> String {
    let mut script =
        format!("Good morning, {user_name}. Here is your daily briefing. ");
    for m in messages.iter().take(BRIEFING_MESSAGES) {
        script.push_str(&format!("From {}: {}. ", m.sender_name(), m.subject));
        match summarize(model, &m.body) {
            Ok(summary) => script.push_str(&format!("{summary}. ")),
            Err(e) => log::warn!("briefing summary for {} failed: {e}", m.id),
        }
        script.push_str("Next email. ");
    }
    script.push_str("That concludes your briefing.");
    script
}

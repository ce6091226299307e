//! Reply parsing.
//!
//! Primary schema: a strict JSON object `{"thought": ..., "reply": ...}`
//! requested from the model. Legacy fallback: `Thought:`/`Response:`
//! delimiter splitting. Anything else is treated as a bare reply with an
//! empty thought — a malformed completion never fails the turn.

use crate::history::Utterance;
use crate::prompt::SILENCE_TOKEN;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub thought: String,
    pub reply: String,
}

#[derive(Debug, Deserialize)]
struct ReplySchema {
    thought: Option<String>,
    reply: String,
}

/// Split a raw completion into reasoning and reply segments.
#[must_use]
pub fn parse_completion(raw: &str) -> ParsedReply {
    let trimmed = raw.trim();

    // Strict JSON schema first, tolerating a markdown code fence around it.
    let candidate = strip_code_fence(trimmed);
    if let Ok(parsed) = serde_json::from_str::<ReplySchema>(candidate) {
        return ParsedReply {
            thought: parsed.thought.unwrap_or_default().trim().to_string(),
            reply: parsed.reply.trim().to_string(),
        };
    }

    // Legacy delimiter format: "Thought: ... Response: ...".
    if let Some(idx) = trimmed.find("Response:") {
        let thought = trimmed[..idx]
            .trim()
            .trim_start_matches("Thought:")
            .trim()
            .to_string();
        let reply = trimmed[idx + "Response:".len()..].trim().to_string();
        return ParsedReply { thought, reply };
    }

    ParsedReply {
        thought: String::new(),
        reply: trimmed.to_string(),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the fence line.
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .trim_end_matches('`')
        .trim()
}

/// Apply the silence rule to a parsed reply.
///
/// Deterministic resolution of the embedded-token ambiguity: a reply that
/// trims to exactly the token is silence; an embedded token is stripped
/// and the remainder spoken; if stripping leaves only whitespace the turn
/// is silence.
#[must_use]
pub fn resolve_silence(reply: &str) -> Utterance {
    let trimmed = reply.trim();
    if trimmed == SILENCE_TOKEN {
        return Utterance::Silence;
    }
    if trimmed.contains(SILENCE_TOKEN) {
        let stripped = trimmed.replace(SILENCE_TOKEN, " ");
        let stripped = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
        if stripped.is_empty() {
            return Utterance::Silence;
        }
        return Utterance::Speak(stripped);
    }
    if trimmed.is_empty() {
        return Utterance::Silence;
    }
    Utterance::Speak(trimmed.to_string())
}

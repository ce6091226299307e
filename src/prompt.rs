//! Prompt assembly for the reasoning service.
//!
//! The system prompt carries the persona; the turn prompt carries the
//! rolling history, an anti-repetition block, a rotating style hint,
//! and an explicit mode flag so the model knows whether the user spoke.

use crate::config::PersonaConfig;
use crate::history::ConversationHistory;
use std::fmt::Write;

/// Sentinel the model uses to decline a turn.
pub const SILENCE_TOKEN: &str = "[SILENCE]";

/// Marker written into log records for turns with no user speech.
pub const PROACTIVE_MARKER: &str = "[PROACTIVE]";

/// How many prior turns the prompt renders.
const HISTORY_RENDER_DEPTH: usize = 4;
/// How many recent replies the anti-repetition block lists.
const FORBIDDEN_DEPTH: usize = 3;

/// Rotating tone hints; one is picked per turn so consecutive remarks
/// on similar frames do not all land in the same register.
const STYLE_HINTS: &[&str] = &[
    "Style: casual and friendly",
    "Style: sarcastic and witty",
    "Style: high energy and excited",
    "Style: observational and curious",
    "Style: competitive and focused",
];

/// Whether the turn is a reaction to user speech or an unprompted remark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnMode {
    UserSpoke,
    Proactive,
}

#[must_use]
pub fn build_system_prompt(persona: &PersonaConfig, user_name: Option<&str>) -> String {
    let mut prompt = format!(
        "You are {name}, a present, easygoing companion watching the user's screen \
and chatting with them in real time.\n\n\
Personality:\n\
- You are a genuine buddy: chill, playful, supportive.\n\
- You connect what the user says to what you can see on screen.\n\
- Keep replies short and natural, 15-20 words at most.\n\n\
Instructions:\n\
1. If the user spoke, answer them and tie in the visible scene.\n\
2. If the user is silent, only speak when you have something genuinely worth saying; \
otherwise answer with exactly {silence}.\n\
3. Mention specific visual details: colors, numbers, actions.\n\
4. Never ask questions when the user has not spoken.\n\n\
Output format: a JSON object {{\"thought\": \"<your reasoning>\", \"reply\": \"<what you say aloud>\"}}. \
Use {silence} as the reply to stay quiet.",
        name = persona.agent_name,
        silence = SILENCE_TOKEN,
    );

    if let Some(name) = user_name {
        let _ = write!(prompt, "\n\nThe user's name is {name}.");
    }
    if let Some(extra) = &persona.extra_instructions {
        let _ = write!(prompt, "\n\n{extra}");
    }
    prompt
}

/// Render the per-turn prompt. `turn_index` drives the style rotation.
#[must_use]
pub fn build_turn_prompt(
    history: &ConversationHistory,
    mode: TurnMode,
    user_text: Option<&str>,
    scene_description: Option<&str>,
    capture_failed: bool,
    turn_index: u64,
) -> String {
    let mut prompt = String::new();

    for reply in history.recent_replies(FORBIDDEN_DEPTH) {
        let _ = writeln!(prompt, "DON'T REPEAT: {reply}");
    }

    if !history.is_empty() {
        prompt.push_str("\nCONTEXT:\n");
        for turn in history.recent(HISTORY_RENDER_DEPTH) {
            if let Some(user) = &turn.user_text {
                let _ = writeln!(prompt, "User: {user}");
            }
            if let Some(reply) = turn.utterance.spoken_text() {
                let _ = writeln!(prompt, "You: {reply}");
            }
        }
    }

    if capture_failed {
        prompt.push_str("\n[capture unavailable] No usable frame this turn; do not describe the screen.\n");
    } else if let Some(scene) = scene_description {
        let _ = write!(prompt, "\nSCENE: {scene}\n");
    }

    let style = STYLE_HINTS[(turn_index as usize) % STYLE_HINTS.len()];
    let _ = write!(prompt, "\n[{style}]\n");

    match (mode, user_text) {
        (TurnMode::UserSpoke, Some(text)) => {
            let _ = write!(
                prompt,
                "MODE: USER_SPOKE\nUser says: \"{text}\"\nReply naturally based on what you see. Be brief and engaging."
            );
        }
        (TurnMode::UserSpoke, None) | (TurnMode::Proactive, _) => {
            let _ = write!(
                prompt,
                "MODE: PROACTIVE (the user is currently silent)\n\
Look at the scene. Speak only if something urgent or clearly valuable stands out; \
otherwise reply with exactly {SILENCE_TOKEN}. Never ask a question."
            );
        }
    }

    prompt
}

/// Prompt for the optional lightweight vision pre-pass.
#[must_use]
pub fn build_describe_prompt() -> String {
    "List the concrete things visible in this image in one short sentence: \
application or game, colors, numbers, any error or warning text. No opinions."
        .to_string()
}

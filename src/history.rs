use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Rolling context window: how many turns the history retains.
pub const HISTORY_CAPACITY: usize = 12;

/// What the agent decided to do with its voice this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Utterance {
    Speak(String),
    Silence,
}

impl Utterance {
    #[must_use]
    pub fn is_silence(&self) -> bool {
        matches!(self, Self::Silence)
    }

    #[must_use]
    pub fn spoken_text(&self) -> Option<&str> {
        match self {
            Self::Speak(text) => Some(text),
            Self::Silence => None,
        }
    }
}

/// One completed pipeline invocation. Immutable after creation; consumed
/// by the logger and appended to the rolling history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub user_text: Option<String>,
    /// Opaque reference to the frame used for this turn (the persisted
    /// artifact path once logged, or an in-memory tag before that).
    pub visual_ref: String,
    pub thought: String,
    pub utterance: Utterance,
    /// Set when the capturer failed and the placeholder frame was used.
    pub capture_failed: bool,
    pub timestamp: DateTime<Utc>,
}

/// Ordered, bounded sequence of the most recent turns. Insertion order
/// significant, most recent last, FIFO eviction.
#[derive(Debug, Default)]
pub struct ConversationHistory {
    turns: VecDeque<ConversationTurn>,
}

impl ConversationHistory {
    #[must_use]
    pub fn new() -> Self {
        Self {
            turns: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        if self.turns.len() == HISTORY_CAPACITY {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent `n` turns, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &ConversationTurn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip)
    }

    /// Most recent non-silent agent replies, newest first. Used for the
    /// anti-repetition block in the prompt.
    #[must_use]
    pub fn recent_replies(&self, n: usize) -> Vec<&str> {
        self.turns
            .iter()
            .rev()
            .filter_map(|t| t.utterance.spoken_text())
            .take(n)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(user: Option<&str>, reply: Utterance) -> ConversationTurn {
        ConversationTurn {
            user_text: user.map(String::from),
            visual_ref: "frame".to_string(),
            thought: "thinking".to_string(),
            utterance: reply,
            capture_failed: false,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn history_never_exceeds_capacity() {
        let mut h = ConversationHistory::new();
        for i in 0..50 {
            h.push(turn(None, Utterance::Speak(format!("reply {i}"))));
            assert!(h.len() <= HISTORY_CAPACITY);
        }
        assert_eq!(h.len(), HISTORY_CAPACITY);
    }

    #[test]
    fn history_evicts_oldest_first() {
        let mut h = ConversationHistory::new();
        for i in 0..HISTORY_CAPACITY + 3 {
            h.push(turn(None, Utterance::Speak(format!("reply {i}"))));
        }
        let oldest = h.recent(HISTORY_CAPACITY).next().unwrap();
        assert_eq!(oldest.utterance.spoken_text(), Some("reply 3"));
    }

    #[test]
    fn recent_returns_newest_last() {
        let mut h = ConversationHistory::new();
        h.push(turn(Some("hi"), Utterance::Speak("hello".into())));
        h.push(turn(None, Utterance::Silence));
        let collected: Vec<_> = h.recent(2).collect();
        assert_eq!(collected.len(), 2);
        assert!(collected[1].utterance.is_silence());
    }

    #[test]
    fn recent_replies_skips_silence() {
        let mut h = ConversationHistory::new();
        h.push(turn(None, Utterance::Speak("first".into())));
        h.push(turn(None, Utterance::Silence));
        h.push(turn(None, Utterance::Speak("second".into())));
        assert_eq!(h.recent_replies(3), vec!["second", "first"]);
    }

    #[test]
    fn silence_has_no_spoken_text() {
        assert!(Utterance::Silence.is_silence());
        assert_eq!(Utterance::Silence.spoken_text(), None);
        assert_eq!(Utterance::Speak("hey".into()).spoken_text(), Some("hey"));
    }
}

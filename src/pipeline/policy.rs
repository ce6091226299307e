//! Proactive speech policy.
//!
//! The default stance for unsolicited speech is silence. Only urgent,
//! non-interrogative remarks get through: an unprompted question is
//! intrusive, and a remark with no urgency marker is noise.

use crate::history::Utterance;

/// Markers that let an unprompted remark through the gate.
const URGENCY_MARKERS: &[&str] = &[
    "error",
    "warning",
    "warn",
    "risk",
    "danger",
    "blocked",
    "timeout",
    "timed out",
    "critical",
    "disconnect",
    "crash",
    "fail",
    "stuck",
    "low health",
    "deadline",
];

/// Gate an already-resolved utterance for a proactive turn with no user
/// speech. Returns the utterance allowed to reach the synthesizer.
#[must_use]
pub fn gate_proactive(utterance: Utterance) -> Utterance {
    let Utterance::Speak(text) = utterance else {
        return Utterance::Silence;
    };

    if text.contains('?') {
        tracing::debug!("proactive reply suppressed: contains a question");
        return Utterance::Silence;
    }

    let lowered = text.to_lowercase();
    if URGENCY_MARKERS.iter().any(|m| lowered.contains(m)) {
        return Utterance::Speak(text);
    }

    tracing::debug!("proactive reply suppressed: no urgency marker");
    Utterance::Silence
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_stays_silent() {
        assert_eq!(gate_proactive(Utterance::Silence), Utterance::Silence);
    }

    #[test]
    fn non_urgent_chatter_is_suppressed() {
        let got = gate_proactive(Utterance::Speak("nice colors on that menu".into()));
        assert_eq!(got, Utterance::Silence);
    }

    #[test]
    fn suppression_is_idempotent() {
        for _ in 0..5 {
            let got = gate_proactive(Utterance::Speak("lovely weather in the game".into()));
            assert_eq!(got, Utterance::Silence);
        }
    }

    #[test]
    fn urgent_remark_passes() {
        let got = gate_proactive(Utterance::Speak("There's an error dialog on screen".into()));
        assert_eq!(
            got,
            Utterance::Speak("There's an error dialog on screen".into())
        );
    }

    #[test]
    fn urgency_check_is_case_insensitive() {
        let got = gate_proactive(Utterance::Speak("CRITICAL battery level".into()));
        assert!(!got.is_silence());
    }

    #[test]
    fn questions_never_pass_even_when_urgent() {
        let got = gate_proactive(Utterance::Speak("Did you see that error?".into()));
        assert_eq!(got, Utterance::Silence);
    }
}

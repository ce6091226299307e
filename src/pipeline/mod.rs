//! The dual-brain response pipeline.
//!
//! One invocation turns (optional user utterance + fresh frame + rolling
//! history) into a spoken reply or a deliberate silence. An optional
//! lightweight vision pre-pass describes the scene before the main
//! reasoning call. Every failure mode recovers locally; the pipeline
//! never aborts the main loop.

pub mod parse;
pub mod policy;

use crate::capture::{Frame, FrameSource, placeholder_frame};
use crate::config::{PersonaConfig, ReasoningConfig};
use crate::dataset::InteractionLogger;
use crate::history::{ConversationHistory, ConversationTurn, Utterance};
use crate::prompt::{self, PROACTIVE_MARKER, TurnMode};
use crate::reasoning::{Reasoner, ReasoningRequest};
use chrono::Utc;

/// Fixed reply used when the reasoning service is unreachable or slow.
pub const APOLOGY_REPLY: &str = "Sorry, I lost my train of thought for a second.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    Ok,
    Error,
}

#[derive(Debug)]
pub struct PipelineResult {
    pub utterance: Utterance,
    pub thought: String,
    pub status: PipelineStatus,
}

pub struct ResponsePipeline {
    reasoner: Box<dyn Reasoner>,
    frames: Box<dyn FrameSource>,
    logger: InteractionLogger,
    persona: PersonaConfig,
    model: String,
    vision_model: Option<String>,
    turn_index: u64,
}

impl ResponsePipeline {
    #[must_use]
    pub fn new(
        reasoner: Box<dyn Reasoner>,
        frames: Box<dyn FrameSource>,
        logger: InteractionLogger,
        persona: PersonaConfig,
        reasoning: &ReasoningConfig,
    ) -> Self {
        Self {
            reasoner,
            frames,
            logger,
            persona,
            model: reasoning.model.clone(),
            vision_model: reasoning.vision_model.clone(),
            turn_index: 0,
        }
    }

    /// Run one turn. `proactive` marks a scheduler-fired turn with no
    /// user speech; `user_name` comes from personal memory.
    pub async fn run_turn(
        &mut self,
        history: &mut ConversationHistory,
        user_text: Option<&str>,
        proactive: bool,
        user_name: Option<&str>,
    ) -> PipelineResult {
        let (frame, capture_failed) = match self.frames.capture().await {
            Ok(frame) => (frame, false),
            Err(e) => {
                tracing::warn!(error = %e, "frame capture failed; using placeholder");
                (placeholder_frame(), true)
            }
        };

        let scene = if capture_failed {
            None
        } else {
            self.describe_scene(&frame).await
        };

        let mode = if user_text.is_some() {
            TurnMode::UserSpoke
        } else {
            TurnMode::Proactive
        };

        let system_prompt = prompt::build_system_prompt(&self.persona, user_name);
        let turn_prompt = prompt::build_turn_prompt(
            history,
            mode,
            user_text,
            scene.as_deref(),
            capture_failed,
            self.turn_index,
        );
        self.turn_index += 1;

        let mut request =
            ReasoningRequest::text_only(Some(system_prompt), turn_prompt, self.model.clone());
        if !capture_failed {
            request = request.with_image(frame.to_base64(), frame_mime(&frame));
        }

        let raw = match self.reasoner.complete(&request).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(backend = self.reasoner.name(), error = %e, "reasoning call failed");
                return PipelineResult {
                    utterance: Utterance::Speak(APOLOGY_REPLY.to_string()),
                    thought: String::new(),
                    status: PipelineStatus::Error,
                };
            }
        };

        let parsed = parse::parse_completion(&raw);
        let mut utterance = parse::resolve_silence(&parsed.reply);
        if proactive && user_text.is_none() {
            utterance = policy::gate_proactive(utterance);
        }

        // History append and log entry happen before the reply is
        // returned to the caller.
        let transcript = user_text.unwrap_or(PROACTIVE_MARKER);
        let visual_ref = self
            .logger
            .log_turn(&frame, transcript, &utterance, &parsed.thought)
            .unwrap_or_else(|| "unlogged".to_string());

        history.push(ConversationTurn {
            user_text: user_text.map(String::from),
            visual_ref,
            thought: parsed.thought.clone(),
            utterance: utterance.clone(),
            capture_failed,
            timestamp: Utc::now(),
        });

        PipelineResult {
            utterance,
            thought: parsed.thought,
            status: PipelineStatus::Ok,
        }
    }

    /// Vision pre-pass: terse scene description from the lightweight
    /// model. Failure just skips the description.
    async fn describe_scene(&self, frame: &Frame) -> Option<String> {
        let vision_model = self.vision_model.as_ref()?;
        let request =
            ReasoningRequest::text_only(None, prompt::build_describe_prompt(), vision_model.clone())
                .with_image(frame.to_base64(), frame_mime(frame));

        match self.reasoner.complete(&request).await {
            Ok(description) => Some(description),
            Err(e) => {
                tracing::warn!(error = %e, "vision describe pre-pass failed; continuing without");
                None
            }
        }
    }
}

fn frame_mime(frame: &Frame) -> &'static str {
    frame.mime_type
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::NullFrameSource;
    use crate::error::{CaptureError, ReasoningError};
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedReasoner {
        responses: Vec<String>,
        calls: AtomicUsize,
        seen_prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    impl CannedReasoner {
        fn speaking(text: &str) -> Self {
            Self {
                responses: vec![format!(r#"{{"thought": "t", "reply": "{text}"}}"#)],
                calls: AtomicUsize::new(0),
                seen_prompts: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                responses: Vec::new(),
                calls: AtomicUsize::new(0),
                seen_prompts: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl Reasoner for CannedReasoner {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn complete(&self, request: &ReasoningRequest) -> Result<String, ReasoningError> {
            self.seen_prompts.lock().unwrap().push(request.prompt.clone());
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ReasoningError::Timeout {
                    backend: "canned".into(),
                    timeout_secs: 15,
                });
            }
            Ok(self
                .responses
                .get(n.min(self.responses.len() - 1))
                .cloned()
                .unwrap())
        }
    }

    struct FixedFrameSource;

    #[async_trait]
    impl FrameSource for FixedFrameSource {
        async fn capture(&self) -> Result<Frame, CaptureError> {
            Ok(placeholder_frame())
        }
    }

    fn pipeline_with(reasoner: CannedReasoner, dir: &std::path::Path) -> ResponsePipeline {
        ResponsePipeline::new(
            Box::new(reasoner),
            Box::new(FixedFrameSource),
            InteractionLogger::new(dir).unwrap(),
            PersonaConfig::default(),
            &ReasoningConfig::default(),
        )
    }

    #[tokio::test]
    async fn user_turn_speaks_and_grows_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline_with(CannedReasoner::speaking("hey, good to see you"), dir.path());
        let mut history = ConversationHistory::new();

        let result = p.run_turn(&mut history, Some("hi"), false, None).await;

        assert_eq!(result.status, PipelineStatus::Ok);
        assert_eq!(
            result.utterance,
            Utterance::Speak("hey, good to see you".into())
        );
        assert_eq!(history.len(), 1);
        assert_eq!(crate::dataset::stats(dir.path()).unwrap().total, 1);
    }

    #[tokio::test]
    async fn proactive_chatter_is_gated_to_silence() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline_with(CannedReasoner::speaking("what a pretty menu"), dir.path());
        let mut history = ConversationHistory::new();

        let result = p.run_turn(&mut history, None, true, None).await;

        assert!(result.utterance.is_silence());
        assert_eq!(result.status, PipelineStatus::Ok);
        // Silent turns still produce a log entry.
        assert_eq!(crate::dataset::stats(dir.path()).unwrap().silent, 1);
    }

    #[tokio::test]
    async fn proactive_urgent_remark_passes_gate() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline_with(
            CannedReasoner::speaking("heads up, there is an error dialog"),
            dir.path(),
        );
        let mut history = ConversationHistory::new();

        let result = p.run_turn(&mut history, None, true, None).await;
        assert!(!result.utterance.is_silence());
    }

    #[tokio::test]
    async fn reasoner_failure_returns_apology_without_logging() {
        let dir = tempfile::tempdir().unwrap();
        let mut p = pipeline_with(CannedReasoner::failing(), dir.path());
        let mut history = ConversationHistory::new();

        let result = p.run_turn(&mut history, Some("hello?"), false, None).await;

        assert_eq!(result.status, PipelineStatus::Error);
        assert_eq!(result.utterance, Utterance::Speak(APOLOGY_REPLY.into()));
        assert!(history.is_empty());
        assert_eq!(crate::dataset::stats(dir.path()).unwrap().total, 0);
    }

    #[tokio::test]
    async fn capture_failure_uses_placeholder_and_proceeds() {
        let dir = tempfile::tempdir().unwrap();
        let p = ResponsePipeline::new(
            Box::new(CannedReasoner::speaking("hello anyway")),
            Box::new(NullFrameSource),
            InteractionLogger::new(dir.path()).unwrap(),
            PersonaConfig::default(),
            &ReasoningConfig::default(),
        );
        let mut p = p;
        let mut history = ConversationHistory::new();

        let result = p.run_turn(&mut history, Some("you there?"), false, None).await;

        assert_eq!(result.status, PipelineStatus::Ok);
        let turn = history.recent(1).next().unwrap();
        assert!(turn.capture_failed);
    }

    #[tokio::test]
    async fn vision_pre_pass_runs_before_reply_call() {
        let dir = tempfile::tempdir().unwrap();
        let reasoner = CannedReasoner {
            responses: vec![
                "a terminal with red error text".to_string(),
                r#"{"thought": "t", "reply": "careful, that build failed"}"#.to_string(),
            ],
            calls: AtomicUsize::new(0),
            seen_prompts: Mutex::new(Vec::new()),
            fail: false,
        };
        let mut p = ResponsePipeline::new(
            Box::new(reasoner),
            Box::new(FixedFrameSource),
            InteractionLogger::new(dir.path()).unwrap(),
            PersonaConfig::default(),
            &ReasoningConfig {
                vision_model: Some("moondream".into()),
                ..ReasoningConfig::default()
            },
        );
        let mut history = ConversationHistory::new();

        let result = p.run_turn(&mut history, Some("how's it going"), false, None).await;
        assert_eq!(
            result.utterance,
            Utterance::Speak("careful, that build failed".into())
        );
    }
}

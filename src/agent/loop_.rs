//! The main agent loop.
//!
//! One cooperative loop owns every piece of mutable state: the
//! conversation history, the engagement scheduler, the pipeline and the
//! personal memory. The only other task is the speech listener, which
//! communicates exclusively through an unbounded channel. At most one
//! pipeline turn is in flight at a time; Ctrl-C drops whatever is
//! running and exits.

use crate::capture::CommandFrameSource;
use crate::config::Config;
use crate::dataset::InteractionLogger;
use crate::engage::EngagementScheduler;
use crate::history::{ConversationHistory, Utterance};
use crate::listener::{CommandAudioSource, HttpTranscriber, spawn_listener};
use crate::memory::{MemoryStore, PersonalMemory};
use crate::pipeline::{PipelineStatus, ResponsePipeline};
use crate::reasoning::create_reasoner;
use crate::speech::{HttpSynthesizer, SpeechOutput};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio_util::sync::CancellationToken;

/// Poll cadence of the main loop. Short enough that recognized speech
/// feels immediate, long enough to stay idle between turns.
const TICK_PERIOD: Duration = Duration::from_millis(500);

/// What one tick of the loop did. Returned so the caller (and tests)
/// can observe loop decisions without reaching into private state.
#[derive(Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to do this tick.
    Idle,
    /// A user utterance was handled; the agent replied (or apologized).
    UserTurn(Utterance),
    /// The scheduler fired a proactive turn.
    ProactiveTurn(Utterance),
}

/// Everything one running agent owns. Built once from config, then
/// driven tick by tick.
pub struct AgentRuntime {
    pipeline: ResponsePipeline,
    speech: SpeechOutput,
    scheduler: EngagementScheduler,
    history: ConversationHistory,
    memory: PersonalMemory,
    memory_store: MemoryStore,
    speech_rx: UnboundedReceiver<String>,
}

impl AgentRuntime {
    pub fn new(
        pipeline: ResponsePipeline,
        speech: SpeechOutput,
        scheduler: EngagementScheduler,
        memory: PersonalMemory,
        memory_store: MemoryStore,
        speech_rx: UnboundedReceiver<String>,
    ) -> Self {
        Self {
            pipeline,
            speech,
            scheduler,
            history: ConversationHistory::new(),
            memory,
            memory_store,
            speech_rx,
        }
    }

    /// Shared flag handed to the listener so it can ignore the agent's
    /// own playback.
    #[must_use]
    pub fn is_speaking_flag(&self) -> Arc<std::sync::atomic::AtomicBool> {
        self.speech.is_speaking_flag()
    }

    /// One tick: recognized user speech first, then the proactive
    /// scheduler. Turns run to completion within the tick, so a second
    /// turn can never start while one is in flight.
    pub async fn process_tick(&mut self, now: Instant) -> TickOutcome {
        if let Ok(text) = self.speech_rx.try_recv() {
            return TickOutcome::UserTurn(self.user_turn(&text, now).await);
        }

        if self.scheduler.tick(now) {
            return TickOutcome::ProactiveTurn(self.proactive_turn(now).await);
        }

        TickOutcome::Idle
    }

    async fn user_turn(&mut self, text: &str, now: Instant) -> Utterance {
        self.scheduler.note_user_speech(now);

        let result = self
            .pipeline
            .run_turn(
                &mut self.history,
                Some(text),
                false,
                self.memory.user_name.as_deref(),
            )
            .await;

        if let Utterance::Speak(reply) = &result.utterance {
            self.speech.say(reply).await;
        }

        if result.status == PipelineStatus::Ok {
            self.remember_turn();
        }
        result.utterance
    }

    async fn proactive_turn(&mut self, now: Instant) -> Utterance {
        let result = self
            .pipeline
            .run_turn(
                &mut self.history,
                None,
                true,
                self.memory.user_name.as_deref(),
            )
            .await;

        if result.status != PipelineStatus::Ok {
            // Nobody asked for this turn; apologizing out loud for a
            // failed unprompted remark would be noise. Stay quiet and
            // let the next user turn surface the apology if the
            // service is still down.
            return Utterance::Silence;
        }

        if let Utterance::Speak(reply) = &result.utterance {
            self.speech.say(reply).await;
            self.scheduler.mark_proactive_spoken(now);
        }

        self.remember_turn();
        result.utterance
    }

    /// One-time session opener, built from personal memory rather than
    /// the reasoning service so it works even when the model is down.
    pub async fn greet(&self) {
        let greeting = match (&self.memory.user_name, self.memory.interaction_count) {
            (Some(name), n) if n > 0 => format!("Hey {name}, good to see you again."),
            (Some(name), _) => format!("Hey {name}! I'm here, watching along."),
            (None, n) if n > 0 => "Hey, I'm back. Let's pick up where we left off.".to_string(),
            (None, _) => "Hey! I'm here, watching along. Talk to me whenever.".to_string(),
        };
        self.speech.say(&greeting).await;
    }

    fn remember_turn(&mut self) {
        self.memory.record_turn(Utc::now());
        if let Err(e) = self.memory_store.save(&self.memory) {
            tracing::warn!(error = %e, "could not persist personal memory");
        }
    }
}

/// Build the runtime from config and run until Ctrl-C.
pub async fn run(config: Config) -> Result<()> {
    let memory_store = MemoryStore::new(&config.memory.resolve_path(&config.workspace_dir));
    let memory = memory_store
        .load()
        .context("personal memory file exists but could not be read")?;

    let logger = InteractionLogger::new(&config.dataset.resolve_dir(&config.workspace_dir))?;
    let pipeline = ResponsePipeline::new(
        create_reasoner(&config.reasoning),
        Box::new(CommandFrameSource::new(&config.capture)),
        logger,
        config.persona.clone(),
        &config.reasoning,
    );

    let speech = SpeechOutput::new(Box::new(HttpSynthesizer::new(&config.speech)), &config.speech);
    let scheduler = EngagementScheduler::new(&config.engagement, Instant::now());

    let (speech_tx, speech_rx) = mpsc::unbounded_channel();
    let mut runtime = AgentRuntime::new(
        pipeline,
        speech,
        scheduler,
        memory,
        memory_store,
        speech_rx,
    );

    let cancel = CancellationToken::new();
    let listener = if config.listener.enabled {
        Some(spawn_listener(
            Arc::new(CommandAudioSource::new(&config.listener)),
            Arc::new(HttpTranscriber::new(&config.listener)),
            speech_tx,
            runtime.is_speaking_flag(),
            cancel.clone(),
        ))
    } else {
        tracing::info!("speech listener disabled; running proactive-only");
        None
    };

    tracing::info!(
        model = %config.reasoning.model,
        backend = %config.reasoning.backend,
        "agent loop started"
    );

    runtime.greet().await;

    let mut interval = tokio::time::interval(TICK_PERIOD);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        // Ctrl-C races the tick body: an in-flight turn is simply
        // dropped on shutdown.
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown requested");
                break;
            }
            outcome = runtime.process_tick(Instant::now()) => {
                if outcome != TickOutcome::Idle {
                    tracing::debug!(?outcome, "turn completed");
                }
            }
        }
    }

    cancel.cancel();
    if let Some(handle) = listener {
        let _ = handle.await;
    }
    tracing::info!("agent loop stopped");
    Ok(())
}

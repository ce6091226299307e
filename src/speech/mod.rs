//! Speech synthesis and playback.
//!
//! Synthesis is an external HTTP service (text + voice + rate in, audio
//! bytes out); playback shells out to a player command. The shared
//! `is_speaking` flag is held for the full playback so the listener can
//! ignore the agent's own voice. No failure here ever crashes the loop:
//! the utterance falls back to a printed line and the turn proceeds.

use crate::config::SpeechConfig;
use crate::error::SpeechError;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Text in, audio bytes out.
#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError>;
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    voice: &'a str,
    rate: &'a str,
}

/// HTTP text-to-speech backend.
pub struct HttpSynthesizer {
    url: String,
    voice: String,
    rate: String,
    client: reqwest::Client,
}

impl HttpSynthesizer {
    #[must_use]
    pub fn new(config: &SpeechConfig) -> Self {
        Self {
            url: config.tts_url.clone(),
            voice: config.voice.clone(),
            rate: config.rate.clone(),
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(20))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SpeechError> {
        let response = self
            .client
            .post(&self.url)
            .json(&TtsRequest {
                text,
                voice: &self.voice,
                rate: &self.rate,
            })
            .send()
            .await
            .map_err(|e| SpeechError::Synthesis(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SpeechError::Synthesis(format!(
                "tts service returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpeechError::Synthesis(e.to_string()))?;
        if bytes.is_empty() {
            return Err(SpeechError::Synthesis("tts returned no audio".into()));
        }
        Ok(bytes.to_vec())
    }
}

/// No-synthesis capability: every utterance takes the printed-text
/// fallback path. For audio-less setups and tests.
pub struct NullSynthesizer;

#[async_trait]
impl Synthesizer for NullSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SpeechError> {
        Err(SpeechError::Synthesis("synthesis disabled".to_string()))
    }
}

/// Resets the speaking flag when playback ends, on every exit path.
struct SpeakingGuard(Arc<AtomicBool>);

impl Drop for SpeakingGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

const CLEANUP_ATTEMPTS: u32 = 5;
const CLEANUP_DELAY: Duration = Duration::from_millis(200);

pub struct SpeechOutput {
    synthesizer: Box<dyn Synthesizer>,
    player_command: String,
    is_speaking: Arc<AtomicBool>,
}

impl SpeechOutput {
    #[must_use]
    pub fn new(synthesizer: Box<dyn Synthesizer>, config: &SpeechConfig) -> Self {
        Self {
            synthesizer,
            player_command: config.player_command.clone(),
            is_speaking: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag consumed by the listener.
    #[must_use]
    pub fn is_speaking_flag(&self) -> Arc<AtomicBool> {
        self.is_speaking.clone()
    }

    /// Speak one utterance to completion. Never returns an error: any
    /// synthesis or playback failure falls back to printing the text.
    pub async fn say(&self, text: &str) {
        self.is_speaking.store(true, Ordering::SeqCst);
        let _guard = SpeakingGuard(self.is_speaking.clone());

        let audio = match self.synthesizer.synthesize(text).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(error = %e, "synthesis failed; printing instead");
                println!("{text}");
                return;
            }
        };

        let path = std::env::temp_dir().join(format!("sidekick_voice_{}.mp3", uuid::Uuid::new_v4()));
        if let Err(e) = tokio::fs::write(&path, &audio).await {
            tracing::warn!(error = %e, "could not stage audio; printing instead");
            println!("{text}");
            return;
        }

        if let Err(e) = self.play(&path).await {
            tracing::warn!(error = %e, "playback failed; printing instead");
            println!("{text}");
        }

        cleanup_with_retries(&path).await;
    }

    async fn play(&self, path: &Path) -> Result<(), SpeechError> {
        let rendered = self.player_command.replace("{path}", &path.to_string_lossy());
        let mut parts = rendered.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| SpeechError::Playback("empty player command".to_string()))?;

        let status = tokio::process::Command::new(program)
            .args(parts)
            .status()
            .await
            .map_err(|e| SpeechError::Playback(e.to_string()))?;

        if !status.success() {
            return Err(SpeechError::Playback(format!(
                "player exited with {status}"
            )));
        }
        Ok(())
    }
}

/// Players sometimes hold the file briefly after exiting; retry the
/// delete a few times, then give up silently.
async fn cleanup_with_retries(path: &PathBuf) {
    for _ in 0..CLEANUP_ATTEMPTS {
        match tokio::fs::remove_file(path).await {
            Ok(()) => return,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return,
            Err(_) => tokio::time::sleep(CLEANUP_DELAY).await,
        }
    }
    tracing::debug!(path = %path.display(), "audio artifact left behind after retries");
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSynthesizer(Vec<u8>);

    #[async_trait]
    impl Synthesizer for FixedSynthesizer {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SpeechError> {
            Ok(self.0.clone())
        }
    }

    fn output_with(synth: Box<dyn Synthesizer>, player: &str) -> SpeechOutput {
        SpeechOutput::new(
            synth,
            &SpeechConfig {
                player_command: player.to_string(),
                ..SpeechConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn null_synthesizer_falls_back_without_panicking() {
        let out = output_with(Box::new(NullSynthesizer), "true {path}");
        out.say("hello").await;
        assert!(!out.is_speaking_flag().load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn flag_clears_after_successful_playback() {
        // `true` ignores its argument and succeeds, standing in for a player.
        let out = output_with(Box::new(FixedSynthesizer(vec![1, 2, 3])), "true {path}");
        out.say("test utterance").await;
        assert!(!out.is_speaking_flag().load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn flag_clears_after_player_failure() {
        let out = output_with(Box::new(FixedSynthesizer(vec![1])), "false {path}");
        out.say("test").await;
        assert!(!out.is_speaking_flag().load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn temp_audio_is_deleted_after_playback() {
        let before: Vec<_> = std::fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("sidekick_voice_"))
            .collect();
        let out = output_with(Box::new(FixedSynthesizer(vec![9; 64])), "true {path}");
        out.say("cleanup check").await;
        let after: Vec<_> = std::fs::read_dir(std::env::temp_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("sidekick_voice_"))
            .collect();
        assert!(after.len() <= before.len());
    }

    #[tokio::test]
    async fn cleanup_tolerates_missing_file() {
        let path = std::env::temp_dir().join("sidekick_voice_never_existed.mp3");
        cleanup_with_retries(&path).await;
    }
}

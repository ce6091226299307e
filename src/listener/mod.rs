//! Background speech listener.
//!
//! An independent task records fixed-length audio segments and sends
//! them to the speech-to-text service. Recognized text is pushed into a
//! single-consumer queue polled by the main loop; the listener never
//! touches loop-owned state. Segments with no recognizable speech are
//! dropped silently — that is the normal case, not a failure. While the
//! synthesizer reports it is speaking, transcripts are discarded so the
//! agent does not react to its own voice.

use crate::config::ListenerConfig;
use crate::error::SpeechError;
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Produces one recorded audio segment at a time (WAV bytes), or `None`
/// when no audio device is available this round.
#[async_trait]
pub trait AudioSource: Send + Sync {
    async fn next_segment(&self) -> Result<Option<Vec<u8>>, SpeechError>;
}

/// Shells out to the configured recorder command for each segment.
/// `{path}` and `{secs}` are substituted before running.
pub struct CommandAudioSource {
    command: String,
    segment_secs: u64,
}

impl CommandAudioSource {
    #[must_use]
    pub fn new(config: &ListenerConfig) -> Self {
        Self {
            command: config.record_command.clone(),
            segment_secs: config.segment_secs,
        }
    }
}

#[async_trait]
impl AudioSource for CommandAudioSource {
    async fn next_segment(&self) -> Result<Option<Vec<u8>>, SpeechError> {
        let dir = tempfile::tempdir().map_err(|e| SpeechError::Recorder(e.to_string()))?;
        let path = dir.path().join("segment.wav");
        let rendered = self
            .command
            .replace("{path}", &path.to_string_lossy())
            .replace("{secs}", &self.segment_secs.to_string());

        let mut parts = rendered.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| SpeechError::Recorder("empty record command".to_string()))?;

        let status = tokio::process::Command::new(program)
            .args(parts)
            .status()
            .await
            .map_err(|e| SpeechError::Recorder(e.to_string()))?;
        if !status.success() {
            return Err(SpeechError::Recorder(format!(
                "recorder exited with {status}"
            )));
        }

        match tokio::fs::read(&path).await {
            Ok(bytes) if !bytes.is_empty() => Ok(Some(bytes)),
            _ => Ok(None),
        }
    }
}

/// Speech-to-text seam: WAV in, recognized text out. "No speech" is
/// `Ok(None)`, not an error.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, wav: &[u8]) -> Result<Option<String>, SpeechError>;
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Whisper-server style HTTP transcriber: raw WAV body in, JSON
/// `{"text": ...}` out, with a language hint in the query string.
pub struct HttpTranscriber {
    url: String,
    language: String,
    client: reqwest::Client,
}

impl HttpTranscriber {
    #[must_use]
    pub fn new(config: &ListenerConfig) -> Self {
        Self {
            url: config.stt_url.clone(),
            language: config.language.clone(),
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, wav: &[u8]) -> Result<Option<String>, SpeechError> {
        let response = self
            .client
            .post(&self.url)
            .query(&[("language", self.language.as_str())])
            .header("content-type", "audio/wav")
            .body(wav.to_vec())
            .send()
            .await
            .map_err(|e| SpeechError::Transcription(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SpeechError::Transcription(format!(
                "stt service returned {}",
                response.status()
            )));
        }

        let parsed: TranscriptionResponse = response
            .json()
            .await
            .map_err(|e| SpeechError::Transcription(e.to_string()))?;

        let text = parsed.text.trim().to_string();
        if text.is_empty() {
            return Ok(None);
        }
        Ok(Some(text))
    }
}

/// Spawn the listener task. It stops when `cancel` fires; segment and
/// recognition errors are logged and the loop continues.
pub fn spawn_listener(
    audio: Arc<dyn AudioSource>,
    transcriber: Arc<dyn Transcriber>,
    tx: UnboundedSender<String>,
    is_speaking: Arc<AtomicBool>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("speech listener started");
        loop {
            let segment = tokio::select! {
                () = cancel.cancelled() => break,
                segment = audio.next_segment() => segment,
            };

            let wav = match segment {
                Ok(Some(wav)) => wav,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "audio segment unavailable");
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    continue;
                }
            };

            match transcriber.transcribe(&wav).await {
                Ok(Some(text)) => {
                    if is_speaking.load(Ordering::SeqCst) {
                        tracing::debug!("discarding transcript heard during playback");
                        continue;
                    }
                    tracing::info!(%text, "user speech recognized");
                    if tx.send(text).is_err() {
                        break; // main loop is gone
                    }
                }
                Ok(None) => {} // no speech in the segment; expected
                Err(e) => tracing::debug!(error = %e, "transcription dropped"),
            }
        }
        tracing::info!("speech listener stopped");
    })
}

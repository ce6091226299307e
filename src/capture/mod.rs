//! Frame capture seam.
//!
//! The actual screen/camera grab is an external collaborator: Sidekick
//! shells out to a configurable screenshot command and reads the image
//! it wrote. The pipeline only ever sees a [`Frame`]; on capture failure
//! it substitutes [`placeholder_frame`] and records that fact on the turn.

use crate::config::CaptureConfig;
use crate::error::CaptureError;
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// One still image, already encoded (PNG or JPEG) for transport.
#[derive(Debug, Clone)]
pub struct Frame {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    /// Base64 body for embedding in a reasoning request.
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// Filename extension matching the encoding.
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self.mime_type {
            "image/png" => "png",
            _ => "jpg",
        }
    }
}

/// 1x1 grey PNG used whenever the capturer cannot produce a frame. The
/// request builder adds a "[capture unavailable]" note alongside it so
/// the model does not invent a scene.
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90,
    0x77, 0x53, 0xDE, 0x00, 0x00, 0x00, 0x0C, 0x49, 0x44, 0x41, 0x54, 0x78, 0xDA, 0x63, 0x68,
    0x68, 0x68, 0x00, 0x00, 0x03, 0x04, 0x01, 0x81, 0x75, 0x2E, 0x01, 0xBC, 0x00, 0x00, 0x00,
    0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

#[must_use]
pub fn placeholder_frame() -> Frame {
    Frame {
        bytes: PLACEHOLDER_PNG.to_vec(),
        mime_type: "image/png",
        captured_at: Utc::now(),
    }
}

/// Produces one visual frame on demand. Stateless from the caller's
/// perspective.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn capture(&self) -> Result<Frame, CaptureError>;
}

/// Shells out to the configured screenshot command. `{path}` in the
/// command is replaced with a scratch file the command must write.
pub struct CommandFrameSource {
    command: String,
    timeout: Duration,
}

impl CommandFrameSource {
    #[must_use]
    pub fn new(config: &CaptureConfig) -> Self {
        Self {
            command: config.command.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl FrameSource for CommandFrameSource {
    async fn capture(&self) -> Result<Frame, CaptureError> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("frame.png");
        let rendered = self.command.replace("{path}", &path.to_string_lossy());

        let mut parts = rendered.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| CaptureError::Command("empty capture command".to_string()))?;

        let status = tokio::time::timeout(
            self.timeout,
            tokio::process::Command::new(program).args(parts).status(),
        )
        .await
        .map_err(|_| CaptureError::Command(format!("timed out after {:?}", self.timeout)))?
        .map_err(|e| CaptureError::Command(e.to_string()))?;

        if !status.success() {
            return Err(CaptureError::Command(format!(
                "capture command exited with {status}"
            )));
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CaptureError::NoFrame(e.to_string()))?;
        if bytes.is_empty() {
            return Err(CaptureError::NoFrame("capture wrote an empty file".into()));
        }

        Ok(Frame {
            bytes,
            mime_type: "image/png",
            captured_at: Utc::now(),
        })
    }
}

/// No-capture capability. Always errors, which the pipeline recovers
/// from with the placeholder frame; useful for audio-only setups and
/// for tests.
pub struct NullFrameSource;

#[async_trait]
impl FrameSource for NullFrameSource {
    async fn capture(&self) -> Result<Frame, CaptureError> {
        Err(CaptureError::NoFrame("frame capture disabled".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_is_a_png() {
        let f = placeholder_frame();
        assert_eq!(&f.bytes[..8], b"\x89PNG\r\n\x1a\n");
        assert_eq!(f.mime_type, "image/png");
        assert_eq!(f.extension(), "png");
    }

    #[test]
    fn base64_round_trips() {
        let f = placeholder_frame();
        let encoded = f.to_base64();
        let decoded = BASE64.decode(encoded).unwrap();
        assert_eq!(decoded, f.bytes);
    }

    #[tokio::test]
    async fn null_source_always_fails() {
        let err = NullFrameSource.capture().await.unwrap_err();
        assert!(err.to_string().contains("disabled"));
    }

    #[tokio::test]
    async fn command_source_reads_written_frame() {
        // `cp` stands in for a screenshot tool: copy a prepared image to {path}.
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("canned.png");
        std::fs::write(&src, PLACEHOLDER_PNG).unwrap();

        let config = CaptureConfig {
            command: format!("cp {} {{path}}", src.display()),
            timeout_secs: 5,
        };
        let frame = CommandFrameSource::new(&config).capture().await.unwrap();
        assert_eq!(frame.bytes, PLACEHOLDER_PNG);
    }

    #[tokio::test]
    async fn failing_command_surfaces_error() {
        let config = CaptureConfig {
            command: "false".to_string(),
            timeout_secs: 5,
        };
        let err = CommandFrameSource::new(&config).capture().await.unwrap_err();
        assert!(matches!(err, CaptureError::Command(_)));
    }
}

use crate::error::ReasoningError;
use async_trait::async_trait;

/// One request to the remote reasoning service. Generation parameters
/// (temperature, output cap, timeout) live on the backend, configured
/// once; the request carries only per-turn content.
#[derive(Debug, Clone)]
pub struct ReasoningRequest {
    /// Persona / system instruction.
    pub system_prompt: Option<String>,
    /// Fully rendered turn prompt (history, mode flag, user text).
    pub prompt: String,
    /// Base64-encoded frame, when the turn carries one.
    pub image_b64: Option<String>,
    /// MIME type of the encoded frame.
    pub image_mime: &'static str,
    /// Model identifier for this call. The describe pre-pass and the
    /// reply call may use different models on the same backend.
    pub model: String,
}

impl ReasoningRequest {
    #[must_use]
    pub fn text_only(system_prompt: Option<String>, prompt: String, model: String) -> Self {
        Self {
            system_prompt,
            prompt,
            image_b64: None,
            image_mime: "image/png",
            model,
        }
    }

    #[must_use]
    pub fn with_image(mut self, image_b64: String, image_mime: &'static str) -> Self {
        self.image_b64 = Some(image_b64);
        self.image_mime = image_mime;
        self
    }
}

/// A reasoning backend: request in, raw completion text out.
///
/// Implementations never retry internally; the pipeline's recovery
/// policy (apology string, never fatal) is the only retry layer.
#[async_trait]
pub trait Reasoner: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, request: &ReasoningRequest) -> Result<String, ReasoningError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_attaches_image() {
        let req = ReasoningRequest::text_only(None, "look".into(), "llava".into())
            .with_image("QUJD".into(), "image/jpeg");
        assert_eq!(req.image_b64.as_deref(), Some("QUJD"));
        assert_eq!(req.image_mime, "image/jpeg");
    }

    #[test]
    fn text_only_has_no_image() {
        let req = ReasoningRequest::text_only(Some("sys".into()), "p".into(), "m".into());
        assert!(req.image_b64.is_none());
        assert_eq!(req.system_prompt.as_deref(), Some("sys"));
    }
}

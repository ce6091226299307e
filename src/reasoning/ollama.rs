use crate::config::ReasoningConfig;
use crate::error::ReasoningError;
use crate::reasoning::traits::{Reasoner, ReasoningRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub struct OllamaReasoner {
    base_url: String,
    temperature: f64,
    max_tokens: u32,
    timeout_secs: u64,
    client: Client,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    stream: bool,
    options: Options,
}

#[derive(Debug, Serialize)]
struct Options {
    temperature: f64,
    num_predict: u32,
    /// Strong penalty keeps the companion from repeating itself turn
    /// after turn on similar frames.
    repeat_penalty: f64,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaReasoner {
    #[must_use]
    pub fn new(config: &ReasoningConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            client: Client::builder()
                .timeout(Duration::from_secs(config.timeout_secs))
                .connect_timeout(Duration::from_secs(5))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn build_request(&self, request: &ReasoningRequest) -> GenerateRequest {
        GenerateRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            system: request.system_prompt.clone(),
            images: request.image_b64.clone().into_iter().collect(),
            stream: false,
            options: Options {
                temperature: self.temperature,
                num_predict: self.max_tokens,
                repeat_penalty: 1.6,
            },
        }
    }
}

#[async_trait]
impl Reasoner for OllamaReasoner {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn complete(&self, request: &ReasoningRequest) -> Result<String, ReasoningError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = self.build_request(request);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ReasoningError::Timeout {
                        backend: "ollama".into(),
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    ReasoningError::Request {
                        backend: "ollama".into(),
                        message: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            return Err(ReasoningError::Status {
                backend: "ollama".into(),
                status: response.status().as_u16(),
            });
        }

        let parsed: GenerateResponse =
            response.json().await.map_err(|e| ReasoningError::Request {
                backend: "ollama".into(),
                message: e.to_string(),
            })?;

        let text = parsed.response.trim().to_string();
        if text.is_empty() {
            return Err(ReasoningError::EmptyCompletion {
                backend: "ollama".into(),
            });
        }
        Ok(text)
    }
}

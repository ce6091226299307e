use crate::config::ReasoningConfig;
use crate::error::ReasoningError;
use crate::reasoning::traits::{Reasoner, ReasoningRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

/// Any OpenAI-compatible `/v1/chat/completions` endpoint. Frames ride
/// along as `image_url` content parts with a data URI.
pub struct OpenAiCompatibleReasoner {
    base_url: String,
    api_key: Option<String>,
    temperature: f64,
    max_tokens: u32,
    timeout_secs: u64,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Value>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiCompatibleReasoner {
    #[must_use]
    pub fn new(config: &ReasoningConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
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

    fn build_request(&self, request: &ReasoningRequest) -> ChatRequest {
        let mut messages = Vec::new();

        if let Some(system) = &request.system_prompt {
            messages.push(json!({ "role": "system", "content": system }));
        }

        let user_content = match &request.image_b64 {
            Some(image) => json!([
                { "type": "text", "text": request.prompt },
                {
                    "type": "image_url",
                    "image_url": {
                        "url": format!("data:{};base64,{}", request.image_mime, image)
                    }
                }
            ]),
            None => json!(request.prompt),
        };
        messages.push(json!({ "role": "user", "content": user_content }));

        ChatRequest {
            model: request.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl Reasoner for OpenAiCompatibleReasoner {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: &ReasoningRequest) -> Result<String, ReasoningError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_request(request);

        let mut builder = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ReasoningError::Timeout {
                    backend: "openai".into(),
                    timeout_secs: self.timeout_secs,
                }
            } else {
                ReasoningError::Request {
                    backend: "openai".into(),
                    message: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(ReasoningError::Status {
                backend: "openai".into(),
                status: response.status().as_u16(),
            });
        }

        let parsed: ChatResponse =
            response.json().await.map_err(|e| ReasoningError::Request {
                backend: "openai".into(),
                message: e.to_string(),
            })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(ReasoningError::EmptyCompletion {
                backend: "openai".into(),
            });
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reasoner() -> OpenAiCompatibleReasoner {
        OpenAiCompatibleReasoner::new(&ReasoningConfig {
            base_url: "https://api.example.com/".into(),
            api_key: Some("sk-test".into()),
            ..ReasoningConfig::default()
        })
    }

    #[test]
    fn url_is_trimmed() {
        assert_eq!(reasoner().base_url, "https://api.example.com");
    }

    #[test]
    fn image_becomes_data_uri_part() {
        let r = reasoner();
        let req = ReasoningRequest::text_only(None, "describe".into(), "gpt-4o-mini".into())
            .with_image("QUJD".into(), "image/png");
        let json = serde_json::to_string(&r.build_request(&req)).unwrap();
        assert!(json.contains("data:image/png;base64,QUJD"));
        assert!(json.contains("image_url"));
        assert!(json.contains("gpt-4o-mini"));
    }

    #[test]
    fn text_only_uses_plain_content() {
        let r = reasoner();
        let req = ReasoningRequest::text_only(Some("sys".into()), "hello".into(), "m".into());
        let json = serde_json::to_string(&r.build_request(&req)).unwrap();
        assert!(json.contains("\"content\":\"hello\""));
        assert!(json.contains("\"role\":\"system\""));
    }

    #[test]
    fn response_extracts_first_choice() {
        let json = r#"{"choices":[{"message":{"role":"assistant","content":"hey there"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("hey there")
        );
    }
}

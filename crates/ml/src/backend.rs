use std::future::Future;
use std::time::Duration;

use gie_core::truncate_chars;
use reqwest::Client;
use serde_json::Value;

use crate::ClassifierError;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const MAX_ERROR_BODY_CHARS: usize = 240;

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

/// One structured-generation round trip. Implementations return the raw
/// output text; parsing belongs to the caller.
pub trait CompletionBackend: Send + Sync {
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl Future<Output = Result<String, ClassifierError>> + Send;
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub connect_timeout: Duration,
    pub timeout: Duration,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_OPENAI_MODEL.to_string(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(6),
            timeout: Duration::from_secs(20),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiBackend {
    pub fn new(config: OpenAiConfig) -> Result<Self, ClassifierError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .build()
            .map_err(|err| ClassifierError::Transport(format!("failed to build HTTP client: {err}")))?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!("{}/responses", self.config.base_url.trim_end_matches('/'))
    }
}

impl CompletionBackend for OpenAiBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ClassifierError> {
        let payload = serde_json::json!({
            "model": self.config.model,
            "input": [
                {
                    "role": "system",
                    "content": [
                        { "type": "input_text", "text": request.system }
                    ]
                },
                {
                    "role": "user",
                    "content": [
                        { "type": "input_text", "text": request.user }
                    ]
                }
            ],
            "temperature": request.temperature,
            "max_output_tokens": request.max_output_tokens
        });

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.config.api_key.as_str())
            .json(&payload)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Status {
                status: status.as_u16(),
                body: truncate_chars(&body, MAX_ERROR_BODY_CHARS),
            });
        }

        let body: Value = response.json().await.map_err(|err| {
            if err.is_timeout() {
                ClassifierError::Timeout
            } else {
                ClassifierError::Malformed(format!("response envelope is not json: {err}"))
            }
        })?;

        extract_output_text(&body)
            .filter(|text| !text.trim().is_empty())
            .ok_or(ClassifierError::EmptyOutput)
    }
}

fn request_error(err: reqwest::Error) -> ClassifierError {
    if err.is_timeout() {
        ClassifierError::Timeout
    } else {
        ClassifierError::Transport(err.to_string())
    }
}

/// Reads the Responses API text: the `output_text` shortcut when present,
/// otherwise every `output[].content[]` item of type `output_text`.
pub fn extract_output_text(payload: &Value) -> Option<String> {
    if let Some(value) = payload.get("output_text").and_then(Value::as_str) {
        return Some(value.to_string());
    }

    let output = payload.get("output")?.as_array()?;
    let mut text = String::new();
    for item in output {
        let Some(content) = item.get("content").and_then(Value::as_array) else {
            continue;
        };
        for content_item in content {
            if content_item.get("type").and_then(Value::as_str) == Some("output_text") {
                if let Some(chunk) = content_item.get("text").and_then(Value::as_str) {
                    text.push_str(chunk);
                }
            }
        }
    }

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

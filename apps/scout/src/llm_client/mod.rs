//! LLM Client — the single point of entry for all Claude API calls in the scout.
//!
//! Proposal and flowchart generation both go through [`TextGenerator::complete`],
//! so overload handling lives here and nowhere else.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::retry::{RetryError, RetryPolicy, Retryable};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all generation calls. Hardcoded so proposals stay consistent run to run.
pub const MODEL: &str = "claude-3-5-sonnet-20240620";
/// Attempts made while the API reports it is overloaded.
pub const MAX_ATTEMPTS: u32 = 3;
const OVERLOADED_ERROR_TYPE: &str = "overloaded_error";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("API overloaded: {message}")]
    Overloaded { message: String },

    #[error("API still overloaded after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

impl Retryable for LlmError {
    fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Overloaded { .. })
    }
}

/// Anything that can turn a prompt into text. `LlmClient` is the production
/// implementation; generators depend on this trait only.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError>;
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    #[serde(default)]
    pub content: Vec<ContentBlock>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// Text of the first content block, if it carries any.
    pub fn text(&self) -> Option<&str> {
        self.content
            .first()
            .and_then(|b| b.text.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    #[serde(rename = "type")]
    error_type: String,
    #[serde(default)]
    message: String,
}

/// Wraps the Anthropic Messages API with overload-aware retries.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(api_key: String, retry: RetryPolicy) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
            api_url: ANTHROPIC_API_URL.to_string(),
            retry,
        })
    }

    /// Points the client at a different Messages endpoint (proxies, tests).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// One request, no retries. Overloads come back as `LlmError::Overloaded`
    /// so the retry policy can decide what to do with them.
    async fn call_once(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::OK {
            if let Ok(parsed) = serde_json::from_str::<LlmResponse>(&body) {
                if let Some(text) = parsed.text() {
                    if let Some(usage) = &parsed.usage {
                        debug!(
                            "LLM call succeeded: input_tokens={}, output_tokens={}",
                            usage.input_tokens, usage.output_tokens
                        );
                    }
                    return Ok(text.to_string());
                }
            }
        }

        // Overload is signalled by the error type, whatever the status code.
        match serde_json::from_str::<AnthropicError>(&body) {
            Ok(err) if err.error.error_type == OVERLOADED_ERROR_TYPE => Err(LlmError::Overloaded {
                message: err.error.message,
            }),
            Ok(err) => Err(LlmError::Api {
                status: status.as_u16(),
                message: format!("{}: {}", err.error.error_type, err.error.message),
            }),
            Err(_) => Err(LlmError::Api {
                status: status.as_u16(),
                message: if status == StatusCode::OK {
                    format!("response carried no generated content: {body}")
                } else {
                    body
                },
            }),
        }
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, LlmError> {
        let result = self
            .retry
            .run("Claude API", |_| self.call_once(prompt, max_tokens))
            .await;

        match result {
            Ok(text) => {
                info!("Claude API call succeeded ({} chars)", text.len());
                Ok(text)
            }
            Err(RetryError::Exhausted { attempts, last }) => {
                error!("Claude API gave up after {attempts} attempts: {last}");
                Err(LlmError::Exhausted { attempts })
            }
            Err(RetryError::Permanent(e)) => {
                error!("Claude API call failed: {e}");
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn success_body(text: &str) -> serde_json::Value {
        json!({
            "content": [{"type": "text", "text": text}],
            "usage": {"input_tokens": 12, "output_tokens": 34}
        })
    }

    fn overloaded_body() -> serde_json::Value {
        json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}})
    }

    fn client_for(server: &MockServer, delay: Duration) -> LlmClient {
        LlmClient::new("sk-test".to_string(), RetryPolicy::linear(MAX_ATTEMPTS, delay))
            .unwrap()
            .with_api_url(format!("{}/v1/messages", server.uri()))
    }

    #[tokio::test]
    async fn test_success_returns_first_block_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("Hey! hello")))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::ZERO);
        let text = client.complete("prompt", 100).await.unwrap();
        assert_eq!(text, "Hey! hello");
    }

    #[tokio::test]
    async fn test_overloaded_twice_then_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(overloaded_body()))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(success_body("third time")))
            .expect(1)
            .mount(&server)
            .await;

        let delay = Duration::from_millis(20);
        let client = client_for(&server, delay);
        let start = Instant::now();
        let text = client.complete("prompt", 100).await.unwrap();

        assert_eq!(text, "third time");
        assert!(start.elapsed() >= delay * 1 + delay * 2);
    }

    #[tokio::test]
    async fn test_overloaded_every_time_is_exhausted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_json(overloaded_body()))
            .expect(u64::from(MAX_ATTEMPTS))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(1));
        let err = client.complete("prompt", 100).await.unwrap_err();
        assert!(matches!(err, LlmError::Exhausted { attempts } if attempts == MAX_ATTEMPTS));
    }

    #[tokio::test]
    async fn test_non_overload_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "type": "error",
                "error": {"type": "invalid_request_error", "message": "max_tokens too large"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(1));
        let err = client.complete("prompt", 100).await.unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("invalid_request_error"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_ok_status_without_content_is_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"content": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(1));
        let err = client.complete("prompt", 100).await.unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        let client = LlmClient::new(
            "sk-test".to_string(),
            RetryPolicy::linear(MAX_ATTEMPTS, Duration::from_millis(1)),
        )
        .unwrap()
        .with_api_url("http://127.0.0.1:1/v1/messages");

        let err = client.complete("prompt", 100).await.unwrap_err();
        assert!(matches!(err, LlmError::Transport(_)));
    }

    #[test]
    fn test_only_overload_is_retryable() {
        assert!(LlmError::Overloaded {
            message: String::new()
        }
        .is_retryable());
        assert!(!LlmError::Api {
            status: 500,
            message: String::new()
        }
        .is_retryable());
        assert!(!LlmError::Exhausted { attempts: 3 }.is_retryable());
    }

    #[test]
    fn test_response_text_skips_blank_blocks() {
        let response: LlmResponse = serde_json::from_value(json!({
            "content": [{"type": "text", "text": "   "}]
        }))
        .unwrap();
        assert!(response.text().is_none());
    }
}

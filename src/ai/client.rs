//! LLM (`OpenAI`) API client module
//!
//! Encapsulates the chat-completion call that turns a report excerpt into a summary.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use openai_api_rs::v1::chat_completion::{ChatCompletionMessage, Content, MessageRole};
use regex::Regex;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{info, warn};

use super::prompt::{SYSTEM_PROMPT, user_message};
use crate::core::config::AppConfig;
use crate::core::models::SummaryResult;
use crate::errors::AnalyzeError;

/// Longest provider diagnostic forwarded to callers.
const MAX_DETAIL_CHARS: usize = 300;

static API_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"sk-[A-Za-z0-9_\-*]{4,}").expect("static regex compile"));

/// Anything that can turn report text into a summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// `text` is already truncated by the caller.
    async fn summarize(&self, text: &str) -> Result<SummaryResult, AnalyzeError>;
}

/// LLM API client for generating summaries
pub struct LlmClient {
    http: Client,
    api_key: String,
    org_id: Option<String>,
    model_name: String,
    endpoint: String,
    max_tokens: u32,
    max_retries: usize,
}

impl LlmClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &AppConfig) -> Result<Self, AnalyzeError> {
        let http = Client::builder()
            .timeout(config.provider_timeout)
            .build()
            .map_err(|e| {
                AnalyzeError::provider(format!("Failed to build OpenAI HTTP client: {e}"))
            })?;

        Ok(Self {
            http,
            api_key: config.openai_api_key.clone(),
            org_id: config.openai_org_id.clone(),
            model_name: config.openai_model.clone(),
            endpoint: format!("{}/chat/completions", config.openai_base_url),
            max_tokens: config.summary_max_tokens,
            max_retries: config.provider_max_retries,
        })
    }

    #[must_use]
    pub fn build_prompt(&self, report_text: &str) -> Vec<ChatCompletionMessage> {
        vec![
            ChatCompletionMessage {
                role: MessageRole::system,
                content: Content::Text(SYSTEM_PROMPT.to_string()),
                name: None,
                tool_calls: None,
                tool_call_id: None,
            },
            ChatCompletionMessage {
                role: MessageRole::user,
                content: Content::Text(user_message(report_text)),
                name: None,
                tool_calls: None,
                tool_call_id: None,
            },
        ]
    }

    #[must_use]
    pub fn build_request_body(&self, prompt: &[ChatCompletionMessage]) -> Value {
        json!({
            "model": self.model_name,
            "messages": build_chat_messages(prompt),
            "max_tokens": self.max_tokens,
        })
    }

    async fn send_once(&self, request_body: &Value) -> Result<SummaryResult, AnalyzeError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(request_body);
        if let Some(org) = &self.org_id {
            request = request.header("OpenAI-Organization", org);
        }

        let response = request.send().await.map_err(|e| {
            let transient = e.is_timeout() || e.is_connect();
            let detail = format!("OpenAI API request failed: {}", e.without_url());
            if transient {
                AnalyzeError::transient_provider(detail)
            } else {
                AnalyzeError::provider(detail)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let error_text = response.text().await.unwrap_or_else(|e| {
                format!("Failed to read error response body (status {status}): {e}")
            });
            return Err(classify_failure(status, retry_after, &error_text, &self.api_key));
        }

        let response_json: Value = response.json().await.map_err(|e| {
            AnalyzeError::provider(format!("Failed to parse OpenAI response: {e}"))
        })?;

        let content = completion_text(&response_json).ok_or_else(|| {
            AnalyzeError::provider("OpenAI response contained no completion text")
        })?;

        Ok(SummaryResult { content })
    }
}

#[async_trait]
impl Summarizer for LlmClient {
    async fn summarize(&self, text: &str) -> Result<SummaryResult, AnalyzeError> {
        let prompt = self.build_prompt(text);

        #[cfg(feature = "debug-logs")]
        info!("Using ChatGPT prompt:\n{:?}", prompt);

        #[cfg(not(feature = "debug-logs"))]
        info!(
            model = %self.model_name,
            excerpt_chars = text.chars().count(),
            "Requesting summary"
        );

        let request_body = self.build_request_body(&prompt);
        let strategy = ExponentialBackoff::from_millis(2)
            .factor(250)
            .max_delay(Duration::from_secs(4))
            .map(jitter)
            .take(self.max_retries);

        let this = self;
        let body = &request_body;
        RetryIf::start(
            strategy,
            move || async move {
                let result = this.send_once(body).await;
                if let Err(e) = &result
                    && e.is_transient()
                {
                    warn!("Transient OpenAI failure, may retry: {}", e);
                }
                result
            },
            AnalyzeError::is_transient,
        )
        .await
    }
}

/// Converts prompt messages into the chat-completions wire format.
pub(crate) fn build_chat_messages(prompt: &[ChatCompletionMessage]) -> Vec<Value> {
    prompt
        .iter()
        .filter_map(|m| {
            let role_str = match m.role {
                MessageRole::system => "system",
                MessageRole::assistant => "assistant",
                MessageRole::user | MessageRole::function | MessageRole::tool => "user",
            };

            match &m.content {
                Content::Text(t) => Some(json!({ "role": role_str, "content": t })),
                Content::ImageUrl(_) => None,
            }
        })
        .collect()
}

/// Maps a non-2xx provider answer to the matching domain error.
#[must_use]
pub fn classify_failure(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
    api_key: &str,
) -> AnalyzeError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        warn!(
            retry_after_secs = retry_after.map(|d| d.as_secs()),
            "OpenAI rate limited (429)"
        );
        return AnalyzeError::ProviderRateLimit { retry_after };
    }

    let detail = format!(
        "OpenAI API error (status {status}): {}",
        redact_credentials(&provider_message(body), api_key)
    );
    if status.is_server_error() {
        AnalyzeError::transient_provider(detail)
    } else {
        AnalyzeError::provider(detail)
    }
}

/// Pulls `error.message` out of an `OpenAI` error body, falling back to the raw text.
fn provider_message(body: &str) -> String {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(ToString::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string());

    message.chars().take(MAX_DETAIL_CHARS).collect()
}

/// Masks anything that looks like an API key, plus the configured key itself.
#[must_use]
pub fn redact_credentials(text: &str, api_key: &str) -> String {
    let masked = if api_key.is_empty() {
        text.to_string()
    } else {
        text.replace(api_key, "[redacted]")
    };
    API_KEY_RE.replace_all(&masked, "sk-[redacted]").into_owned()
}

/// Reads `choices[0].message.content`.
#[must_use]
pub fn completion_text(response: &Value) -> Option<String> {
    response
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Parse the `Retry-After` header (whole seconds) from a provider response.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> LlmClient {
        LlmClient::new(&AppConfig::with_api_key("sk-test-secret-0000")).unwrap()
    }

    #[test]
    fn test_request_body_carries_model_prompt_and_token_cap() {
        let client = client();
        let body = client.build_request_body(&client.build_prompt("Glucose 180 mg/dL"));

        assert_eq!(body["model"], "gpt-3.5-turbo");
        assert_eq!(body["max_tokens"], 500);

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert_eq!(messages[0]["content"], SYSTEM_PROMPT);
        assert_eq!(messages[1]["role"], "user");
        assert!(
            messages[1]["content"]
                .as_str()
                .unwrap()
                .ends_with("Glucose 180 mg/dL")
        );
    }

    #[test]
    fn test_endpoint_uses_configured_base_url() {
        let mut config = AppConfig::with_api_key("k");
        config.openai_base_url = "http://127.0.0.1:9999/v1".to_string();
        let client = LlmClient::new(&config).unwrap();
        assert_eq!(client.endpoint, "http://127.0.0.1:9999/v1/chat/completions");
    }

    #[test]
    fn test_classify_429_is_provider_rate_limit() {
        let err = classify_failure(
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(7)),
            "{\"error\":{\"message\":\"Rate limit reached\"}}",
            "k",
        );
        assert!(matches!(
            err,
            AnalyzeError::ProviderRateLimit { retry_after: Some(d) } if d == Duration::from_secs(7)
        ));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_classify_5xx_is_transient_and_4xx_is_not() {
        let server = classify_failure(StatusCode::BAD_GATEWAY, None, "upstream down", "k");
        assert!(server.is_transient());

        let auth = classify_failure(StatusCode::UNAUTHORIZED, None, "nope", "k");
        assert!(!auth.is_transient());
        assert_eq!(auth.code(), "provider_error");
    }

    #[test]
    fn test_classify_redacts_credentials_from_details() {
        let body = "{\"error\":{\"message\":\"Incorrect API key provided: sk-live-abcdef123456\"}}";
        let err = classify_failure(StatusCode::UNAUTHORIZED, None, body, "sk-live-abcdef123456");
        let details = err.to_string();
        assert!(details.contains("Incorrect API key provided"));
        assert!(!details.contains("abcdef123456"));
    }

    #[test]
    fn test_completion_text_reads_first_choice() {
        let response = json!({
            "choices": [{ "message": { "role": "assistant", "content": "  All values normal.  " } }]
        });
        assert_eq!(completion_text(&response).as_deref(), Some("All values normal."));
        assert_eq!(completion_text(&json!({ "choices": [] })), None);
        assert_eq!(
            completion_text(&json!({ "choices": [{ "message": { "content": "" } }] })),
            None
        );
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(RETRY_AFTER, "12".parse().unwrap());
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(12)));
    }
}

//! Chat-completion client: sends the system prompt plus the bounded conversation
//! window to an OpenRouter-compatible endpoint.
//!
//! One synchronous attempt per turn, fixed timeout, no retries and no backoff.
//! Outcomes are interpreted into exactly one static text per failure class; the
//! underlying error is logged, never surfaced to the visitor.

use folio_core::{GatewayConfig, Message, Role};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Static reply when the provider rate-limits us (HTTP 429). Not retried.
pub const RATE_LIMITED_TEXT: &str =
    "I'm receiving too many requests. Please wait a moment and try again.";
/// Static reply when the outbound call exceeds the configured timeout.
pub const TIMEOUT_TEXT: &str = "Response timed out. Please try a shorter question.";
/// Static reply for any other transport or HTTP failure.
pub const CONNECTIVITY_TEXT: &str = "Connection issue. Please try again shortly.";
/// Static reply when a 2xx body does not contain a completion.
pub const MALFORMED_TEXT: &str = "An error occurred. Please try again.";

/// Mode for LLM invocation: mock (deterministic, no network) or live.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LlmMode {
    #[default]
    Mock,
    Live,
}

impl LlmMode {
    fn from_config(config: &GatewayConfig) -> Self {
        match config.llm_mode.as_str() {
            "live" => LlmMode::Live,
            _ => LlmMode::Mock,
        }
    }
}

#[derive(Debug, Error)]
enum CompletionError {
    #[error("provider rate limited the request")]
    RateLimited,
    #[error("provider call timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("provider response carried no completion text")]
    Malformed,
}

fn fallback_text(err: &CompletionError) -> &'static str {
    match err {
        CompletionError::RateLimited => RATE_LIMITED_TEXT,
        CompletionError::Timeout => TIMEOUT_TEXT,
        CompletionError::Transport(_) | CompletionError::Status(_) => CONNECTIVITY_TEXT,
        CompletionError::Malformed => MALFORMED_TEXT,
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Client for the provider's chat-completions endpoint. Generation parameters
/// are static configuration, never visitor-controlled.
pub struct CompletionClient {
    mode: LlmMode,
    http: reqwest::Client,
    timeout: Duration,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    referer: String,
    app_title: String,
}

impl CompletionClient {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            mode: LlmMode::from_config(config),
            http: reqwest::Client::new(),
            timeout: Duration::from_secs(config.request_timeout_secs),
            api_url: config.api_url.clone(),
            api_key: config.api_key(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            referer: config.referer.clone(),
            app_title: config.app_title.clone(),
        }
    }

    pub fn mode(&self) -> LlmMode {
        self.mode
    }

    /// Sends `[system] + window` and returns displayable text. Never errors past
    /// this boundary: each exit path yields a string the widget can render.
    pub async fn complete(&self, system_prompt: &str, window: &[Message]) -> String {
        if self.mode == LlmMode::Mock {
            return self.mock_complete(window);
        }
        match self.request_completion(system_prompt, window).await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(target: "folio::llm", error = %err, "provider call failed");
                fallback_text(&err).to_string()
            }
        }
    }

    async fn request_completion(
        &self,
        system_prompt: &str,
        window: &[Message],
    ) -> Result<String, CompletionError> {
        let mut messages = Vec::with_capacity(window.len() + 1);
        messages.push(Message::new(Role::System, system_prompt));
        messages.extend_from_slice(window);

        let body = CompletionRequest {
            model: &self.model,
            messages: &messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
        };

        let response = self
            .http
            .post(&self.api_url)
            .timeout(self.timeout)
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", &self.referer)
            .header("X-Title", &self.app_title)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout
                } else {
                    CompletionError::Transport(e)
                }
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(CompletionError::RateLimited);
        }
        if !status.is_success() {
            return Err(CompletionError::Status(status));
        }

        let parsed: CompletionResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout
            } else {
                CompletionError::Malformed
            }
        })?;

        parsed
            .choices
            .first()
            .map(|c| c.message.content.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(CompletionError::Malformed)
    }

    /// Deterministic reply derived from the last user message. Keeps the full
    /// chat path exercisable without a provider key or network access.
    fn mock_complete(&self, window: &[Message]) -> String {
        let last_user = window
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");
        let preview: String = last_user.chars().take(80).collect();
        format!(
            "[mock] Thanks for asking about \"{}\" — happy to tell you more about this portfolio.",
            preview
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    fn test_config(api_url: String, llm_mode: &str, timeout_secs: u64) -> GatewayConfig {
        GatewayConfig {
            app_name: "Test Gateway".to_string(),
            port: 0,
            frontend_dir: "frontend".to_string(),
            portfolio_path: "portfolio_data.json".to_string(),
            history_limit: 10,
            message_max_chars: 500,
            session_secret: "0123456789abcdef0123456789abcdef".to_string(),
            session_ttl_secs: 1800,
            session_sweep_secs: 300,
            llm_mode: llm_mode.to_string(),
            openrouter_api_key: "test-key".to_string(),
            api_url,
            model: "meta-llama/llama-3.3-70b-instruct:free".to_string(),
            max_tokens: 200,
            temperature: 0.7,
            top_p: 0.9,
            request_timeout_secs: timeout_secs,
            referer: "https://portfolio-chatbot.com".to_string(),
            app_title: "Portfolio AI Chatbot".to_string(),
        }
    }

    /// Binds the stub provider on an ephemeral port and returns its endpoint URL.
    async fn spawn_stub(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1/chat/completions", addr)
    }

    fn live_client(api_url: String, timeout_secs: u64) -> CompletionClient {
        CompletionClient::from_config(&test_config(api_url, "live", timeout_secs))
    }

    fn window() -> Vec<Message> {
        vec![Message::new(Role::User, "Hi")]
    }

    #[tokio::test]
    async fn rate_limited_yields_the_exact_static_text() {
        let url = spawn_stub(Router::new().route(
            "/v1/chat/completions",
            post(|| async { StatusCode::TOO_MANY_REQUESTS }),
        ))
        .await;
        let reply = live_client(url, 5).complete("system", &window()).await;
        assert_eq!(reply, RATE_LIMITED_TEXT);
    }

    #[tokio::test]
    async fn server_error_yields_the_connectivity_text() {
        let url = spawn_stub(Router::new().route(
            "/v1/chat/completions",
            post(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        ))
        .await;
        let reply = live_client(url, 5).complete("system", &window()).await;
        assert_eq!(reply, CONNECTIVITY_TEXT);
    }

    #[tokio::test]
    async fn connection_refused_yields_the_connectivity_text() {
        // Nothing listens here; the connect fails outright.
        let reply = live_client("http://127.0.0.1:1/v1/chat/completions".to_string(), 5)
            .complete("system", &window())
            .await;
        assert_eq!(reply, CONNECTIVITY_TEXT);
    }

    #[tokio::test]
    async fn malformed_success_body_yields_the_generic_text() {
        let url = spawn_stub(Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(serde_json::json!({ "unexpected": true })) }),
        ))
        .await;
        let reply = live_client(url, 5).complete("system", &window()).await;
        assert_eq!(reply, MALFORMED_TEXT);
    }

    #[tokio::test]
    async fn slow_provider_yields_the_timeout_text() {
        let url = spawn_stub(Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        ))
        .await;
        let reply = live_client(url, 1).complete("system", &window()).await;
        assert_eq!(reply, TIMEOUT_TEXT);
    }

    #[tokio::test]
    async fn success_returns_trimmed_first_choice() {
        let url = spawn_stub(Router::new().route(
            "/v1/chat/completions",
            post(|Json(body): Json<serde_json::Value>| async move {
                // The system prompt must lead the message list.
                assert_eq!(body["messages"][0]["role"], "system");
                assert_eq!(body["messages"][1]["role"], "user");
                assert_eq!(body["model"], "meta-llama/llama-3.3-70b-instruct:free");
                Json(serde_json::json!({
                    "choices": [
                        { "message": { "role": "assistant", "content": "  Hello there!  " } }
                    ]
                }))
            }),
        ))
        .await;
        let reply = live_client(url, 5).complete("system", &window()).await;
        assert_eq!(reply, "Hello there!");
    }

    #[tokio::test]
    async fn empty_choices_yield_the_generic_text() {
        let url = spawn_stub(Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(serde_json::json!({ "choices": [] })) }),
        ))
        .await;
        let reply = live_client(url, 5).complete("system", &window()).await;
        assert_eq!(reply, MALFORMED_TEXT);
    }

    #[tokio::test]
    async fn mock_mode_never_touches_the_network() {
        let client = CompletionClient::from_config(&test_config(
            // Unroutable on purpose; mock mode must not care.
            "http://127.0.0.1:1/v1/chat/completions".to_string(),
            "mock",
            1,
        ));
        assert_eq!(client.mode(), LlmMode::Mock);
        let reply = client.complete("system", &window()).await;
        assert!(reply.contains("Hi"));
        assert_eq!(reply, client.complete("system", &window()).await);
    }
}

//! Gateway configuration. Load from TOML or env.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::CoreError;

/// Placeholder secret shipped for local development. Deployments must override it.
const DEFAULT_SESSION_SECRET: &str = "change-me-portfolio-session-secret-0123456789";
/// Placeholder provider key. `OPENROUTER_API_KEY` in the environment always wins.
const DEFAULT_API_KEY: &str = "your-api-key-here";

/// Signed-cookie key derivation needs at least this much secret material.
const MIN_SECRET_BYTES: usize = 32;

/// Global application configuration (gateway, sessions, provider call).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Application identity used in logs and startup banner.
    pub app_name: String,
    /// HTTP port for the gateway.
    pub port: u16,
    /// Directory holding the front-end page (`index.html`) and its `static/` assets.
    pub frontend_dir: String,
    /// Path of the portfolio JSON document loaded once at startup.
    pub portfolio_path: String,

    /// Bound N of the per-visitor conversation buffer (messages, not turns).
    pub history_limit: usize,
    /// Chat input ceiling; longer messages get the canned too-long reply.
    pub message_max_chars: usize,

    /// Secret used to sign the visitor session cookie. Minimum 32 bytes.
    pub session_secret: String,
    /// Idle sessions older than this are evicted by the background sweeper.
    pub session_ttl_secs: u64,
    /// Sweeper tick interval.
    pub session_sweep_secs: u64,

    /// LLM mode: "mock" (no network, deterministic replies) or "live".
    pub llm_mode: String,
    /// Provider key from config. Prefer the `OPENROUTER_API_KEY` env var.
    pub openrouter_api_key: String,
    /// Chat-completions endpoint URL.
    pub api_url: String,
    /// Model identifier sent with every completion request.
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    /// Outbound call timeout. One attempt, no retries.
    pub request_timeout_secs: u64,
    /// Static identification headers sent to the provider.
    pub referer: String,
    pub app_title: String,
}

impl GatewayConfig {
    /// Load config from file and environment. Precedence: env `FOLIO_CONFIG` path >
    /// `config/gateway.toml` > defaults, with `FOLIO__*` env vars on top.
    pub fn load() -> Result<Self, CoreError> {
        let config_path =
            std::env::var("FOLIO_CONFIG").unwrap_or_else(|_| "config/gateway".to_string());
        let builder = config::Config::builder()
            .set_default("app_name", "Portfolio Chat Gateway")?
            .set_default("port", 8080_i64)?
            .set_default("frontend_dir", "frontend")?
            .set_default("portfolio_path", "portfolio_data.json")?
            .set_default("history_limit", 10_i64)?
            .set_default("message_max_chars", 500_i64)?
            .set_default("session_secret", DEFAULT_SESSION_SECRET)?
            .set_default("session_ttl_secs", 1800_i64)?
            .set_default("session_sweep_secs", 300_i64)?
            .set_default("llm_mode", "mock")?
            .set_default("openrouter_api_key", DEFAULT_API_KEY)?
            .set_default("api_url", "https://openrouter.ai/api/v1/chat/completions")?
            .set_default("model", "meta-llama/llama-3.3-70b-instruct:free")?
            .set_default("max_tokens", 200_i64)?
            .set_default("temperature", 0.7_f64)?
            .set_default("top_p", 0.9_f64)?
            .set_default("request_timeout_secs", 20_i64)?
            .set_default("referer", "https://portfolio-chatbot.com")?
            .set_default("app_title", "Portfolio AI Chatbot")?;

        let path = Path::new(&config_path);
        let builder = if path.exists() {
            builder.add_source(config::File::from(path))
        } else {
            builder
        };

        let built = builder
            .add_source(config::Environment::with_prefix("FOLIO").separator("__"))
            .build()?;

        let loaded: Self = built.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Rejects configurations that would only fail later at request time.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.session_secret.len() < MIN_SECRET_BYTES {
            return Err(CoreError::InvalidConfig(format!(
                "session_secret must be at least {} bytes, got {}",
                MIN_SECRET_BYTES,
                self.session_secret.len()
            )));
        }
        if self.history_limit == 0 {
            return Err(CoreError::InvalidConfig(
                "history_limit must be at least 1".into(),
            ));
        }
        if self.message_max_chars == 0 {
            return Err(CoreError::InvalidConfig(
                "message_max_chars must be at least 1".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(CoreError::InvalidConfig(
                "request_timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Provider key for outbound calls. `OPENROUTER_API_KEY` in the environment
    /// always wins over the config value.
    pub fn api_key(&self) -> String {
        std::env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .unwrap_or_else(|| self.openrouter_api_key.clone())
    }

    /// True when the insecure development secret is still in place.
    pub fn uses_default_secret(&self) -> bool {
        self.session_secret == DEFAULT_SESSION_SECRET
    }

    /// True when no real provider key has been configured anywhere.
    pub fn uses_default_api_key(&self) -> bool {
        self.api_key() == DEFAULT_API_KEY
    }
}

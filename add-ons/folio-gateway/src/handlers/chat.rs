//! Chat-turn logic: input ceiling, history append, prompt assembly, provider call.
//!
//! The HTTP handler in `main.rs` owns status codes and the session cookie; this
//! module owns what happens inside one turn. Every path returns displayable
//! text — once validation has passed, a turn cannot fail.

use chrono::Utc;
use folio_core::{build_system_prompt, Role};
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Static reply for internal faults absorbed at the outermost handler layer.
pub(crate) const GENERIC_ERROR_TEXT: &str = "Error processing your message. Please try again.";

#[derive(Deserialize)]
pub(crate) struct ChatRequest {
    /// A missing field reads as empty and is rejected by the handler.
    #[serde(default)]
    pub(crate) message: String,
}

#[derive(Serialize)]
pub(crate) struct ChatResponse {
    pub(crate) response: String,
    pub(crate) timestamp: String,
}

/// Canned reply for messages beyond the input ceiling. The gateway is not
/// invoked and nothing is persisted to the visitor's history.
pub(crate) fn too_long_text(limit: usize) -> String {
    format!(
        "Please keep your questions under {} characters for faster responses.",
        limit
    )
}

/// Runs one chat turn for the visitor. `message` is already trimmed and
/// non-empty.
pub(crate) async fn chat_turn(state: &AppState, token: &str, message: &str) -> String {
    let chars = message.chars().count();
    if chars > state.config.message_max_chars {
        tracing::info!(target: "folio::chat", chars, "rejecting oversized message");
        return too_long_text(state.config.message_max_chars);
    }

    state.sessions.append(token, Role::User, message);
    let window = state.sessions.window(token);
    let prompt = build_system_prompt(state.portfolio.document(), Utc::now().date_naive());
    let reply = state.llm.complete(&prompt, &window).await;
    state.sessions.append(token, Role::Assistant, &reply);
    tracing::info!(
        target: "folio::chat",
        window_messages = window.len(),
        reply_chars = reply.len(),
        "chat turn completed"
    );
    reply
}

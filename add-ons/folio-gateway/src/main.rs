//! Axum gateway for the portfolio chat widget: page render, chat turns, history
//! clear, portfolio export, health probe. Config-driven via GatewayConfig.

mod handlers;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, Key, SameSite, SignedCookieJar};
use chrono::Utc;
use crate::handlers::chat::{ChatRequest, ChatResponse, GENERIC_ERROR_TEXT};
use folio_core::{GatewayConfig, PortfolioStore, SessionStore};
use folio_llm::CompletionClient;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Cookie carrying the opaque visitor token. Conversation state stays server-side.
const SESSION_COOKIE: &str = "folio_session";

/// Served when the configured front-end page cannot be read.
const FALLBACK_PAGE: &str = "<!doctype html><html><head><title>Portfolio Chat</title></head>\
<body><h1>Portfolio Chat</h1><p>Front-end assets are not installed.</p></body></html>";

/// Pre-flight check: portfolio document parses and the port is available.
fn run_verify() -> Result<(), String> {
    let config = GatewayConfig::load().map_err(|e| format!("Config load failed: {}", e))?;

    print!("Checking portfolio document {}... ", config.portfolio_path);
    let store = PortfolioStore::load_path(&config.portfolio_path)
        .map_err(|e| format!("portfolio document unreadable: {}", e))?;
    println!("OK ({})", store.document().personal_info.name);

    print!("Checking port {}... ", config.port);
    let addr = std::net::SocketAddr::from(([127, 0, 0, 1], config.port));
    match std::net::TcpListener::bind(addr) {
        Ok(listener) => {
            drop(listener);
            println!("OK (available)");
        }
        Err(e) => {
            return Err(format!("Port {} BLOCKED: {}", config.port, e));
        }
    }

    println!("\nAll checks passed. Ready to start gateway.");
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env::var calls)
    if let Err(e) = dotenvy::dotenv() {
        eprintln!(
            "[folio-gateway] .env not loaded: {} (using system environment)",
            e
        );
    }

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--verify") {
        match run_verify() {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("PRE-FLIGHT FAILED: {}", e);
                std::process::exit(1);
            }
        }
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(GatewayConfig::load().expect("load GatewayConfig"));
    if config.uses_default_secret() {
        tracing::warn!(
            "session_secret is the development default; set FOLIO__SESSION_SECRET in deployment"
        );
    }
    if config.llm_mode == "live" && config.uses_default_api_key() {
        tracing::warn!("llm_mode is live but no provider key is configured; set OPENROUTER_API_KEY");
    }

    let portfolio = Arc::new(
        PortfolioStore::load_path(&config.portfolio_path).expect("load portfolio document"),
    );
    let sessions = Arc::new(SessionStore::new(config.history_limit));
    let llm = Arc::new(CompletionClient::from_config(&config));

    tokio::spawn(session_sweep_loop(
        Arc::clone(&sessions),
        Duration::from_secs(config.session_ttl_secs),
        Duration::from_secs(config.session_sweep_secs),
    ));

    let cookie_key = Key::derive_from(config.session_secret.as_bytes());
    let port = config.port;
    let app_name = config.app_name.clone();
    let app = build_app(AppState {
        config,
        portfolio,
        sessions,
        llm,
        cookie_key,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("{} listening on {}", app_name, addr);
    axum::serve(tokio::net::TcpListener::bind(addr).await.unwrap(), app)
        .await
        .unwrap();
}

/// Periodically evicts visitor sessions idle longer than `ttl`.
async fn session_sweep_loop(sessions: Arc<SessionStore>, ttl: Duration, tick: Duration) {
    tracing::info!(
        target: "folio::session",
        ttl_secs = ttl.as_secs(),
        tick_secs = tick.as_secs(),
        "Session sweeper started"
    );
    let mut interval = tokio::time::interval(tick);
    loop {
        interval.tick().await;
        let evicted = sessions.sweep_idle(ttl);
        if evicted > 0 {
            tracing::info!(
                target: "folio::session",
                evicted,
                live = sessions.len(),
                "Swept idle visitor sessions"
            );
        }
    }
}

fn build_app(state: AppState) -> Router {
    let assets_dir = PathBuf::from(&state.config.frontend_dir).join("static");
    Router::new()
        .route("/", get(home))
        .route("/chat", post(chat))
        .route("/clear", post(clear))
        .route("/portfolio-data", get(portfolio_data))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new(assets_dir))
        .layer(CatchPanicLayer::custom(absorb_panic))
        .with_state(state)
}

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) config: Arc<GatewayConfig>,
    pub(crate) portfolio: Arc<PortfolioStore>,
    pub(crate) sessions: Arc<SessionStore>,
    pub(crate) llm: Arc<CompletionClient>,
    pub(crate) cookie_key: Key,
}

impl axum::extract::FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Key {
        state.cookie_key.clone()
    }
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

fn session_cookie(token: &str) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Returns the jar plus the visitor token, minting one if the request carried none.
fn ensure_session(jar: SignedCookieJar) -> (SignedCookieJar, String) {
    match jar.get(SESSION_COOKIE) {
        Some(cookie) => {
            let token = cookie.value().to_string();
            (jar, token)
        }
        None => {
            let token = uuid::Uuid::new_v4().to_string();
            let jar = jar.add(session_cookie(&token));
            (jar, token)
        }
    }
}

/// GET / – fresh visit: drop any previous conversation, mint a new token, serve the page.
async fn home(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> (SignedCookieJar, Html<String>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.remove(cookie.value());
    }
    let token = uuid::Uuid::new_v4().to_string();
    let jar = jar.add(session_cookie(&token));

    let index_path = PathBuf::from(&state.config.frontend_dir).join("index.html");
    let page = match tokio::fs::read_to_string(&index_path).await {
        Ok(page) => page,
        Err(e) => {
            tracing::warn!(
                target: "folio::gateway",
                path = %index_path.display(),
                error = %e,
                "front-end page unreadable, serving fallback"
            );
            FALLBACK_PAGE.to_string()
        }
    };
    (jar, Html(page))
}

/// POST /chat – one conversation turn. Always answers with well-formed JSON.
async fn chat(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Json(req): Json<ChatRequest>,
) -> Response {
    let message = req.message.trim().to_string();
    if message.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Empty message" })),
        )
            .into_response();
    }

    let (jar, token) = ensure_session(jar);
    let reply = handlers::chat::chat_turn(&state, &token, &message).await;
    (
        jar,
        Json(ChatResponse {
            response: reply,
            timestamp: now_rfc3339(),
        }),
    )
        .into_response()
}

/// POST /clear – empty the visitor's conversation buffer.
async fn clear(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> (SignedCookieJar, Json<serde_json::Value>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.clear(cookie.value());
    }
    (jar, Json(serde_json::json!({ "status": "success" })))
}

/// GET /portfolio-data – the document exactly as loaded from disk.
async fn portfolio_data(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(state.portfolio.raw().clone())
}

/// GET /health – liveness check for the front end and scripts.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "timestamp": now_rfc3339() }))
}

/// Outermost absorber: a panicking handler becomes the generic error payload,
/// 200 with a well-formed body so the widget never renders a broken response.
fn absorb_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(target: "folio::gateway", panic = %detail, "request handler panicked");
    (
        StatusCode::OK,
        Json(serde_json::json!({
            "response": GENERIC_ERROR_TEXT,
            "timestamp": now_rfc3339(),
        })),
    )
        .into_response()
}

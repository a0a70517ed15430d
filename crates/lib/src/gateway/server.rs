//! Gateway HTTP server (single port).

use crate::activity::Activity;
use crate::bot::ProactiveBot;
use crate::channels::{ChannelAdapter, ConnectorAdapter};
use crate::config::{self, Config};
use crate::gateway::render::notify_page;
use crate::notify::Notifier;
use crate::store::ConversationReferenceStore;
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Html,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Shared state for the gateway (config, reference store, adapter, bot, notifier).
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<Config>,
    pub store: Arc<ConversationReferenceStore>,
    pub adapter: Arc<dyn ChannelAdapter>,
    pub bot: Arc<ProactiveBot>,
    pub notifier: Arc<Notifier>,
}

impl GatewayState {
    /// Wire a fresh reference store into the bot (writer) and the notifier (reader).
    pub fn new(config: Config, adapter: Arc<dyn ChannelAdapter>) -> Self {
        let store = Arc::new(ConversationReferenceStore::new());
        let app_id = config::resolve_app_id(&config);
        let notifier = Notifier::new(app_id, store.clone(), adapter.clone());
        Self {
            config: Arc::new(config),
            bot: Arc::new(ProactiveBot::new(store.clone())),
            notifier: Arc::new(notifier),
            store,
            adapter,
        }
    }
}

/// Run the gateway server with the HTTP connector adapter; binds to
/// config.gateway.bind:config.gateway.port. Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: Config) -> Result<()> {
    let adapter = Arc::new(ConnectorAdapter::new(config::resolve_app_id(&config)));
    let state = GatewayState::new(config, adapter);
    serve(state).await
}

/// Serve the given state until a shutdown signal arrives.
pub async fn serve(state: GatewayState) -> Result<()> {
    let bind_addr = format!(
        "{}:{}",
        state.config.gateway.bind.trim(),
        state.config.gateway.port
    );
    let store = state.store.clone();
    let app = Router::new()
        .route("/", get(health_http))
        .route("/api/messages", post(messages_http))
        .route("/api/notify", get(notify_http))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("gateway listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!(
        "gateway stopped; dropping {} conversation reference(s)",
        store.len()
    );
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// Base url users should hit for the notify endpoint: configured public url, else the
/// request's Host header, else the bind address.
fn server_url(config: &Config, headers: &HeaderMap) -> String {
    if let Some(url) = config::resolve_public_url(config) {
        return url;
    }
    match headers.get(header::HOST).and_then(|v| v.to_str().ok()) {
        Some(host) if !host.trim().is_empty() => format!("http://{}/", host.trim()),
        _ => format!("http://{}:{}/", config.gateway.bind.trim(), config.gateway.port),
    }
}

/// POST /api/messages: one inbound activity from the channel; runs the bot turn inline.
async fn messages_http(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Json(activity): Json<Activity>,
) -> StatusCode {
    let url = server_url(&state.config, &headers);
    let ctx = state.adapter.turn_context(activity.conversation_reference());
    match state.bot.on_turn(&ctx, &activity, &url).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            log::warn!(
                "inbound: turn for {} in {} failed: {}",
                activity.from.id,
                activity.conversation.id,
                e
            );
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct NotifyParams {
    #[serde(default)]
    user: String,
    #[serde(default)]
    message: String,
}

/// GET /api/notify?user=..&message=..: proactive trigger. Always 200; the page says what happened.
async fn notify_http(
    State(state): State<GatewayState>,
    Query(params): Query<NotifyParams>,
) -> (StatusCode, Html<String>) {
    let cancel = CancellationToken::new();
    // Client gone => request future dropped => delivery cancelled.
    let _guard = cancel.clone().drop_guard();
    let timeout = Duration::from_secs(state.config.notify.timeout_secs);

    let notify = state
        .notifier
        .notify(&params.user, &params.message, cancel.clone());
    tokio::pin!(notify);
    let outcome = tokio::select! {
        outcome = &mut notify => outcome,
        _ = tokio::time::sleep(timeout) => {
            log::warn!("notify: delivery to {} timed out after {:?}", params.user, timeout);
            cancel.cancel();
            notify.await
        }
    };
    (StatusCode::OK, Html(notify_page(&params.user, &outcome)))
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    let mut users = state.store.user_ids();
    users.sort();
    Json(json!({
        "runtime": "running",
        "port": state.config.gateway.port,
        "conversations": users.len(),
        "users": users,
    }))
}

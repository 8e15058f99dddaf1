// Library interface for cast_receiver
// Exposes the channel plumbing, dispatcher, and HTTP surface for embedding in tests

pub mod config;
pub mod dispatcher;
pub mod display;
pub mod metrics;
pub mod protocol;
pub mod registry;
pub mod views;
pub mod websocket;

pub use dispatcher::{ChannelEvent, ChannelEvents, MessageDispatcher, drive_events};
pub use display::Display;
pub use metrics::ReceiverMetrics;
pub use protocol::ReceiverMessage;
pub use registry::{ChannelHandle, ChannelRegistry};

use axum::{
    Json, Router,
    extract::{State, WebSocketUpgrade},
    response::{Html, IntoResponse},
    routing::get,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ReceiverConfig;
use crate::metrics::HealthStatus;

/// Depth of the queue between the socket layer and the dispatch loop.
pub const EVENT_QUEUE_DEPTH: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ReceiverConfig>,
    pub registry: Arc<ChannelRegistry>,
    pub display: Arc<Display>,
    pub metrics: Arc<ReceiverMetrics>,
    pub events: mpsc::Sender<ChannelEvent>,
}

impl AppState {
    /// Build the shared state plus the event receiver that the dispatch loop
    /// consumes (hand it to [`drive_events`]).
    pub fn new(config: ReceiverConfig) -> (Self, mpsc::Receiver<ChannelEvent>) {
        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
        let state = Self {
            display: Arc::new(Display::new(config.initial_title.clone())),
            config: Arc::new(config),
            registry: Arc::new(ChannelRegistry::new()),
            metrics: Arc::new(ReceiverMetrics::new()),
            events: events_tx,
        };
        (state, events_rx)
    }
}

/// All receiver routes: status page, sender channel endpoint, and health/metrics.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/display", get(display_state))
        .route("/channel", get(channel_handler))
        .route("/health", get(health))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .route("/metrics", get(metrics_snapshot))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// HTTP handlers

async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.display.snapshot();
    let channels = state.registry.summaries();
    Html(views::status_page(&state.config.application_name, &snapshot, &channels).into_string())
}

async fn display_state(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.display.snapshot();
    Json(json!({
        "title": snapshot.title,
        "updated_at": snapshot.updated_at,
        "open_channels": state.registry.channel_count(),
    }))
}

async fn channel_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| websocket::handle_channel_socket(socket, state))
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthStatus {
        status: "healthy".to_string(),
        open_channels: state.registry.channel_count() as u64,
        uptime_secs: state.metrics.uptime_secs(),
    })
}

async fn liveness() -> impl IntoResponse {
    Json(json!({ "status": "alive" }))
}

async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    // The receiver is ready as soon as the dispatch loop's queue is up.
    let ready = !state.events.is_closed();
    if ready {
        Json(json!({ "status": "ready" })).into_response()
    } else {
        (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not ready" })),
        )
            .into_response()
    }
}

async fn metrics_snapshot(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}

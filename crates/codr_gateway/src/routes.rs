use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use codr_bus::{Bus, JobStore};
use codr_ids::JobId;
use serde::Serialize;

use crate::session::handle_session;
use crate::state::AppState;

pub fn router<S, B>(state: AppState<S, B>) -> Router
where
    S: JobStore + Clone + Send + Sync + 'static,
    B: Bus + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/ws/execute", get(ws_execute::<S, B>))
        .route("/api/jobs/create", post(create_job::<S, B>))
        .route("/api/websocket/status", get(websocket_status::<S, B>))
        .route("/health", get(health::<S, B>))
        .with_state(state)
}

async fn ws_execute<S, B>(ws: WebSocketUpgrade, State(state): State<AppState<S, B>>) -> Response
where
    S: JobStore + Clone + Send + Sync + 'static,
    B: Bus + Clone + Send + Sync + 'static,
{
    ws.on_upgrade(move |socket| handle_session(socket, state))
}

#[derive(Serialize)]
struct CreateJobResponse {
    job_id: String,
    job_token: String,
    expires_at: chrono::DateTime<chrono::Utc>,
}

async fn create_job<S, B>(State(state): State<AppState<S, B>>, headers: HeaderMap) -> Response
where
    S: JobStore + Clone + Send + Sync + 'static,
    B: Bus + Clone + Send + Sync + 'static,
{
    let provided = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if !state.api_key_matches(provided) {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let job_id = JobId::new();
    let minted = state.token_service.mint(&job_id);
    Json(CreateJobResponse {
        job_id: minted.job_id.to_string(),
        job_token: minted.job_token,
        expires_at: minted.expires_at,
    })
    .into_response()
}

#[derive(Serialize)]
struct WebsocketStatusResponse {
    active_sessions: usize,
}

async fn websocket_status<S, B>(State(state): State<AppState<S, B>>, headers: HeaderMap) -> Response
where
    S: JobStore + Clone + Send + Sync + 'static,
    B: Bus + Clone + Send + Sync + 'static,
{
    let provided = headers.get("x-api-key").and_then(|v| v.to_str().ok());
    if !state.api_key_matches(provided) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    Json(WebsocketStatusResponse {
        active_sessions: state.active_session_count(),
    })
    .into_response()
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    bus: &'static str,
}

async fn health<S, B>(State(state): State<AppState<S, B>>) -> Response
where
    S: JobStore + Clone + Send + Sync + 'static,
    B: Bus + Clone + Send + Sync + 'static,
{
    match state.store.ping().await {
        Ok(()) => Json(HealthResponse {
            status: "ok",
            service: "codr-gateway",
            bus: "connected",
        })
        .into_response(),
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded",
                service: "codr-gateway",
                bus: "disconnected",
            }),
        )
            .into_response(),
    }
}

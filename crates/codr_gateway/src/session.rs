//! One WebSocket connection, one job. State machine:
//!
//! ```text
//! Connected → AwaitingAuth → Executing → Done
//!       ↓ timeout            ↓ reject    ↓
//!    Closed(1008)          Closed(1000) Closed(1000)
//! ```
//!
//! Close codes follow `GatewayError::close_code` (spec.md §7): an
//! auth-phase failure (missing/invalid/expired/reused token, malformed or
//! late first frame) closes 1008; a validator rejection sends an error
//! frame and closes 1000 with no job enqueued; any internal failure while
//! setting up the job closes 1011.

use std::time::Duration;

use axum::extract::ws::{CloseFrame, Message, WebSocket};
use codr_bus::{Bus, JobStore};
use codr_ids::JobId;
use codr_protocol::{defaults, ClientFrame, JobQueueEntry, ServerFrame};
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::state::AppState;

pub async fn handle_session<S, B>(mut socket: WebSocket, state: AppState<S, B>)
where
    S: JobStore + Clone + Send + Sync + 'static,
    B: Bus + Clone + Send + Sync + 'static,
{
    state.session_started();
    if let Err(err) = run_session(&mut socket, &state).await {
        let message = err.client_message(state.config.is_development());
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: err.close_code(),
                reason: message.into(),
            })))
            .await;
    }
    state.session_ended();
}

async fn run_session<S, B>(socket: &mut WebSocket, state: &AppState<S, B>) -> Result<(), GatewayError>
where
    S: JobStore + Clone + Send + Sync + 'static,
    B: Bus + Clone + Send + Sync + 'static,
{
    // Connected: wait up to AUTH_FRAME_TIMEOUT_SECS for the first frame.
    let first = tokio::time::timeout(
        Duration::from_secs(defaults::AUTH_FRAME_TIMEOUT_SECS),
        socket.recv(),
    )
    .await
    .map_err(|_| GatewayError::AuthMissing)?
    .ok_or(GatewayError::AuthMissing)?
    .map_err(|e| GatewayError::AuthInvalid(format!("socket error: {e}")))?;

    let text = match first {
        Message::Text(text) => text,
        _ => return Err(GatewayError::AuthInvalid("first frame must be text".to_string())),
    };

    // AwaitingAuth.
    let frame: ClientFrame = serde_json::from_str(&text)
        .map_err(|e| GatewayError::AuthInvalid(format!("malformed execute frame: {e}")))?;
    let ClientFrame::Execute {
        job_id,
        job_token,
        code,
        language,
    } = frame
    else {
        return Err(GatewayError::AuthInvalid(
            "first frame must be type \"execute\"".to_string(),
        ));
    };

    let claims = state.token_service.verify(&job_token, &job_id)?;

    if state.bus.is_used(&claims.jti).await {
        return Err(GatewayError::AuthReused);
    }
    state
        .bus
        .mark_used(&claims.jti, state.config.jwt_expiration_minutes as u64 * 60)
        .await?;

    // Executing.
    let filename = language.default_filename().to_string();
    let report = codr_security::validate(&code, language);
    if !report.ok {
        let reason = report.reason.unwrap_or_else(|| "rejected".to_string());
        send_frame(socket, &ServerFrame::Error { message: reason.clone() }).await;
        return Err(GatewayError::ValidationRejected(reason));
    }

    let queue_depth = state.bus.queue_len(&state.config.job_queue_name).await?;
    if queue_depth >= state.config.max_queue_size {
        let message = format!("queue is at capacity ({} jobs)", state.config.max_queue_size);
        send_frame(socket, &ServerFrame::Error { message: message.clone() }).await;
        return Err(GatewayError::SubmissionMalformed(message));
    }

    state
        .store
        .create(&job_id, code.clone(), language, filename.clone())
        .await?;

    let mut bus_events = state.bus.subscribe(&job_id).await?;

    state
        .bus
        .enqueue(JobQueueEntry {
            job_id: job_id.clone(),
            code,
            language,
            filename,
            queued_at: chrono::Utc::now(),
        })
        .await?;

    info!(job_id = %job_id, "session executing");

    loop {
        tokio::select! {
            bus_frame = bus_events.recv() => {
                match bus_frame {
                    Some(frame) => {
                        let is_complete = matches!(frame, ServerFrame::Complete { .. });
                        send_frame(socket, &frame).await;
                        if is_complete {
                            return Ok(());
                        }
                    }
                    None => return Ok(()),
                }
            }
            client_msg = socket.recv() => {
                match client_msg {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_input(socket, state, &job_id, &text).await;
                    }
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(job_id = %job_id, error = %e, "client socket error");
                        return Ok(());
                    }
                }
            }
        }
    }
}

async fn handle_client_input<S, B>(socket: &mut WebSocket, state: &AppState<S, B>, job_id: &JobId, text: &str)
where
    S: JobStore + Clone + Send + Sync + 'static,
    B: Bus + Clone + Send + Sync + 'static,
{
    let frame: Result<ClientFrame, _> = serde_json::from_str(text);
    match frame {
        Ok(ClientFrame::Input { data }) => {
            if data.len() as u64 > state.config.max_input_kb * 1024 {
                send_frame(
                    socket,
                    &ServerFrame::Error {
                        message: format!("input exceeds {} KB", state.config.max_input_kb),
                    },
                )
                .await;
                return;
            }
            if let Err(e) = state.bus.publish_input(job_id, data).await {
                warn!(job_id = %job_id, error = %e, "failed to publish input");
            }
        }
        Ok(ClientFrame::Execute { .. }) => {
            send_frame(
                socket,
                &ServerFrame::Error {
                    message: "unexpected execute frame after session start".to_string(),
                },
            )
            .await;
        }
        Err(e) => {
            send_frame(
                socket,
                &ServerFrame::Error {
                    message: format!("malformed frame: {e}"),
                },
            )
            .await;
        }
    }
}

async fn send_frame(socket: &mut WebSocket, frame: &ServerFrame) {
    let Ok(payload) = serde_json::to_string(frame) else {
        return;
    };
    if let Err(e) = socket.send(Message::Text(payload.into())).await {
        warn!(error = %e, "send failed, continuing session loop");
    }
}

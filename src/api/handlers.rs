//! HTTP endpoint handlers

use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
};
use tracing::{error, info, warn};

use crate::{
    state::{AppState, TimerState},
    timer::TimerError,
};
use super::responses::{ApiResponse, ErrorResponse, HealthResponse, ResetRequest, StatusResponse};

type HandlerResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Map a timer error to an HTTP status with a JSON body
fn timer_error(action: &str, e: TimerError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match e {
        TimerError::InvalidDuration(_) => {
            warn!("Rejected timer {}: {}", action, e);
            StatusCode::BAD_REQUEST
        }
        TimerError::NoRuntime => {
            error!("Failed to {} timer: {}", action, e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(e.to_string())))
}

fn respond(
    action: &str,
    message: &str,
    result: Result<TimerState, TimerError>,
) -> HandlerResult<ApiResponse> {
    match result {
        Ok(timer_state) => {
            info!("Timer {} endpoint called - {}", action, message);
            Ok(Json(ApiResponse::timer(message, timer_state)))
        }
        Err(e) => Err(timer_error(action, e)),
    }
}

/// Handle POST /timer/start - Start counting down
pub async fn start_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    respond("start", "Timer started", state.start_timer())
}

/// Handle POST /timer/stop - Cancel the countdown, keeping remaining time
pub async fn stop_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    respond("stop", "Timer stopped", state.stop_timer())
}

/// Handle POST /timer/pause - Hold the countdown
pub async fn pause_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    respond("pause", "Timer paused", state.pause_timer())
}

/// Handle POST /timer/resume - Continue a paused countdown
pub async fn resume_handler(State(state): State<Arc<AppState>>) -> HandlerResult<ApiResponse> {
    respond("resume", "Timer resumed", state.resume_timer())
}

/// Parse the optional reset body; only an empty body means "keep the duration"
fn parse_reset_request(body: &[u8]) -> Result<ResetRequest, (StatusCode, Json<ErrorResponse>)> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(ResetRequest::default());
    }

    Json::<ResetRequest>::from_bytes(body)
        .map(|Json(request)| request)
        .map_err(|rejection| {
            warn!("Rejected timer reset body: {}", rejection.body_text());
            (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(rejection.body_text())))
        })
}

/// Handle POST /timer/reset - Restore a full countdown for the next question
pub async fn reset_handler(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> HandlerResult<ApiResponse> {
    let request = parse_reset_request(&body)?;
    respond("reset", "Timer reset", state.reset_timer(request.duration))
}

/// Handle GET /status - Return timer state and question history
pub async fn status_handler(State(state): State<Arc<AppState>>) -> HandlerResult<StatusResponse> {
    let history = match state.get_history() {
        Ok(h) => h,
        Err(e) => {
            error!("Failed to get question history: {}", e);
            return Err((StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse::new(e))));
        }
    };

    let (last_action, last_action_time) = state.get_last_action();

    Ok(Json(StatusResponse {
        timer: state.get_timer_state(),
        history,
        uptime: state.get_uptime(),
        port: state.port,
        host: state.host.clone(),
        last_action,
        last_action_time,
    }))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

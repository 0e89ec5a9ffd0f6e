//! HTTP routes used by the device (and by ops tooling).
//!
//! | route                        | success                                   |
//! |------------------------------|-------------------------------------------|
//! | `POST /device/session/start` | `201 {sessionId, startedAt, message}`     |
//! | `POST /device/session/stop`  | `200 {message}`                           |
//! | `POST /device/detection`     | `200 {received: true}`                    |
//! | `GET  /device/live`          | `200` [`HubStatus`](crate::HubStatus)     |
//! | `GET  /health`               | `200 {status: "ok"}`                      |
//!
//! Errors: `{error: <label>, message}` with the status from [`ApiError`].

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::info;

use super::AppState;
use crate::{detection::DetectionEvent, error::HubError};

/// [`HubError`] rendered as an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub HubError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            HubError::NoActiveSession => StatusCode::CONFLICT,
            HubError::InvalidDetection { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            HubError::Unauthorized { .. } => StatusCode::FORBIDDEN,
            HubError::AlreadyRegistered { .. } | HubError::RoleConflict { .. } => {
                StatusCode::CONFLICT
            }
            HubError::Closed => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<HubError> for ApiError {
    fn from(err: HubError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.0.as_label(),
            "message": self.0.to_string(),
        });
        (self.status(), Json(body)).into_response()
    }
}

pub(super) async fn start_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let start = state.hub.start_session().await?;
    let message = if start.created {
        info!(session = %start.session.session_id, "session started over http");
        "session started"
    } else {
        "session already active"
    };
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "sessionId": start.session.session_id,
            "startedAt": start.session.started_at,
            "message": message,
        })),
    ))
}

pub(super) async fn stop_session(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let message = match state.hub.stop_session().await? {
        Some(session) => {
            info!(session = %session.session_id, "session stopped over http");
            "session stopped"
        }
        None => "no active session",
    };
    Ok(Json(json!({ "message": message })))
}

pub(super) async fn detection(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let event = DetectionEvent::from_json(&body)?;
    state.hub.submit_detection(event).await?;
    Ok(Json(json!({ "received": true })))
}

pub(super) async fn live(State(state): State<AppState>) -> Result<Response, ApiError> {
    let status = state.hub.status().await?;
    Ok(Json(status).into_response())
}

pub(super) async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.hub.status().await?;
    Ok(Json(json!({ "status": "ok" })))
}

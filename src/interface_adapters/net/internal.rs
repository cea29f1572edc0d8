use crate::domain::PlayerId;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::net::client::spawn_session_serializer;
use crate::interface_adapters::state::AppState;
use crate::use_cases::SessionError;

use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, serde::Deserialize)]
pub struct SessionStartRequest {
    // Session id chosen by the roster service.
    session_id: String,
    // Crew members, in seat order.
    #[serde(default)]
    player_ids: Vec<String>,
}

#[derive(Debug, serde::Serialize)]
struct SessionStartResponse {
    session_id: String,
}

fn error(status: StatusCode, message: &str) -> axum::response::Response {
    (status, Json(ErrorResponse::new(message))).into_response()
}

/// Roster entry point: starts a session for the given crew.
pub async fn start_session_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SessionStartRequest>,
) -> impl IntoResponse {
    let session_id = payload.session_id.trim().to_string();
    if session_id.is_empty() {
        return error(StatusCode::BAD_REQUEST, "session_id is required");
    }

    let roster: Result<Vec<PlayerId>, _> = payload
        .player_ids
        .iter()
        .map(|id| id.trim().parse::<PlayerId>())
        .collect();
    let Ok(roster) = roster else {
        return error(StatusCode::BAD_REQUEST, "player_ids must be numeric");
    };

    match state
        .session_registry
        .create_session(session_id.clone(), roster)
        .await
    {
        Ok(session) => {
            // Serializer first so clients can subscribe immediately.
            spawn_session_serializer(&session);
            state
                .session_registry
                .clone()
                .spawn_session_end_watcher(session.session_id.clone(), session.state_tx.subscribe());
            info!(session_id = %session_id, "session created");
            (StatusCode::CREATED, Json(SessionStartResponse { session_id })).into_response()
        }
        Err(SessionError::AlreadyExists) => error(StatusCode::CONFLICT, "session already exists"),
        Err(SessionError::EmptyRoster) => error(StatusCode::BAD_REQUEST, "player_ids is required"),
    }
}

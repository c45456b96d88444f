use axum::{
    extract::State,
    http::StatusCode,
    routing::{delete, post},
    Extension, Json, Router,
};
use flightdesk_core::repository::ReservationStore;
use flightdesk_core::{EngineError, Session};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::auth::{issue_token, CustomerClaims},
    state::AppState,
};

#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
    session_id: Uuid,
}

pub fn routes<S: ReservationStore>() -> Router<AppState<S>> {
    Router::new().route("/v1/sessions", post(login::<S>))
}

/// Routes that need a valid token.
pub fn protected_routes<S: ReservationStore>() -> Router<AppState<S>> {
    Router::new().route("/v1/sessions/current", delete(logout::<S>))
}

/// Every login starts a fresh session, so a token never changes users.
async fn login<S: ReservationStore>(
    State(state): State<AppState<S>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let mut session = Session::new();
    state.service.login(&mut session, &body.username, &body.password).await?;

    let username = session.require_user()?;
    let token = issue_token(&state.auth, username, session.id())?;

    Ok(Json(AuthResponse {
        token,
        session_id: session.id(),
    }))
}

async fn logout<S: ReservationStore>(
    State(state): State<AppState<S>>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<StatusCode, AppError> {
    state.sessions.discard(claims.sid).await.map_err(EngineError::from)?;
    tracing::info!(username = %claims.sub, session_id = %claims.sid, "Session discarded");
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, post},
    Extension, Json, Router,
};
use flightdesk_core::repository::ReservationStore;
use flightdesk_core::{Cancellation, Payment, ReservationDetails, ReservationId};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};

#[derive(Debug, Deserialize)]
struct BookRequest {
    itinerary_id: i64,
}

#[derive(Debug, Serialize)]
struct BookResponse {
    reservation_id: ReservationId,
}

pub fn routes<S: ReservationStore>() -> Router<AppState<S>> {
    Router::new()
        .route("/v1/reservations", post(book::<S>).get(list::<S>))
        .route("/v1/reservations/{id}", delete(cancel::<S>))
        .route("/v1/reservations/{id}/payment", post(pay::<S>))
}

async fn book<S: ReservationStore>(
    State(state): State<AppState<S>>,
    Extension(claims): Extension<CustomerClaims>,
    Json(body): Json<BookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), AppError> {
    let session = state.session_for(&claims).await?;
    let reservation_id = state.service.book(&session, body.itinerary_id).await?;
    Ok((StatusCode::CREATED, Json(BookResponse { reservation_id })))
}

async fn list<S: ReservationStore>(
    State(state): State<AppState<S>>,
    Extension(claims): Extension<CustomerClaims>,
) -> Result<Json<Vec<ReservationDetails>>, AppError> {
    let session = state.session_for(&claims).await?;
    Ok(Json(state.service.reservations(&session).await?))
}

async fn pay<S: ReservationStore>(
    State(state): State<AppState<S>>,
    Extension(claims): Extension<CustomerClaims>,
    Path(id): Path<i64>,
) -> Result<Json<Payment>, AppError> {
    let session = state.session_for(&claims).await?;
    Ok(Json(state.service.pay(&session, ReservationId(id)).await?))
}

async fn cancel<S: ReservationStore>(
    State(state): State<AppState<S>>,
    Extension(claims): Extension<CustomerClaims>,
    Path(id): Path<i64>,
) -> Result<Json<Cancellation>, AppError> {
    let session = state.session_for(&claims).await?;
    Ok(Json(state.service.cancel(&session, ReservationId(id)).await?))
}

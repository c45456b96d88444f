use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use flightdesk_core::account::NewCustomer;
use flightdesk_core::repository::ReservationStore;
use serde::Serialize;

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize)]
struct UserCreated {
    username: String,
}

pub fn routes<S: ReservationStore>() -> Router<AppState<S>> {
    Router::new().route("/v1/users", post(create_user::<S>))
}

async fn create_user<S: ReservationStore>(
    State(state): State<AppState<S>>,
    Json(customer): Json<NewCustomer>,
) -> Result<(StatusCode, Json<UserCreated>), AppError> {
    let username = state.service.create_customer(customer).await?;
    Ok((StatusCode::CREATED, Json(UserCreated { username })))
}

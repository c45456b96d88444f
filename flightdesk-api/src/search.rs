use axum::{extract::State, routing::post, Extension, Json, Router};
use flightdesk_core::repository::ReservationStore;
use flightdesk_core::{EngineError, Itinerary, SearchQuery};
use serde::Serialize;

use crate::{error::AppError, middleware::auth::CustomerClaims, state::AppState};

#[derive(Debug, Serialize)]
struct SearchResponse {
    itineraries: Vec<Itinerary>,
}

pub fn routes<S: ReservationStore>() -> Router<AppState<S>> {
    Router::new().route("/v1/itineraries/search", post(search_itineraries::<S>))
}

/// The session's table is only overwritten once the search has succeeded.
async fn search_itineraries<S: ReservationStore>(
    State(state): State<AppState<S>>,
    Extension(claims): Extension<CustomerClaims>,
    Json(query): Json<SearchQuery>,
) -> Result<Json<SearchResponse>, AppError> {
    let mut session = state.session_for(&claims).await?;
    let itineraries = state.service.search(&mut session, query).await?;

    state
        .sessions
        .save(session.id(), session.itineraries())
        .await
        .map_err(EngineError::from)?;

    Ok(Json(SearchResponse { itineraries }))
}

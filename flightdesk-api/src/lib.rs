use axum::{http::Method, middleware::from_fn_with_state, routing::get, Json, Router};
use flightdesk_core::repository::ReservationStore;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod error;
pub mod middleware;
pub mod reservations;
pub mod search;
pub mod state;
pub mod users;

pub use state::{AppState, AuthConfig};

pub fn app<S: ReservationStore>(state: AppState<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let protected: Router<AppState<S>> = Router::new()
        .merge(auth::protected_routes::<S>())
        .merge(search::routes::<S>())
        .merge(reservations::routes::<S>())
        .route_layer(from_fn_with_state(
            state.auth.clone(),
            middleware::customer_auth_middleware,
        ));

    Router::<AppState<S>>::new()
        .route("/health", get(health))
        .merge(users::routes::<S>())
        .merge(auth::routes::<S>())
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

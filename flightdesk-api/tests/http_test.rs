use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use flightdesk_api::{app, AppState, AuthConfig};
use flightdesk_booking::{FlightService, RetryPolicy};
use flightdesk_core::{Flight, FlightId};
use flightdesk_store::{InMemorySessionStore, MemoryStore};
use serde_json::{json, Value};
use tower::ServiceExt;

// ============================================================================
// HELPERS
// ============================================================================

fn flight(fid: i32, origin: &str, dest: &str, duration: i32, price: i32) -> Flight {
    Flight {
        fid: FlightId(fid),
        day_of_month: 5,
        carrier_id: "AS".to_string(),
        flight_num: fid.to_string(),
        origin_city: origin.to_string(),
        dest_city: dest.to_string(),
        duration,
        capacity: 3,
        price,
    }
}

async fn test_app() -> Router {
    let store = MemoryStore::new();
    store.add_flight(flight(1, "Seattle WA", "Boston MA", 300, 80)).await;
    store.add_flight(flight(2, "Seattle WA", "Chicago IL", 120, 40)).await;
    store.add_flight(flight(3, "Chicago IL", "Boston MA", 130, 45)).await;

    let service = FlightService::new(Arc::new(store), RetryPolicy::no_retry());
    app(AppState {
        service: Arc::new(service),
        sessions: Arc::new(InMemorySessionStore::new(Duration::from_secs(60))),
        auth: AuthConfig {
            secret: "test_secret".to_string(),
            expiration: 300,
        },
    })
}

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn register_and_login(app: &Router, username: &str, balance: i64) -> String {
    let (status, _) = send(
        app,
        "POST",
        "/v1/users",
        None,
        Some(json!({ "username": username, "password": "pw", "initial_balance": balance })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        app,
        "POST",
        "/v1/sessions",
        None,
        Some(json!({ "username": username, "password": "pw" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

fn direct_search() -> Value {
    json!({
        "origin_city": "Seattle WA",
        "dest_city": "Boston MA",
        "direct_only": true,
        "day_of_month": 5,
        "limit": 1
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[tokio::test]
async fn test_health() {
    let app = test_app().await;
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_account_creation_and_login() {
    let app = test_app().await;
    register_and_login(&app, "ada", 100).await;

    let (status, _) = send(
        &app,
        "POST",
        "/v1/users",
        None,
        Some(json!({ "username": "ADA", "password": "x", "initial_balance": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        "POST",
        "/v1/users",
        None,
        Some(json!({ "username": "bob", "password": "x", "initial_balance": -1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/v1/sessions",
        None,
        Some(json!({ "username": "ada", "password": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Login failed");
}

#[tokio::test]
async fn test_protected_routes_need_a_token() {
    let app = test_app().await;

    let (status, _) = send(&app, "POST", "/v1/itineraries/search", None, Some(direct_search())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/v1/reservations", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_search_book_pay_cancel() {
    let app = test_app().await;
    let token = register_and_login(&app, "ada", 100).await;

    let (status, body) = send(&app, "POST", "/v1/itineraries/search", Some(&token), Some(direct_search())).await;
    assert_eq!(status, StatusCode::OK);
    let itineraries = body["itineraries"].as_array().unwrap();
    assert_eq!(itineraries.len(), 1);
    assert_eq!(itineraries[0]["flights"][0]["fid"], 1);

    let (status, _) = send(&app, "POST", "/v1/reservations", Some(&token), Some(json!({ "itinerary_id": 7 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, "POST", "/v1/reservations", Some(&token), Some(json!({ "itinerary_id": 0 }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["reservation_id"].as_i64().unwrap();
    assert_eq!(id, 1);

    let payment_uri = format!("/v1/reservations/{}/payment", id);
    let (status, body) = send(&app, "POST", &payment_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["remaining_balance"], 20);

    let (status, body) = send(&app, "POST", &payment_uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Cannot find unpaid reservation 1 under user: ada");

    let (status, body) = send(&app, "GET", "/v1/reservations", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], id);
    assert_eq!(body[0]["paid"], true);

    let (status, body) = send(&app, "DELETE", &format!("/v1/reservations/{}", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["refunded"], 80);

    let (status, body) = send(&app, "GET", "/v1/reservations", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_insufficient_funds_and_same_day_conflict() {
    let app = test_app().await;
    let token = register_and_login(&app, "grace", 10).await;

    let search = json!({
        "origin_city": "Seattle WA",
        "dest_city": "Boston MA",
        "day_of_month": 5,
        "limit": 5
    });
    let (status, body) = send(&app, "POST", "/v1/itineraries/search", Some(&token), Some(search)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["itineraries"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "POST", "/v1/reservations", Some(&token), Some(json!({ "itinerary_id": 0 }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["reservation_id"].as_i64().unwrap();

    let (status, _) = send(&app, "POST", "/v1/reservations", Some(&token), Some(json!({ "itinerary_id": 1 }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "POST", &format!("/v1/reservations/{}/payment", id), Some(&token), None).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "User has only 10 in account but itinerary costs 85");
}

#[tokio::test]
async fn test_logout_forgets_search_results() {
    let app = test_app().await;
    let token = register_and_login(&app, "ada", 100).await;

    send(&app, "POST", "/v1/itineraries/search", Some(&token), Some(direct_search())).await;
    let (status, _) = send(&app, "DELETE", "/v1/sessions/current", Some(&token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "POST", "/v1/reservations", Some(&token), Some(json!({ "itinerary_id": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use flightdesk_core::{EngineError, USERNAME_TAKEN};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    ValidationError(String),
    PaymentRequired(String),
    NotFoundError(String),
    ConflictError(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PaymentRequired(msg) => (StatusCode::PAYMENT_REQUIRED, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        let msg = err.to_string();
        match err {
            EngineError::NotAuthenticated | EngineError::LoginFailed => AppError::AuthenticationError(msg),
            EngineError::InvalidAccount(reason) if reason == USERNAME_TAKEN => AppError::ConflictError(msg),
            EngineError::InvalidAccount(_) | EngineError::InvalidReference(_) => AppError::ValidationError(msg),
            EngineError::AlreadyLoggedIn
            | EngineError::SameDayConflict { .. }
            | EngineError::CapacityExhausted { .. } => AppError::ConflictError(msg),
            EngineError::InsufficientFunds { .. } => AppError::PaymentRequired(msg),
            EngineError::NotFound { .. } | EngineError::UnpaidNotFound { .. } => AppError::NotFoundError(msg),
            // the detail stays in the server log
            EngineError::StoreFailure(source) => AppError::InternalServerError(source.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightdesk_core::{FlightId, ReservationId, StoreError};

    fn status_of(err: EngineError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_engine_errors_map_to_distinct_statuses() {
        assert_eq!(status_of(EngineError::NotAuthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(EngineError::InvalidAccount(USERNAME_TAKEN.to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(EngineError::InvalidAccount("negative balance".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(EngineError::CapacityExhausted { flight_id: FlightId(1) }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(EngineError::InsufficientFunds { balance: 1, cost: 2 }),
            StatusCode::PAYMENT_REQUIRED
        );
        assert_eq!(
            status_of(EngineError::NotFound {
                reservation_id: ReservationId(1),
                username: "ada".to_string()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(EngineError::UnpaidNotFound {
                reservation_id: ReservationId(1),
                username: "ada".to_string()
            }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(EngineError::from(StoreError::Database("boom".to_string()))),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}

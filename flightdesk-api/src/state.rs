use std::sync::Arc;

use flightdesk_booking::FlightService;
use flightdesk_core::{EngineError, Session, SessionStore};

use crate::error::AppError;
use crate::middleware::auth::CustomerClaims;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

pub struct AppState<S> {
    pub service: Arc<FlightService<S>>,
    pub sessions: Arc<dyn SessionStore>,
    pub auth: AuthConfig,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            sessions: self.sessions.clone(),
            auth: self.auth.clone(),
        }
    }
}

impl<S> AppState<S> {
    /// Rebuild the caller's session from its token and the stored itinerary table.
    /// An expired or missing table restores as empty.
    pub async fn session_for(&self, claims: &CustomerClaims) -> Result<Session, AppError> {
        let itineraries = self
            .sessions
            .load(claims.sid)
            .await
            .map_err(EngineError::from)?
            .unwrap_or_default();
        Ok(Session::restore(claims.sid, Some(claims.sub.clone()), itineraries))
    }
}

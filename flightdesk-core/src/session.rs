use async_trait::async_trait;
use uuid::Uuid;

use crate::itinerary::ItineraryTable;
use crate::{EngineError, EngineResult, StoreResult};

/// Per-client context. Holds at most one authenticated user and the
/// itinerary table of the latest search.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    username: Option<String>,
    itineraries: ItineraryTable,
}

impl Session {
    pub fn new() -> Self {
        Self::restore(Uuid::new_v4(), None, ItineraryTable::new())
    }

    pub fn restore(id: Uuid, username: Option<String>, itineraries: ItineraryTable) -> Self {
        Self {
            id,
            username,
            itineraries,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn require_user(&self) -> EngineResult<&str> {
        self.username().ok_or(EngineError::NotAuthenticated)
    }

    /// Bind a user to the session. A session never switches users.
    pub fn bind_user(&mut self, username: String) -> EngineResult<()> {
        if self.username.is_some() {
            return Err(EngineError::AlreadyLoggedIn);
        }
        self.username = Some(username);
        Ok(())
    }

    pub fn itineraries(&self) -> &ItineraryTable {
        &self.itineraries
    }

    pub fn itineraries_mut(&mut self) -> &mut ItineraryTable {
        &mut self.itineraries
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Keeps itinerary tables between requests of the same session.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, session_id: Uuid) -> StoreResult<Option<ItineraryTable>>;

    async fn save(&self, session_id: Uuid, table: &ItineraryTable) -> StoreResult<()>;

    async fn discard(&self, session_id: Uuid) -> StoreResult<()>;
}

use async_trait::async_trait;
use flightdesk_core::{ItineraryTable, SessionStore, StoreResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Process-local itinerary tables with an idle expiry.
#[derive(Clone)]
pub struct InMemorySessionStore {
    entries: Arc<RwLock<HashMap<Uuid, (ItineraryTable, Instant)>>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn load(&self, session_id: Uuid) -> StoreResult<Option<ItineraryTable>> {
        let mut entries = self.entries.write().await;
        match entries.get(&session_id) {
            Some((_, expires_at)) if *expires_at <= Instant::now() => {
                entries.remove(&session_id);
                Ok(None)
            }
            Some((table, _)) => Ok(Some(table.clone())),
            None => Ok(None),
        }
    }

    /// Expired tables of other sessions are evicted on every save.
    async fn save(&self, session_id: Uuid, table: &ItineraryTable) -> StoreResult<()> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        entries.insert(session_id, (table.clone(), now + self.ttl));
        Ok(())
    }

    async fn discard(&self, session_id: Uuid) -> StoreResult<()> {
        self.entries.write().await.remove(&session_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tables_are_isolated_per_session() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        store.save(a, &ItineraryTable::new()).await.unwrap();

        assert!(store.load(a).await.unwrap().is_some());
        assert!(store.load(b).await.unwrap().is_none());

        store.discard(a).await.unwrap();
        assert!(store.load(a).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_tables_are_dropped() {
        let store = InMemorySessionStore::new(Duration::ZERO);
        let id = Uuid::new_v4();

        store.save(id, &ItineraryTable::new()).await.unwrap();
        assert!(store.load(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_abandoned_sessions_do_not_accumulate() {
        let store = InMemorySessionStore::new(Duration::ZERO);

        for _ in 0..1000 {
            store.save(Uuid::new_v4(), &ItineraryTable::new()).await.unwrap();
        }

        // only the table written last is still held
        assert_eq!(store.entries.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_live_sessions_survive_eviction() {
        let store = InMemorySessionStore::new(Duration::from_secs(60));
        let kept = Uuid::new_v4();
        store.save(kept, &ItineraryTable::new()).await.unwrap();

        for _ in 0..10 {
            store.save(Uuid::new_v4(), &ItineraryTable::new()).await.unwrap();
        }

        assert!(store.load(kept).await.unwrap().is_some());
        assert_eq!(store.entries.read().await.len(), 11);
    }
}

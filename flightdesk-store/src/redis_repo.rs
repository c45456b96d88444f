use async_trait::async_trait;
use flightdesk_core::{ItineraryTable, SessionStore, StoreError, StoreResult};
use redis::AsyncCommands;
use tracing::{debug, info};
use uuid::Uuid;

/// Itinerary tables shared between API replicas, expiring after `ttl_seconds`.
#[derive(Clone)]
pub struct RedisSessionStore {
    client: redis::Client,
    ttl_seconds: u64,
}

impl RedisSessionStore {
    pub async fn new(connection_string: &str, ttl_seconds: u64) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        info!("Redis session store ready (ttl {}s)", ttl_seconds);
        Ok(Self { client, ttl_seconds })
    }

    fn key(session_id: Uuid) -> String {
        format!("session:{}:itineraries", session_id)
    }
}

fn map_redis_error(err: redis::RedisError) -> StoreError {
    StoreError::Database(format!("redis: {}", err))
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn load(&self, session_id: Uuid) -> StoreResult<Option<ItineraryTable>> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_error)?;
        let raw: Option<String> = conn.get(Self::key(session_id)).await.map_err(map_redis_error)?;

        raw.map(|json| {
            serde_json::from_str(&json)
                .map_err(|e| StoreError::Invariant(format!("corrupt itinerary table: {}", e)))
        })
        .transpose()
    }

    async fn save(&self, session_id: Uuid, table: &ItineraryTable) -> StoreResult<()> {
        let json = serde_json::to_string(table)
            .map_err(|e| StoreError::Invariant(format!("unencodable itinerary table: {}", e)))?;
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_error)?;
        conn.set_ex::<_, _, ()>(Self::key(session_id), json, self.ttl_seconds)
            .await
            .map_err(map_redis_error)?;
        debug!("Stored {} itineraries for session {}", table.len(), session_id);
        Ok(())
    }

    async fn discard(&self, session_id: Uuid) -> StoreResult<()> {
        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(map_redis_error)?;
        let _: () = conn.del(Self::key(session_id)).await.map_err(map_redis_error)?;
        Ok(())
    }
}

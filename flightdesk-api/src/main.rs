use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use flightdesk_api::{app, AppState, AuthConfig};
use flightdesk_booking::{FlightService, RetryPolicy};
use flightdesk_core::repository::ReservationStore;
use flightdesk_core::SessionStore;
use flightdesk_store::app_config::{Config, SessionBackend};
use flightdesk_store::{DbClient, InMemorySessionStore, MemoryStore, PgStore, RedisSessionStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "flightdesk_api=debug,flightdesk_booking=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting FlightDesk API on port {}", config.server.port);

    let sessions: Arc<dyn SessionStore> = match config.session.backend {
        SessionBackend::Memory => Arc::new(InMemorySessionStore::new(Duration::from_secs(
            config.session.ttl_seconds,
        ))),
        SessionBackend::Redis => {
            let redis = config
                .redis
                .as_ref()
                .context("session backend is redis but [redis] is not configured")?;
            Arc::new(
                RedisSessionStore::new(&redis.url, config.session.ttl_seconds)
                    .await
                    .context("Failed to connect to Redis")?,
            )
        }
    };

    let policy = RetryPolicy::builder()
        .max_retries(config.engine.max_retries as usize)
        .initial_delay(Duration::from_millis(config.engine.initial_backoff_ms))
        .max_delay(Duration::from_millis(config.engine.max_backoff_ms))
        .build();

    let auth = AuthConfig {
        secret: config.auth.jwt_secret.clone(),
        expiration: config.auth.jwt_expiration_seconds,
    };

    if config.database.is_memory() {
        tracing::warn!("Using the in-memory store; nothing survives a restart");
        serve(&config, MemoryStore::new(), policy, sessions, auth).await
    } else {
        let db = DbClient::new(&config.database)
            .await
            .context("Failed to connect to Postgres")?;
        db.migrate().await.context("Failed to run migrations")?;
        serve(&config, PgStore::from(db), policy, sessions, auth).await
    }
}

async fn serve<S: ReservationStore>(
    config: &Config,
    store: S,
    policy: RetryPolicy,
    sessions: Arc<dyn SessionStore>,
    auth: AuthConfig,
) -> anyhow::Result<()> {
    let service = FlightService::new(Arc::new(store), policy)
        .with_max_itineraries(config.search.max_itineraries);

    let state = AppState {
        service: Arc::new(service),
        sessions,
        auth,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app(state)).await.context("Server error")?;
    Ok(())
}

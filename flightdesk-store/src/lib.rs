pub mod app_config;
pub mod database;
mod flight_repo;
pub mod memory;
pub mod redis_repo;
pub mod reservation_repo;
pub mod session_cache;
mod user_repo;

pub use database::{DbClient, PgStore};
pub use memory::MemoryStore;
pub use redis_repo::RedisSessionStore;
pub use reservation_repo::PgTransaction;
pub use session_cache::InMemorySessionStore;

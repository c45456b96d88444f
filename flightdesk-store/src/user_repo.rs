use async_trait::async_trait;
use flightdesk_core::account::UserRecord;
use flightdesk_core::repository::UserDirectory;
use flightdesk_core::StoreResult;

use crate::database::{map_sqlx_error, PgStore};

#[derive(sqlx::FromRow)]
struct UserRow {
    username: String,
    password_salt: String,
    password_hash: String,
    balance: i64,
}

#[async_trait]
impl UserDirectory for PgStore {
    async fn create_user(&self, user: &UserRecord) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO users (username, password_salt, password_hash, balance) VALUES ($1, $2, $3, $4)",
        )
        .bind(&user.username)
        .bind(&user.password_salt)
        .bind(&user.password_hash)
        .bind(user.balance)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_user(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT username, password_salt, password_hash, balance FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|row| UserRecord {
            username: row.username,
            password_salt: row.password_salt,
            password_hash: row.password_hash,
            balance: row.balance,
        }))
    }
}

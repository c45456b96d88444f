use async_trait::async_trait;
use flightdesk_core::repository::StoreTransaction;
use flightdesk_core::{Flight, FlightId, Reservation, ReservationId, StoreError, StoreResult};
use sqlx::{Postgres, Transaction};

use crate::database::map_sqlx_error;
use crate::flight_repo::{FlightRow, FLIGHT_COLUMNS};

#[derive(sqlx::FromRow)]
struct ReservationRow {
    rid: i64,
    username: String,
    fid1: i32,
    fid2: Option<i32>,
    day_of_month: i32,
    paid: bool,
}

impl From<ReservationRow> for Reservation {
    fn from(row: ReservationRow) -> Self {
        Self {
            id: ReservationId(row.rid),
            username: row.username,
            first_flight: FlightId(row.fid1),
            second_flight: row.fid2.map(FlightId),
            day_of_month: row.day_of_month,
            paid: row.paid,
        }
    }
}

const RESERVATION_COLUMNS: &str = "rid, username, fid1, fid2, day_of_month, paid";

/// An open serializable transaction on one pooled connection.
pub struct PgTransaction {
    tx: Transaction<'static, Postgres>,
}

impl PgTransaction {
    pub(crate) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl StoreTransaction for PgTransaction {
    async fn flight(&mut self, fid: FlightId) -> StoreResult<Option<Flight>> {
        let sql = format!("SELECT {FLIGHT_COLUMNS} FROM flights WHERE fid = $1");
        let row: Option<FlightRow> = sqlx::query_as(&sql)
            .bind(fid.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Flight::from))
    }

    async fn booked_seats(&mut self, fid: FlightId) -> StoreResult<Option<i32>> {
        sqlx::query_scalar::<_, i32>("SELECT booked FROM capacity_ledger WHERE fid = $1")
            .bind(fid.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn insert_booked_seats(&mut self, fid: FlightId, count: i32) -> StoreResult<()> {
        sqlx::query("INSERT INTO capacity_ledger (fid, booked) VALUES ($1, $2)")
            .bind(fid.0)
            .bind(count)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn update_booked_seats(&mut self, fid: FlightId, count: i32) -> StoreResult<()> {
        let result = sqlx::query("UPDATE capacity_ledger SET booked = $2 WHERE fid = $1")
            .bind(fid.0)
            .bind(count)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Invariant(format!("no ledger row for flight {}", fid)));
        }
        Ok(())
    }

    async fn next_reservation_id(&mut self) -> StoreResult<ReservationId> {
        let next: Option<i64> = sqlx::query_scalar(
            "UPDATE reservation_id_counter SET next_value = next_value + 1 RETURNING next_value - 1",
        )
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;

        next.map(ReservationId)
            .ok_or_else(|| StoreError::Invariant("reservation_id_counter is not seeded".to_string()))
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO reservations (rid, username, fid1, fid2, day_of_month, paid)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(reservation.id.0)
        .bind(&reservation.username)
        .bind(reservation.first_flight.0)
        .bind(reservation.second_flight.map(|fid| fid.0))
        .bind(reservation.day_of_month)
        .bind(reservation.paid)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn find_reservation(
        &mut self,
        username: &str,
        id: ReservationId,
    ) -> StoreResult<Option<Reservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE username = $1 AND rid = $2"
        );
        let row: Option<ReservationRow> = sqlx::query_as(&sql)
            .bind(username)
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Reservation::from))
    }

    async fn find_unpaid_reservation(
        &mut self,
        username: &str,
        id: ReservationId,
    ) -> StoreResult<Option<Reservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE username = $1 AND rid = $2 AND NOT paid"
        );
        let row: Option<ReservationRow> = sqlx::query_as(&sql)
            .bind(username)
            .bind(id.0)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Reservation::from))
    }

    async fn reservations_for(&mut self, username: &str) -> StoreResult<Vec<Reservation>> {
        let sql = format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE username = $1 ORDER BY rid"
        );
        let rows: Vec<ReservationRow> = sqlx::query_as(&sql)
            .bind(username)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Reservation::from).collect())
    }

    async fn mark_paid(&mut self, id: ReservationId) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE reservations SET paid = TRUE WHERE rid = $1 AND NOT paid")
            .bind(id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn delete_reservation(&mut self, username: &str, id: ReservationId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM reservations WHERE username = $1 AND rid = $2")
            .bind(username)
            .bind(id.0)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn balance(&mut self, username: &str) -> StoreResult<Option<i64>> {
        sqlx::query_scalar::<_, i64>("SELECT balance FROM users WHERE username = $1")
            .bind(username)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)
    }

    async fn set_balance(&mut self, username: &str, amount: i64) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET balance = $2 WHERE username = $1")
            .bind(username)
            .bind(amount)
            .execute(&mut *self.tx)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Invariant(format!("no such user {}", username)));
        }
        Ok(())
    }

    async fn commit(self) -> StoreResult<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self) -> StoreResult<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}

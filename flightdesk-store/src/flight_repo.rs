use async_trait::async_trait;
use flightdesk_core::repository::FlightCatalog;
use flightdesk_core::{Flight, FlightId, Itinerary, SearchQuery, StoreResult};
use tracing::debug;

use crate::database::{map_sqlx_error, PgStore};

pub(crate) const FLIGHT_COLUMNS: &str = "fid, day_of_month, carrier_id, flight_num, origin_city, \
     dest_city, COALESCE(actual_time, 0) AS duration, capacity, price";

#[derive(sqlx::FromRow)]
pub(crate) struct FlightRow {
    fid: i32,
    day_of_month: i32,
    carrier_id: String,
    flight_num: String,
    origin_city: String,
    dest_city: String,
    duration: i32,
    capacity: i32,
    price: i32,
}

impl From<FlightRow> for Flight {
    fn from(row: FlightRow) -> Self {
        Self {
            fid: FlightId(row.fid),
            day_of_month: row.day_of_month,
            carrier_id: row.carrier_id,
            flight_num: row.flight_num,
            origin_city: row.origin_city,
            dest_city: row.dest_city,
            duration: row.duration,
            capacity: row.capacity,
            price: row.price,
        }
    }
}

/// Both legs of a one-stop pair, flattened by the self-join.
#[derive(sqlx::FromRow)]
struct ConnectionRow {
    f_fid: i32,
    f_day_of_month: i32,
    f_carrier_id: String,
    f_flight_num: String,
    f_origin_city: String,
    f_dest_city: String,
    f_duration: i32,
    f_capacity: i32,
    f_price: i32,
    s_fid: i32,
    s_day_of_month: i32,
    s_carrier_id: String,
    s_flight_num: String,
    s_origin_city: String,
    s_dest_city: String,
    s_duration: i32,
    s_capacity: i32,
    s_price: i32,
}

impl From<ConnectionRow> for Itinerary {
    fn from(row: ConnectionRow) -> Self {
        let first = Flight {
            fid: FlightId(row.f_fid),
            day_of_month: row.f_day_of_month,
            carrier_id: row.f_carrier_id,
            flight_num: row.f_flight_num,
            origin_city: row.f_origin_city,
            dest_city: row.f_dest_city,
            duration: row.f_duration,
            capacity: row.f_capacity,
            price: row.f_price,
        };
        let second = Flight {
            fid: FlightId(row.s_fid),
            day_of_month: row.s_day_of_month,
            carrier_id: row.s_carrier_id,
            flight_num: row.s_flight_num,
            origin_city: row.s_origin_city,
            dest_city: row.s_dest_city,
            duration: row.s_duration,
            capacity: row.s_capacity,
            price: row.s_price,
        };
        Itinerary::connecting(first, second)
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl FlightCatalog for PgStore {
    async fn direct_itineraries(&self, query: &SearchQuery) -> StoreResult<Vec<Itinerary>> {
        let rows: Vec<FlightRow> = sqlx::query_as(
            r#"
            SELECT fid, day_of_month, carrier_id, flight_num, origin_city, dest_city,
                   actual_time AS duration, capacity, price
            FROM flights
            WHERE origin_city = $1
              AND dest_city = $2
              AND day_of_month = $3
              AND actual_time IS NOT NULL
            ORDER BY actual_time ASC, fid ASC
            LIMIT $4
            "#,
        )
        .bind(&query.origin_city)
        .bind(&query.dest_city)
        .bind(query.day_of_month)
        .bind(sql_limit(query.limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        debug!("Found {} direct flights from {} to {}", rows.len(), query.origin_city, query.dest_city);
        Ok(rows.into_iter().map(|row| Itinerary::direct(row.into())).collect())
    }

    async fn connecting_itineraries(&self, query: &SearchQuery) -> StoreResult<Vec<Itinerary>> {
        let rows: Vec<ConnectionRow> = sqlx::query_as(
            r#"
            SELECT
                f.fid AS f_fid, f.day_of_month AS f_day_of_month, f.carrier_id AS f_carrier_id,
                f.flight_num AS f_flight_num, f.origin_city AS f_origin_city, f.dest_city AS f_dest_city,
                f.actual_time AS f_duration, f.capacity AS f_capacity, f.price AS f_price,
                s.fid AS s_fid, s.day_of_month AS s_day_of_month, s.carrier_id AS s_carrier_id,
                s.flight_num AS s_flight_num, s.origin_city AS s_origin_city, s.dest_city AS s_dest_city,
                s.actual_time AS s_duration, s.capacity AS s_capacity, s.price AS s_price
            FROM flights f
            JOIN flights s
              ON s.origin_city = f.dest_city
             AND s.day_of_month = f.day_of_month
            WHERE f.origin_city = $1
              AND s.dest_city = $2
              AND f.day_of_month = $3
              AND f.actual_time IS NOT NULL
              AND s.actual_time IS NOT NULL
            ORDER BY f.actual_time + s.actual_time ASC, f.fid ASC, s.fid ASC
            LIMIT $4
            "#,
        )
        .bind(&query.origin_city)
        .bind(&query.dest_city)
        .bind(query.day_of_month)
        .bind(sql_limit(query.limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        debug!("Found {} one-stop pairs from {} to {}", rows.len(), query.origin_city, query.dest_city);
        Ok(rows.into_iter().map(Itinerary::from).collect())
    }
}

use async_trait::async_trait;

use crate::account::UserRecord;
use crate::reservation::{Reservation, ReservationId};
use crate::search::{Flight, FlightId, Itinerary, SearchQuery};
use crate::StoreResult;

/// Entry point for every operation that touches mutable booking state.
#[async_trait]
pub trait TransactionalStore: Send + Sync + 'static {
    type Tx: StoreTransaction;

    /// Open a transaction at serializable isolation.
    async fn begin(&self) -> StoreResult<Self::Tx>;
}

/// A unit of work. Nothing written through it is visible to other
/// transactions until `commit` succeeds; dropping it rolls back.
#[async_trait]
pub trait StoreTransaction: Send + Sized {
    async fn flight(&mut self, fid: FlightId) -> StoreResult<Option<Flight>>;

    /// Seats sold on a flight, `None` when no row has been created yet.
    async fn booked_seats(&mut self, fid: FlightId) -> StoreResult<Option<i32>>;

    async fn insert_booked_seats(&mut self, fid: FlightId, count: i32) -> StoreResult<()>;

    async fn update_booked_seats(&mut self, fid: FlightId, count: i32) -> StoreResult<()>;

    /// Allocate the next reservation id. The allocation rolls back with the
    /// transaction that made it.
    async fn next_reservation_id(&mut self) -> StoreResult<ReservationId>;

    async fn insert_reservation(&mut self, reservation: &Reservation) -> StoreResult<()>;

    async fn find_reservation(
        &mut self,
        username: &str,
        id: ReservationId,
    ) -> StoreResult<Option<Reservation>>;

    async fn find_unpaid_reservation(
        &mut self,
        username: &str,
        id: ReservationId,
    ) -> StoreResult<Option<Reservation>>;

    /// All reservations of a user ordered by id.
    async fn reservations_for(&mut self, username: &str) -> StoreResult<Vec<Reservation>>;

    async fn mark_paid(&mut self, id: ReservationId) -> StoreResult<bool>;

    async fn delete_reservation(&mut self, username: &str, id: ReservationId) -> StoreResult<bool>;

    async fn balance(&mut self, username: &str) -> StoreResult<Option<i64>>;

    async fn set_balance(&mut self, username: &str, amount: i64) -> StoreResult<()>;

    async fn commit(self) -> StoreResult<()>;

    async fn rollback(self) -> StoreResult<()>;
}

/// Read-only flight search. Results are point-in-time snapshots.
#[async_trait]
pub trait FlightCatalog: Send + Sync {
    /// Direct flights for the query, shortest first, at most `limit`.
    async fn direct_itineraries(&self, query: &SearchQuery) -> StoreResult<Vec<Itinerary>>;

    /// Same-day one-stop pairs for the query, shortest first, at most `limit`.
    async fn connecting_itineraries(&self, query: &SearchQuery) -> StoreResult<Vec<Itinerary>>;
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn create_user(&self, user: &UserRecord) -> StoreResult<()>;

    async fn find_user(&self, username: &str) -> StoreResult<Option<UserRecord>>;
}

/// Everything the booking engines need from a backend.
pub trait ReservationStore: TransactionalStore + FlightCatalog + UserDirectory {}

impl<T> ReservationStore for T where T: TransactionalStore + FlightCatalog + UserDirectory {}

use flightdesk_core::repository::StoreTransaction;
use flightdesk_core::{EngineResult, ReservationId};
use tracing::debug;

/// Hands out reservation ids from the store's counter.
///
/// The counter is read and advanced inside the caller's transaction, so two
/// concurrent bookings serialize on it and a rolled-back booking gives its
/// id back. Cancelled reservations never return their id to the pool.
pub struct ReservationIdAllocator;

impl ReservationIdAllocator {
    pub async fn allocate<T: StoreTransaction>(tx: &mut T) -> EngineResult<ReservationId> {
        let id = tx.next_reservation_id().await?;
        debug!(reservation_id = %id, "Allocated reservation id");
        Ok(id)
    }
}

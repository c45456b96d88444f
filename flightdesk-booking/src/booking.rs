use flightdesk_core::repository::{StoreTransaction, TransactionalStore};
use flightdesk_core::{
    EngineError, EngineResult, ItineraryRef, Reservation, ReservationId, SAME_DAY_CONSTRAINT,
};
use tracing::{info, warn};

use crate::allocator::ReservationIdAllocator;
use crate::coordinator::TransactionCoordinator;
use crate::ledger::CapacityLedger;
use crate::retry::{retry_with_predicate, RetryPolicy};

/// Turns an itinerary reference into an unpaid reservation.
pub struct BookingEngine<S> {
    coordinator: TransactionCoordinator<S>,
    policy: RetryPolicy,
}

impl<S> Clone for BookingEngine<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<S: TransactionalStore> BookingEngine<S> {
    pub fn new(coordinator: TransactionCoordinator<S>, policy: RetryPolicy) -> Self {
        Self { coordinator, policy }
    }

    /// Reserve a seat on every flight of the itinerary and record the
    /// reservation, all in one transaction. Nothing persists on failure.
    pub async fn book(&self, username: &str, itinerary: &ItineraryRef) -> EngineResult<ReservationId> {
        let result = retry_with_predicate(
            &self.policy,
            move || self.book_once(username, itinerary),
            EngineError::is_transient,
        )
        .await;

        match &result {
            Ok(id) => info!(
                username,
                reservation_id = %id,
                first_flight = %itinerary.first_flight,
                second_flight = ?itinerary.second_flight.map(|f| f.0),
                "Booked itinerary"
            ),
            Err(e) => warn!(username, itinerary = itinerary.ordinal, error = %e, "Booking failed"),
        }
        result
    }

    async fn book_once(&self, username: &str, itinerary: &ItineraryRef) -> EngineResult<ReservationId> {
        let mut scope = self.coordinator.begin().await?;
        let outcome = book_within(scope.tx()?, username, itinerary).await;
        scope.finish(outcome).await
    }
}

async fn book_within<T: StoreTransaction>(
    tx: &mut T,
    username: &str,
    itinerary: &ItineraryRef,
) -> EngineResult<ReservationId> {
    let id = ReservationIdAllocator::allocate(tx).await?;

    for fid in itinerary.flight_ids() {
        CapacityLedger::reserve_seat(tx, fid).await?;
    }

    let reservation = Reservation {
        id,
        username: username.to_string(),
        first_flight: itinerary.first_flight,
        second_flight: itinerary.second_flight,
        day_of_month: itinerary.day_of_month,
        paid: false,
    };

    tx.insert_reservation(&reservation).await.map_err(|e| {
        if e.violates(SAME_DAY_CONSTRAINT) {
            EngineError::SameDayConflict {
                day: itinerary.day_of_month,
            }
        } else {
            EngineError::from(e)
        }
    })?;

    Ok(id)
}

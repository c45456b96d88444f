use flightdesk_core::repository::{StoreTransaction, TransactionalStore};
use flightdesk_core::{Cancellation, EngineError, EngineResult, ReservationId};
use tracing::{info, warn};

use crate::coordinator::TransactionCoordinator;
use crate::ledger::CapacityLedger;
use crate::retry::{retry_with_predicate, RetryPolicy};
use crate::settlement;

/// Retires a reservation and hands its seats back. Paid reservations are
/// refunded through the settlement module in the same transaction.
pub struct CancellationEngine<S> {
    coordinator: TransactionCoordinator<S>,
    policy: RetryPolicy,
}

impl<S> Clone for CancellationEngine<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            policy: self.policy.clone(),
        }
    }
}

impl<S: TransactionalStore> CancellationEngine<S> {
    pub fn new(coordinator: TransactionCoordinator<S>, policy: RetryPolicy) -> Self {
        Self { coordinator, policy }
    }

    pub async fn cancel(&self, username: &str, reservation_id: ReservationId) -> EngineResult<Cancellation> {
        let result = retry_with_predicate(
            &self.policy,
            move || self.cancel_once(username, reservation_id),
            EngineError::is_transient,
        )
        .await;

        match &result {
            Ok(c) => info!(
                username,
                reservation_id = %reservation_id,
                refunded = ?c.refunded,
                "Cancelled reservation"
            ),
            Err(e) => warn!(username, reservation_id = %reservation_id, error = %e, "Cancellation failed"),
        }
        result
    }

    async fn cancel_once(&self, username: &str, reservation_id: ReservationId) -> EngineResult<Cancellation> {
        let mut scope = self.coordinator.begin().await?;
        let outcome = cancel_within(scope.tx()?, username, reservation_id).await;
        scope.finish(outcome).await
    }
}

async fn cancel_within<T: StoreTransaction>(
    tx: &mut T,
    username: &str,
    reservation_id: ReservationId,
) -> EngineResult<Cancellation> {
    let not_found = || EngineError::NotFound {
        reservation_id,
        username: username.to_string(),
    };

    let reservation = tx
        .find_reservation(username, reservation_id)
        .await?
        .ok_or_else(not_found)?;

    if !tx.delete_reservation(username, reservation_id).await? {
        return Err(not_found());
    }
    for fid in reservation.flight_ids() {
        CapacityLedger::release_seat(tx, fid).await?;
    }

    let refunded = if reservation.paid {
        Some(settlement::refund_within(tx, &reservation).await?)
    } else {
        None
    };

    Ok(Cancellation {
        reservation_id,
        refunded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::BookingEngine;
    use crate::settlement::SettlementEngine;
    use flightdesk_core::account::UserRecord;
    use flightdesk_core::repository::UserDirectory;
    use flightdesk_core::{Flight, FlightId, ItineraryRef};
    use flightdesk_store::MemoryStore;
    use std::sync::Arc;

    struct Engines {
        store: Arc<MemoryStore>,
        booking: BookingEngine<MemoryStore>,
        settlement: SettlementEngine<MemoryStore>,
        cancellation: CancellationEngine<MemoryStore>,
    }

    async fn setup() -> Engines {
        let store = MemoryStore::new();
        for (fid, day) in [(1, 5), (2, 5), (3, 6)] {
            store
                .add_flight(Flight {
                    fid: FlightId(fid),
                    day_of_month: day,
                    carrier_id: "AS".to_string(),
                    flight_num: fid.to_string(),
                    origin_city: "Seattle WA".to_string(),
                    dest_city: "Boston MA".to_string(),
                    duration: 100,
                    capacity: 2,
                    price: 30,
                })
                .await;
        }
        store
            .create_user(&UserRecord {
                username: "ada".to_string(),
                password_salt: String::new(),
                password_hash: String::new(),
                balance: 100,
            })
            .await
            .unwrap();

        let store = Arc::new(store);
        let coordinator = TransactionCoordinator::new(store.clone());
        let policy = RetryPolicy::no_retry();
        Engines {
            store,
            booking: BookingEngine::new(coordinator.clone(), policy.clone()),
            settlement: SettlementEngine::new(coordinator.clone(), policy.clone()),
            cancellation: CancellationEngine::new(coordinator, policy),
        }
    }

    fn connecting(day: i32, first: i32, second: i32) -> ItineraryRef {
        ItineraryRef {
            ordinal: 0,
            total_duration: 200,
            day_of_month: day,
            first_flight: FlightId(first),
            second_flight: Some(FlightId(second)),
        }
    }

    #[tokio::test]
    async fn test_cancel_releases_every_leg() {
        let e = setup().await;
        let id = e.booking.book("ada", &connecting(5, 1, 2)).await.unwrap();

        let cancellation = e.cancellation.cancel("ada", id).await.unwrap();

        assert_eq!(cancellation.refunded, None);
        assert_eq!(e.store.booked_seats(FlightId(1)).await, Some(0));
        assert_eq!(e.store.booked_seats(FlightId(2)).await, Some(0));
        assert!(e.store.reservations().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_id_is_never_reissued() {
        let e = setup().await;
        let first = e
            .booking
            .book("ada", &ItineraryRef::direct(0, 5, 100, FlightId(1)))
            .await
            .unwrap();
        e.cancellation.cancel("ada", first).await.unwrap();

        let second = e
            .booking
            .book("ada", &ItineraryRef::direct(0, 5, 100, FlightId(1)))
            .await
            .unwrap();

        assert!(second > first);
    }

    #[tokio::test]
    async fn test_cancel_then_pay_or_cancel_is_not_found() {
        let e = setup().await;
        let id = e
            .booking
            .book("ada", &ItineraryRef::direct(0, 5, 100, FlightId(1)))
            .await
            .unwrap();
        e.cancellation.cancel("ada", id).await.unwrap();

        assert!(matches!(
            e.settlement.pay("ada", id).await,
            Err(EngineError::UnpaidNotFound { .. })
        ));
        assert!(matches!(
            e.cancellation.cancel("ada", id).await,
            Err(EngineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_paid_reservation_is_refunded() {
        let e = setup().await;
        let id = e
            .booking
            .book("ada", &ItineraryRef::direct(0, 6, 100, FlightId(3)))
            .await
            .unwrap();
        e.settlement.pay("ada", id).await.unwrap();
        assert_eq!(e.store.balance_of("ada").await, Some(70));

        let cancellation = e.cancellation.cancel("ada", id).await.unwrap();

        assert_eq!(cancellation.refunded, Some(30));
        assert_eq!(e.store.balance_of("ada").await, Some(100));
        assert_eq!(e.store.booked_seats(FlightId(3)).await, Some(0));
    }
}

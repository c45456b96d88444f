use flightdesk_core::repository::StoreTransaction;
use flightdesk_core::{EngineError, EngineResult, FlightId, Reference, StoreError};
use tracing::debug;

/// Per-flight booked-seat counts. Every operation runs inside the caller's
/// transaction; the store's isolation makes check-then-increment atomic.
pub struct CapacityLedger;

impl CapacityLedger {
    /// Total seats on the flight.
    pub async fn current_capacity<T: StoreTransaction>(tx: &mut T, fid: FlightId) -> EngineResult<i32> {
        let flight = tx
            .flight(fid)
            .await?
            .ok_or(EngineError::InvalidReference(Reference::Flight(fid)))?;
        Ok(flight.capacity)
    }

    /// Seats sold so far. A flight that was never booked has sold none.
    pub async fn current_count<T: StoreTransaction>(tx: &mut T, fid: FlightId) -> EngineResult<i32> {
        Ok(tx.booked_seats(fid).await?.unwrap_or(0))
    }

    /// Take one seat, creating the ledger row on the first booking.
    /// Returns the new count.
    pub async fn reserve_seat<T: StoreTransaction>(tx: &mut T, fid: FlightId) -> EngineResult<i32> {
        let capacity = Self::current_capacity(tx, fid).await?;

        let booked = match tx.booked_seats(fid).await? {
            None if capacity > 0 => {
                tx.insert_booked_seats(fid, 1).await?;
                1
            }
            Some(count) if count < capacity => {
                tx.update_booked_seats(fid, count + 1).await?;
                count + 1
            }
            _ => return Err(EngineError::CapacityExhausted { flight_id: fid }),
        };

        debug!(flight_id = %fid, booked, capacity, "Reserved seat");
        Ok(booked)
    }

    /// Give back one seat held by a reservation being removed.
    pub async fn release_seat<T: StoreTransaction>(tx: &mut T, fid: FlightId) -> EngineResult<i32> {
        match tx.booked_seats(fid).await? {
            Some(count) if count > 0 => {
                tx.update_booked_seats(fid, count - 1).await?;
                debug!(flight_id = %fid, booked = count - 1, "Released seat");
                Ok(count - 1)
            }
            _ => Err(StoreError::Invariant(format!("no booked seat to release on flight {}", fid)).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flightdesk_core::repository::TransactionalStore;
    use flightdesk_core::Flight;
    use flightdesk_store::MemoryStore;

    async fn store_with_flight(capacity: i32) -> MemoryStore {
        let store = MemoryStore::new();
        store
            .add_flight(Flight {
                fid: FlightId(100),
                day_of_month: 5,
                carrier_id: "AS".to_string(),
                flight_num: "100".to_string(),
                origin_city: "Seattle WA".to_string(),
                dest_city: "Boston MA".to_string(),
                duration: 300,
                capacity,
                price: 80,
            })
            .await;
        store
    }

    #[tokio::test]
    async fn test_first_booking_creates_row() {
        let store = store_with_flight(2).await;
        let mut tx = store.begin().await.unwrap();

        assert_eq!(CapacityLedger::current_count(&mut tx, FlightId(100)).await.unwrap(), 0);
        assert_eq!(CapacityLedger::reserve_seat(&mut tx, FlightId(100)).await.unwrap(), 1);
        assert_eq!(CapacityLedger::reserve_seat(&mut tx, FlightId(100)).await.unwrap(), 2);
        assert_eq!(CapacityLedger::current_capacity(&mut tx, FlightId(100)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_full_flight_rejects_booking() {
        let store = store_with_flight(1).await;
        let mut tx = store.begin().await.unwrap();

        CapacityLedger::reserve_seat(&mut tx, FlightId(100)).await.unwrap();
        let err = CapacityLedger::reserve_seat(&mut tx, FlightId(100)).await.unwrap_err();

        assert!(matches!(err, EngineError::CapacityExhausted { flight_id } if flight_id == FlightId(100)));
        assert_eq!(CapacityLedger::current_count(&mut tx, FlightId(100)).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_zero_capacity_flight_is_never_bookable() {
        let store = store_with_flight(0).await;
        let mut tx = store.begin().await.unwrap();

        let err = CapacityLedger::reserve_seat(&mut tx, FlightId(100)).await.unwrap_err();
        assert!(matches!(err, EngineError::CapacityExhausted { .. }));
        assert_eq!(tx.booked_seats(FlightId(100)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_unknown_flight_is_an_invalid_reference() {
        let store = store_with_flight(1).await;
        let mut tx = store.begin().await.unwrap();

        let err = CapacityLedger::reserve_seat(&mut tx, FlightId(999)).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidReference(Reference::Flight(FlightId(999)))));
    }

    #[tokio::test]
    async fn test_release_decrements_but_never_below_zero() {
        let store = store_with_flight(3).await;
        let mut tx = store.begin().await.unwrap();

        CapacityLedger::reserve_seat(&mut tx, FlightId(100)).await.unwrap();
        assert_eq!(CapacityLedger::release_seat(&mut tx, FlightId(100)).await.unwrap(), 0);
        assert!(CapacityLedger::release_seat(&mut tx, FlightId(100)).await.is_err());
    }
}

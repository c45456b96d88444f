use async_trait::async_trait;
use flightdesk_core::account::UserRecord;
use flightdesk_core::repository::{FlightCatalog, StoreTransaction, TransactionalStore, UserDirectory};
use flightdesk_core::{
    Flight, FlightId, Itinerary, Reservation, ReservationId, SearchQuery, StoreError, StoreResult,
    SAME_DAY_CONSTRAINT, USERNAME_CONSTRAINT,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
struct MemoryState {
    flights: BTreeMap<FlightId, Flight>,
    users: HashMap<String, UserRecord>,
    ledger: HashMap<FlightId, i32>,
    reservations: BTreeMap<ReservationId, Reservation>,
    next_reservation_id: i64,
}

impl MemoryState {
    fn new() -> Self {
        Self {
            flights: BTreeMap::new(),
            users: HashMap::new(),
            ledger: HashMap::new(),
            reservations: BTreeMap::new(),
            next_reservation_id: 1,
        }
    }
}

/// In-process store with the same contract as Postgres at SERIALIZABLE.
///
/// A transaction holds the state lock from `begin` until it is committed or
/// dropped, so transactions execute one after another. Writes go to a
/// private copy that only replaces the shared state on commit.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    pending_conflicts: Arc<AtomicUsize>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::new())),
            pending_conflicts: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn add_flight(&self, flight: Flight) {
        self.state.lock().await.flights.insert(flight.fid, flight);
    }

    /// Make the next `count` commits fail as serialization conflicts.
    pub fn inject_conflicts(&self, count: usize) {
        self.pending_conflicts.fetch_add(count, Ordering::SeqCst);
    }

    pub async fn booked_seats(&self, fid: FlightId) -> Option<i32> {
        self.state.lock().await.ledger.get(&fid).copied()
    }

    pub async fn balance_of(&self, username: &str) -> Option<i64> {
        self.state.lock().await.users.get(username).map(|u| u.balance)
    }

    pub async fn reservations(&self) -> Vec<Reservation> {
        self.state.lock().await.reservations.values().cloned().collect()
    }

    pub async fn clear_tables(&self) {
        let mut state = self.state.lock().await;
        state.users.clear();
        state.ledger.clear();
        state.reservations.clear();
        state.next_reservation_id = 1;
    }
}

#[async_trait]
impl TransactionalStore for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> StoreResult<MemoryTransaction> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(MemoryTransaction {
            guard,
            working,
            pending_conflicts: self.pending_conflicts.clone(),
        })
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<MemoryState>,
    working: MemoryState,
    pending_conflicts: Arc<AtomicUsize>,
}

impl MemoryTransaction {
    fn take_injected_conflict(&self) -> bool {
        self.pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn flight(&mut self, fid: FlightId) -> StoreResult<Option<Flight>> {
        Ok(self.working.flights.get(&fid).cloned())
    }

    async fn booked_seats(&mut self, fid: FlightId) -> StoreResult<Option<i32>> {
        Ok(self.working.ledger.get(&fid).copied())
    }

    async fn insert_booked_seats(&mut self, fid: FlightId, count: i32) -> StoreResult<()> {
        if self.working.ledger.contains_key(&fid) {
            return Err(StoreError::UniqueViolation {
                constraint: "capacity_ledger_pkey".to_string(),
            });
        }
        self.working.ledger.insert(fid, count);
        Ok(())
    }

    async fn update_booked_seats(&mut self, fid: FlightId, count: i32) -> StoreResult<()> {
        match self.working.ledger.get_mut(&fid) {
            Some(booked) => {
                *booked = count;
                Ok(())
            }
            None => Err(StoreError::Invariant(format!("no ledger row for flight {}", fid))),
        }
    }

    async fn next_reservation_id(&mut self) -> StoreResult<ReservationId> {
        let id = self.working.next_reservation_id;
        self.working.next_reservation_id += 1;
        Ok(ReservationId(id))
    }

    async fn insert_reservation(&mut self, reservation: &Reservation) -> StoreResult<()> {
        if !self.working.users.contains_key(&reservation.username) {
            return Err(StoreError::Invariant(format!("no such user {}", reservation.username)));
        }
        let same_day = self.working.reservations.values().any(|r| {
            r.username == reservation.username && r.day_of_month == reservation.day_of_month
        });
        if same_day {
            return Err(StoreError::UniqueViolation {
                constraint: SAME_DAY_CONSTRAINT.to_string(),
            });
        }
        if self.working.reservations.contains_key(&reservation.id) {
            return Err(StoreError::UniqueViolation {
                constraint: "reservations_pkey".to_string(),
            });
        }
        self.working.reservations.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn find_reservation(
        &mut self,
        username: &str,
        id: ReservationId,
    ) -> StoreResult<Option<Reservation>> {
        Ok(self
            .working
            .reservations
            .get(&id)
            .filter(|r| r.username == username)
            .cloned())
    }

    async fn find_unpaid_reservation(
        &mut self,
        username: &str,
        id: ReservationId,
    ) -> StoreResult<Option<Reservation>> {
        let found = self.find_reservation(username, id).await?;
        Ok(found.filter(|r| !r.paid))
    }

    async fn reservations_for(&mut self, username: &str) -> StoreResult<Vec<Reservation>> {
        Ok(self
            .working
            .reservations
            .values()
            .filter(|r| r.username == username)
            .cloned()
            .collect())
    }

    async fn mark_paid(&mut self, id: ReservationId) -> StoreResult<bool> {
        match self.working.reservations.get_mut(&id) {
            Some(r) if !r.paid => {
                r.paid = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_reservation(&mut self, username: &str, id: ReservationId) -> StoreResult<bool> {
        let owned = self
            .working
            .reservations
            .get(&id)
            .is_some_and(|r| r.username == username);
        if owned {
            self.working.reservations.remove(&id);
        }
        Ok(owned)
    }

    async fn balance(&mut self, username: &str) -> StoreResult<Option<i64>> {
        Ok(self.working.users.get(username).map(|u| u.balance))
    }

    async fn set_balance(&mut self, username: &str, amount: i64) -> StoreResult<()> {
        match self.working.users.get_mut(username) {
            Some(user) => {
                user.balance = amount;
                Ok(())
            }
            None => Err(StoreError::Invariant(format!("no such user {}", username))),
        }
    }

    async fn commit(mut self) -> StoreResult<()> {
        if self.take_injected_conflict() {
            warn!("Injected serialization conflict, discarding transaction");
            return Err(StoreError::SerializationConflict(
                "could not serialize access due to concurrent update".to_string(),
            ));
        }
        *self.guard = self.working;
        debug!("Committed in-memory transaction");
        Ok(())
    }

    async fn rollback(self) -> StoreResult<()> {
        Ok(())
    }
}

#[async_trait]
impl FlightCatalog for MemoryStore {
    async fn direct_itineraries(&self, query: &SearchQuery) -> StoreResult<Vec<Itinerary>> {
        let state = self.state.lock().await;
        let mut flights: Vec<&Flight> = state
            .flights
            .values()
            .filter(|f| {
                f.origin_city == query.origin_city
                    && f.dest_city == query.dest_city
                    && f.day_of_month == query.day_of_month
            })
            .collect();
        flights.sort_by_key(|f| (f.duration, f.fid));

        Ok(flights
            .into_iter()
            .take(query.limit)
            .map(|f| Itinerary::direct(f.clone()))
            .collect())
    }

    async fn connecting_itineraries(&self, query: &SearchQuery) -> StoreResult<Vec<Itinerary>> {
        let state = self.state.lock().await;
        let mut pairs: Vec<(&Flight, &Flight)> = Vec::new();
        for first in state.flights.values().filter(|f| {
            f.origin_city == query.origin_city && f.day_of_month == query.day_of_month
        }) {
            for second in state.flights.values().filter(|s| {
                s.origin_city == first.dest_city
                    && s.dest_city == query.dest_city
                    && s.day_of_month == first.day_of_month
            }) {
                pairs.push((first, second));
            }
        }
        pairs.sort_by_key(|(f, s)| (f.duration + s.duration, f.fid, s.fid));

        Ok(pairs
            .into_iter()
            .take(query.limit)
            .map(|(f, s)| Itinerary::connecting(f.clone(), s.clone()))
            .collect())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn create_user(&self, user: &UserRecord) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.users.contains_key(&user.username) {
            return Err(StoreError::UniqueViolation {
                constraint: USERNAME_CONSTRAINT.to_string(),
            });
        }
        state.users.insert(user.username.clone(), user.clone());
        Ok(())
    }

    async fn find_user(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.state.lock().await.users.get(username).cloned())
    }
}

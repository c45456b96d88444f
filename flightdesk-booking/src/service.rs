use flightdesk_core::account::{normalize_username, NewCustomer, PasswordDigest};
use flightdesk_core::repository::{ReservationStore, StoreTransaction};
use flightdesk_core::search::compose_itineraries;
use flightdesk_core::{
    Cancellation, EngineError, EngineResult, Itinerary, Payment, Reference, ReservationDetails,
    ReservationId, SearchQuery, Session, USERNAME_CONSTRAINT, USERNAME_TAKEN,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::booking::BookingEngine;
use crate::cancellation::CancellationEngine;
use crate::coordinator::TransactionCoordinator;
use crate::retry::{retry_with_predicate, RetryPolicy};
use crate::settlement::SettlementEngine;

/// Session-facing operations over one reservation store.
pub struct FlightService<S> {
    store: Arc<S>,
    coordinator: TransactionCoordinator<S>,
    booking: BookingEngine<S>,
    settlement: SettlementEngine<S>,
    cancellation: CancellationEngine<S>,
    policy: RetryPolicy,
    max_itineraries: usize,
}

impl<S: ReservationStore> FlightService<S> {
    pub fn new(store: Arc<S>, policy: RetryPolicy) -> Self {
        let coordinator = TransactionCoordinator::new(store.clone());
        Self {
            booking: BookingEngine::new(coordinator.clone(), policy.clone()),
            settlement: SettlementEngine::new(coordinator.clone(), policy.clone()),
            cancellation: CancellationEngine::new(coordinator.clone(), policy.clone()),
            coordinator,
            store,
            policy,
            max_itineraries: usize::MAX,
        }
    }

    /// Cap every search at `max` results regardless of the requested limit.
    pub fn with_max_itineraries(mut self, max: usize) -> Self {
        self.max_itineraries = max;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn coordinator(&self) -> &TransactionCoordinator<S> {
        &self.coordinator
    }

    pub async fn create_customer(&self, customer: NewCustomer) -> EngineResult<String> {
        let record = customer.into_record()?;
        self.store.create_user(&record).await.map_err(|e| {
            if e.violates(USERNAME_CONSTRAINT) {
                EngineError::InvalidAccount(USERNAME_TAKEN.to_string())
            } else {
                EngineError::from(e)
            }
        })?;
        info!(username = %record.username, balance = record.balance, "Created customer");
        Ok(record.username)
    }

    pub async fn login(&self, session: &mut Session, username: &str, password: &str) -> EngineResult<()> {
        if session.username().is_some() {
            return Err(EngineError::AlreadyLoggedIn);
        }

        let username = normalize_username(username);
        let record = self
            .store
            .find_user(&username)
            .await?
            .ok_or(EngineError::LoginFailed)?;
        if !PasswordDigest::verify(&record, password) {
            warn!(username = %username, "Login rejected");
            return Err(EngineError::LoginFailed);
        }

        session.bind_user(record.username)?;
        info!(username = %username, session_id = %session.id(), "Logged in");
        Ok(())
    }

    /// Run a search and make its results the session's bookable itineraries.
    /// A failed search leaves the previous table in place.
    pub async fn search(&self, session: &mut Session, mut query: SearchQuery) -> EngineResult<Vec<Itinerary>> {
        query.limit = query.limit.min(self.max_itineraries);

        let direct = self.store.direct_itineraries(&query).await?;
        let connecting = if query.direct_only || direct.len() >= query.limit {
            Vec::new()
        } else {
            self.store.connecting_itineraries(&query).await?
        };

        let results = compose_itineraries(direct, connecting, &query);
        session.itineraries_mut().replace(&results)?;
        debug!(
            origin = %query.origin_city,
            dest = %query.dest_city,
            day = query.day_of_month,
            results = results.len(),
            "Search complete"
        );
        Ok(results)
    }

    pub async fn book(&self, session: &Session, itinerary_id: i64) -> EngineResult<ReservationId> {
        let username = session.require_user()?;
        let itinerary = session.itineraries().get(itinerary_id)?;
        self.booking.book(username, itinerary).await
    }

    pub async fn pay(&self, session: &Session, reservation_id: ReservationId) -> EngineResult<Payment> {
        let username = session.require_user()?;
        self.settlement.pay(username, reservation_id).await
    }

    pub async fn cancel(&self, session: &Session, reservation_id: ReservationId) -> EngineResult<Cancellation> {
        let username = session.require_user()?;
        self.cancellation.cancel(username, reservation_id).await
    }

    /// The caller's reservations ordered by id, read in one transaction.
    pub async fn reservations(&self, session: &Session) -> EngineResult<Vec<ReservationDetails>> {
        let username = session.require_user()?;
        retry_with_predicate(
            &self.policy,
            move || self.reservations_once(username),
            EngineError::is_transient,
        )
        .await
    }

    async fn reservations_once(&self, username: &str) -> EngineResult<Vec<ReservationDetails>> {
        let mut scope = self.coordinator.begin().await?;
        let outcome = list_within(scope.tx()?, username).await;
        scope.finish(outcome).await
    }
}

async fn list_within<T: StoreTransaction>(tx: &mut T, username: &str) -> EngineResult<Vec<ReservationDetails>> {
    let reservations = tx.reservations_for(username).await?;
    let mut details = Vec::with_capacity(reservations.len());

    for reservation in reservations {
        let mut flights = Vec::new();
        for fid in reservation.flight_ids() {
            let flight = tx
                .flight(fid)
                .await?
                .ok_or(EngineError::InvalidReference(Reference::Flight(fid)))?;
            flights.push(flight);
        }
        details.push(ReservationDetails {
            id: reservation.id,
            paid: reservation.paid,
            day_of_month: reservation.day_of_month,
            flights,
        });
    }
    Ok(details)
}
